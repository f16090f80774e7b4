use std::path::PathBuf;
use std::sync::Arc;

use ais_api::{DateRange, FileCatalog, Record, format_timestamp};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::engine::{Counts, EngineOutput, EngineQuery, QueryEngine};
use crate::error::QueryError;

/// Minutes per calendar day, used for the per-minute average.
const MINUTES_PER_DAY: u64 = 1440;

/// Hard upper bound for `/latest`.
pub const MAX_LATEST_LIMIT: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    #[serde(rename = "total_today")]
    pub total: u64,
    pub last_hour: u64,
    pub last_minute: u64,
    pub average_per_minute: u64,
}

/// Resolves a date range to partition files and delegates the rest to
/// the engine. Never opens a partition itself.
#[derive(Clone)]
pub struct QueryGateway {
    catalog: FileCatalog,
    engine: Arc<dyn QueryEngine>,
    latest_limit: usize,
}

impl QueryGateway {
    pub fn new(catalog: FileCatalog, engine: Arc<dyn QueryEngine>, latest_limit: usize) -> Self {
        Self {
            catalog,
            engine,
            latest_limit: latest_limit.clamp(1, MAX_LATEST_LIMIT),
        }
    }

    /// Partition files for `range`; an empty listing is [`QueryError::NoData`].
    pub async fn resolve(&self, range: DateRange) -> Result<Vec<PathBuf>, QueryError> {
        let catalog = self.catalog.clone();
        let files = tokio::task::spawn_blocking(move || catalog.resolve(&range))
            .await
            .map_err(|e| QueryError::Engine(format!("catalog task: {e}")))??;
        if files.is_empty() {
            return Err(QueryError::NoData(range));
        }
        tracing::debug!(%range, files = files.len(), "resolved partitions");
        Ok(files)
    }

    pub async fn ship(&self, range: DateRange, mmsi: &str) -> Result<Vec<Record>, QueryError> {
        let files = self.resolve(range).await?;
        match self.engine.execute(files, EngineQuery::ByKey(mmsi.to_string())).await? {
            EngineOutput::Records(r) => Ok(r),
            other => Err(unexpected(other)),
        }
    }

    pub async fn ships(&self, range: DateRange) -> Result<Vec<String>, QueryError> {
        let files = self.resolve(range).await?;
        match self.engine.execute(files, EngineQuery::DistinctKeys).await? {
            EngineOutput::Keys(k) => Ok(k),
            other => Err(unexpected(other)),
        }
    }

    /// `limit` defaults to the configured value and is capped at
    /// [`MAX_LATEST_LIMIT`].
    pub async fn latest(&self, range: DateRange, limit: Option<usize>) -> Result<Vec<Record>, QueryError> {
        let limit = limit.unwrap_or(self.latest_limit).clamp(1, MAX_LATEST_LIMIT);
        let files = self.resolve(range).await?;
        match self.engine.execute(files, EngineQuery::Latest(limit)).await? {
            EngineOutput::Records(r) => Ok(r),
            other => Err(unexpected(other)),
        }
    }

    pub async fn stats(&self, range: DateRange, now: DateTime<Utc>) -> Result<Stats, QueryError> {
        let files = self.resolve(range).await?;
        let query = EngineQuery::Counts {
            hour_cutoff: format_timestamp(now - Duration::hours(1)),
            minute_cutoff: format_timestamp(now - Duration::minutes(1)),
        };
        let Counts { total, last_hour, last_minute } = match self.engine.execute(files, query).await? {
            EngineOutput::Counts(c) => c,
            other => return Err(unexpected(other)),
        };
        Ok(Stats {
            total,
            last_hour,
            last_minute,
            average_per_minute: total / (MINUTES_PER_DAY * u64::from(range.day_count())),
        })
    }
}

fn unexpected(output: EngineOutput) -> QueryError {
    QueryError::Engine(format!("unexpected engine output: {output:?}"))
}
