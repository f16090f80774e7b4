use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use ais_api::{Record, parse_timestamp};
use duckdb::Connection;

use crate::error::QueryError;

// ═══════════════════════════════════════════════════════════════
//  Engine contract
// ═══════════════════════════════════════════════════════════════

/// What to compute over a file set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineQuery {
    /// Every record for one key, oldest first.
    ByKey(String),
    /// Distinct keys, ascending.
    DistinctKeys,
    /// The newest `n` records, newest first.
    Latest(usize),
    /// Total rows plus rows captured at or after each cutoff
    /// (fixed-width RFC 3339 strings).
    Counts { hour_cutoff: String, minute_cutoff: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub total: u64,
    pub last_hour: u64,
    pub last_minute: u64,
}

#[derive(Debug)]
pub enum EngineOutput {
    Records(Vec<Record>),
    Keys(Vec<String>),
    Counts(Counts),
}

/// Read-only query engine over partition files.
///
/// `files` is never empty; callers resolve "no data" before reaching the
/// engine.
pub trait QueryEngine: Send + Sync {
    fn execute(
        &self,
        files: Vec<PathBuf>,
        query: EngineQuery,
    ) -> Pin<Box<dyn Future<Output = Result<EngineOutput, QueryError>> + Send + '_>>;
}

// ═══════════════════════════════════════════════════════════════
//  DuckDB
// ═══════════════════════════════════════════════════════════════

/// In-memory DuckDB connection reading partitions with `read_parquet`.
///
/// `duckdb::Connection` is not `Sync`, so it lives behind a mutex; every
/// query runs on the blocking pool.
pub struct DuckDbEngine {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbEngine {
    pub fn open_in_memory() -> Result<Self, QueryError> {
        let conn = Connection::open_in_memory()?;
        tracing::info!("query engine ready (duckdb, in-memory)");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn run(conn: &Connection, files: &[PathBuf], query: &EngineQuery) -> Result<EngineOutput, QueryError> {
        let source = parquet_source(files);
        match query {
            EngineQuery::ByKey(key) => {
                let sql = format!(
                    "SELECT captured_at, mmsi, raw_json FROM {source} WHERE mmsi = ? ORDER BY captured_at"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(duckdb::params![key], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                to_records(rows).map(EngineOutput::Records)
            }
            EngineQuery::DistinctKeys => {
                let sql = format!("SELECT DISTINCT mmsi FROM {source} ORDER BY mmsi");
                let mut stmt = conn.prepare(&sql)?;
                let keys = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(EngineOutput::Keys(keys))
            }
            EngineQuery::Latest(n) => {
                let sql = format!(
                    "SELECT captured_at, mmsi, raw_json FROM {source} ORDER BY captured_at DESC LIMIT {n}"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                to_records(rows).map(EngineOutput::Records)
            }
            EngineQuery::Counts { hour_cutoff, minute_cutoff } => {
                let sql = format!(
                    "SELECT count(*), \
                            count(*) FILTER (WHERE captured_at >= ?), \
                            count(*) FILTER (WHERE captured_at >= ?) \
                     FROM {source}"
                );
                let mut stmt = conn.prepare(&sql)?;
                let (total, last_hour, last_minute) =
                    stmt.query_row(duckdb::params![hour_cutoff, minute_cutoff], |row| {
                        Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?))
                    })?;
                Ok(EngineOutput::Counts(Counts {
                    total: total.max(0) as u64,
                    last_hour: last_hour.max(0) as u64,
                    last_minute: last_minute.max(0) as u64,
                }))
            }
        }
    }
}

fn lock(conn: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    match conn.lock() {
        Ok(g) => g,
        Err(poisoned) => {
            tracing::warn!("query engine lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

impl QueryEngine for DuckDbEngine {
    fn execute(
        &self,
        files: Vec<PathBuf>,
        query: EngineQuery,
    ) -> Pin<Box<dyn Future<Output = Result<EngineOutput, QueryError>> + Send + '_>> {
        let conn = self.conn.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                let conn = lock(&conn);
                DuckDbEngine::run(&conn, &files, &query)
            })
            .await
            .map_err(|e| QueryError::Engine(format!("query task: {e}")))?
        })
    }
}

/// `read_parquet(['a', 'b'])` with single quotes escaped.
fn parquet_source(files: &[PathBuf]) -> String {
    let list = files
        .iter()
        .map(|p| format!("'{}'", p.to_string_lossy().replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(", ");
    format!("read_parquet([{list}])")
}

fn to_records(rows: Vec<(String, String, String)>) -> Result<Vec<Record>, QueryError> {
    rows.into_iter()
        .map(|(ts, key, payload)| {
            let captured_at = parse_timestamp(&ts)
                .ok_or_else(|| QueryError::Engine(format!("bad timestamp '{ts}' in partition")))?;
            Ok(Record::new(captured_at, key, payload))
        })
        .collect()
}
