use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use chrono::Utc;
use serde::Deserialize;

use ais_api::{DateRange, WireKey};

use crate::error::QueryError;

use super::AppState;

/// `?from=YYYY-MM-DD&to=YYYY-MM-DD`, shared by every range route.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RangeParams {
    from: Option<String>,
    to: Option<String>,
}

impl RangeParams {
    fn range(&self) -> Result<DateRange, QueryError> {
        parse_range(self.from.as_deref(), self.to.as_deref())
    }
}

// Not flattened: the urlencoded deserializer cannot read numbers through
// `#[serde(flatten)]`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct LatestParams {
    from: Option<String>,
    to: Option<String>,
    limit: Option<usize>,
}

fn parse_range(from: Option<&str>, to: Option<&str>) -> Result<DateRange, QueryError> {
    let today = Utc::now().date_naive();
    let range = DateRange::parse(from, to, today)?;
    tracing::debug!(%range, "api request");
    Ok(range)
}

// ═══════════════════════════════════════════════════════════════
//  GET /ships/{mmsi}
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_ship(
    State(state): State<AppState>,
    Path(mmsi): Path<String>,
    Query(params): Query<RangeParams>,
) -> Result<impl IntoResponse, QueryError> {
    let records = state.gateway.ship(params.range()?, &mmsi).await?;
    Ok(Json(records))
}

// ═══════════════════════════════════════════════════════════════
//  GET /ships/mmsi
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_ship_keys(
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> Result<impl IntoResponse, QueryError> {
    let keys = state.gateway.ships(params.range()?).await?;
    Ok(Json(keys.iter().map(|k| WireKey(k)).collect::<Vec<_>>()).into_response())
}

// ═══════════════════════════════════════════════════════════════
//  GET /latest
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_latest(
    State(state): State<AppState>,
    Query(params): Query<LatestParams>,
) -> Result<impl IntoResponse, QueryError> {
    let range = parse_range(params.from.as_deref(), params.to.as_deref())?;
    let records = state.gateway.latest(range, params.limit).await?;
    Ok(Json(records))
}

// ═══════════════════════════════════════════════════════════════
//  GET /stats
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_stats(
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> Result<impl IntoResponse, QueryError> {
    let stats = state.gateway.stats(params.range()?, Utc::now()).await?;
    Ok(Json(stats))
}

// ═══════════════════════════════════════════════════════════════
//  GET /partitions
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_partitions(
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> Result<impl IntoResponse, QueryError> {
    let files = state.gateway.resolve(params.range()?).await?;
    let names: Vec<String> = files
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    Ok(Json(names))
}

// ═══════════════════════════════════════════════════════════════
//  GET /health
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    let buffered = state.buffer.as_ref().map(|b| b.current_count()).unwrap_or(0);
    Json(serde_json::json!({ "status": "ok", "buffered": buffered }))
}
