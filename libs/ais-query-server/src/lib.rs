//! Read-only HTTP query surface over the partition directory.
//!
//! Requests carry a `from`/`to` date range; the [`QueryGateway`] turns it
//! into a list of partition files and a [`QueryEngine`] (DuckDB by default)
//! answers the question over those files.

mod http;

pub mod engine;
pub mod error;
pub mod gateway;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tokio_util::sync::CancellationToken;

use ais_collector::RecordBuffer;

pub use engine::{Counts, DuckDbEngine, EngineOutput, EngineQuery, QueryEngine};
pub use error::QueryError;
pub use gateway::{MAX_LATEST_LIMIT, QueryGateway, Stats};

#[derive(Clone)]
pub struct AppState {
    pub gateway: QueryGateway,
    /// Live buffer, reported by `/health` when the collector runs in-process.
    pub buffer: Option<Arc<RecordBuffer>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ships/mmsi", get(http::handle_ship_keys))
        .route("/ships/{mmsi}", get(http::handle_ship))
        .route("/latest", get(http::handle_latest))
        .route("/stats", get(http::handle_stats))
        .route("/partitions", get(http::handle_partitions))
        .route("/health", get(http::handle_health))
        .with_state(state)
}

/// Serve the query API on `0.0.0.0:{port}` until `shutdown` is cancelled.
pub async fn run(port: u16, state: AppState, shutdown: CancellationToken) -> Result<(), String> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .map_err(|e| format!("bind api :{port}: {e}"))?;
    tracing::info!(port, "query api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| format!("axum serve: {e}"))?;

    tracing::info!("query api stopped");
    Ok(())
}
