use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use ais_api::{FileCatalog, PARTITION_EXTENSION};
use ais_collector::{Collector, Decoder};
use ais_feed::{Subscription, WebSocketSource};
use ais_query_server::{AppState, DuckDbEngine, QueryGateway};

use crate::config::{ServeArgs, ServerConfig};
use crate::error::ServerError;

pub async fn run(args: ServeArgs) -> Result<(), ServerError> {
    tracing::info!("ais-server starting");

    // --- Credentials first: nothing starts without them ---
    let api_key = args
        .api_key
        .filter(|k| !k.trim().is_empty())
        .ok_or(ServerError::MissingApiKey)?;

    // --- Load config ---
    let config = ServerConfig::load(args.config.as_deref())?;
    tracing::info!(
        config = args.config.as_deref().unwrap_or("<defaults>"),
        "loaded config"
    );

    let token = CancellationToken::new();

    // --- Collector ---
    let collector = Collector::open(config.collector.clone(), Decoder::new(config.feed.key_path.clone()))?;
    let buffer = collector.buffer();

    let subscription = Subscription::new(api_key, config.feed.boxes())
        .with_message_types(config.feed.message_types.clone());
    tracing::info!(?subscription, "feed subscription");
    let source = WebSocketSource::new(config.feed.url.clone(), subscription, config.feed.backoff());
    let collector = collector.start(Box::new(source), token.child_token());

    // --- Query API ---
    let engine = Arc::new(DuckDbEngine::open_in_memory()?);
    let gateway = QueryGateway::new(
        FileCatalog::new(&config.collector.data_dir, PARTITION_EXTENSION),
        engine,
        config.latest_limit,
    );
    let state = AppState {
        gateway,
        buffer: Some(buffer),
    };
    let api_port = config.api_port;
    let api_token = token.clone();
    let mut api_handle = tokio::spawn(async move {
        ais_query_server::run(api_port, state, api_token).await
    });

    tracing::info!("server ready");

    // --- Wait for a signal, or for the API to die on its own ---
    let api_result = tokio::select! {
        signal = shutdown_signal() => {
            if let Err(e) = signal {
                tracing::error!(error = %e, "signal handler failed");
            }
            None
        }
        result = &mut api_handle => Some(result),
    };
    tracing::info!("shutting down...");
    token.cancel();

    let timeout = config.shutdown_timeout();
    let drained = tokio::time::timeout(timeout, async {
        let report = collector.shutdown().await;
        let api_result = match api_result {
            Some(r) => r,
            None => api_handle.await,
        };
        (report, api_result)
    })
    .await;

    let (report, api_result) = match drained {
        Ok(done) => done,
        Err(_) => {
            tracing::error!(timeout_secs = timeout.as_secs(), "shutdown timed out, unflushed records lost");
            return Err(ServerError::Api("shutdown timed out".into()));
        }
    };

    if let Some(p) = &report.final_partition {
        tracing::info!(path = %p.path.display(), records = p.records, "final partition written");
    }
    tracing::info!(
        received = report.ingest.received,
        buffered = report.ingest.buffered,
        dropped = report.ingest.dropped,
        "shutdown complete"
    );

    match api_result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ServerError::Api(e)),
        Err(e) => Err(ServerError::Api(format!("api task: {e}"))),
    }
}

/// Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() -> Result<(), std::io::Error> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut term = signal(SignalKind::terminate())?;
        tokio::select! {
            r = tokio::signal::ctrl_c() => r,
            _ = term.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
