use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use ais_feed::{FeedEvent, MessageSource};

use crate::decode::Decoder;
use crate::flush::{FlushTrigger, Flusher};

/// Counters reported when the ingest loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub received: u64,
    pub buffered: u64,
    pub dropped: u64,
    pub retries: u64,
}

/// Pull payloads from `source` until it closes or `token` is cancelled.
///
/// Decoded records go straight into the flusher's buffer. When an append
/// seals a full generation it is handed to the partition writer; this loop
/// only waits when the writer's queue is full.
pub fn spawn_ingest(
    mut source: Box<dyn MessageSource>,
    decoder: Decoder,
    flusher: Flusher,
    token: CancellationToken,
) -> JoinHandle<IngestStats> {
    tokio::spawn(async move {
        let mut stats = IngestStats::default();
        tracing::info!(key_path = %decoder.key_path(), "ingest started");

        loop {
            let event = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                event = source.next_event() => event,
            };

            match event {
                FeedEvent::Payload(payload) => {
                    stats.received += 1;
                    let record = match decoder.decode(&payload, Utc::now()) {
                        Ok(r) => r,
                        Err(e) => {
                            stats.dropped += 1;
                            tracing::debug!(kind = %e.kind(), error = %e, bytes = payload.len(), "message dropped");
                            continue;
                        }
                    };
                    stats.buffered += 1;

                    if let Some(generation) = flusher.buffer().append(record).sealed {
                        tracing::info!(
                            seq = generation.seq,
                            records = generation.len(),
                            "buffer full, sealing generation"
                        );
                        flusher.persist(generation, FlushTrigger::Capacity).await;
                    }
                }
                FeedEvent::Retry { attempt, reason, .. } => {
                    stats.retries += 1;
                    tracing::debug!(attempt, %reason, "feed reconnecting");
                }
                FeedEvent::Closed => {
                    tracing::info!("feed closed");
                    break;
                }
            }
        }

        tracing::info!(
            received = stats.received,
            buffered = stats.buffered,
            dropped = stats.dropped,
            retries = stats.retries,
            "ingest stopped"
        );
        stats
    })
}
