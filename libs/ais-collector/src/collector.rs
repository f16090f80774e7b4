use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use ais_feed::MessageSource;

use crate::buffer::RecordBuffer;
use crate::config::CollectorConfig;
use crate::decode::Decoder;
use crate::error::CollectorError;
use crate::flush::{FlushTrigger, Flusher, PartitionInfo, spawn_flush_timer};
use crate::ingest::{IngestStats, spawn_ingest};
use crate::writer::PartitionWriter;

/// Wired-up collector, not yet consuming a feed.
pub struct Collector {
    config: CollectorConfig,
    buffer: Arc<RecordBuffer>,
    writer: PartitionWriter,
    decoder: Decoder,
}

impl Collector {
    /// Validate settings and prepare the data directory.
    pub fn open(config: CollectorConfig, decoder: Decoder) -> Result<Self, CollectorError> {
        config.validate().map_err(CollectorError::Config)?;
        let writer = PartitionWriter::open(&config.data_dir, config.row_group_size)?;
        let buffer = Arc::new(RecordBuffer::new(config.max_records_per_file));
        tracing::info!(
            data_dir = %config.data_dir.display(),
            capacity = config.max_records_per_file,
            flush_interval_secs = config.flush_interval_secs,
            flush_queue_depth = config.flush_queue_depth,
            "collector ready"
        );
        Ok(Self {
            config,
            buffer,
            writer,
            decoder,
        })
    }

    pub fn buffer(&self) -> Arc<RecordBuffer> {
        self.buffer.clone()
    }

    /// Start the partition writer, the ingest loop and the flush timer. The
    /// last two stop when `token` is cancelled or
    /// [`CollectorHandle::shutdown`] is called.
    pub fn start(self, source: Box<dyn MessageSource>, token: CancellationToken) -> CollectorHandle {
        let flusher = Flusher::new(self.buffer, self.writer, self.config.flush_queue_depth);
        let ingest = spawn_ingest(source, self.decoder, flusher.clone(), token.child_token());
        let timer = spawn_flush_timer(flusher.clone(), self.config.flush_interval(), token.child_token());
        CollectorHandle {
            flusher,
            token,
            ingest,
            timer,
        }
    }
}

/// Summary of a completed shutdown.
#[derive(Debug)]
pub struct ShutdownReport {
    pub ingest: IngestStats,
    pub final_partition: Option<PartitionInfo>,
}

/// Running collector.
pub struct CollectorHandle {
    flusher: Flusher,
    token: CancellationToken,
    ingest: JoinHandle<IngestStats>,
    timer: JoinHandle<()>,
}

impl CollectorHandle {
    pub fn buffer(&self) -> Arc<RecordBuffer> {
        self.flusher.buffer().clone()
    }

    /// Flush the live generation now.
    pub async fn flush(&self) -> Option<PartitionInfo> {
        self.flusher.flush(FlushTrigger::Manual).await
    }

    /// Stop ingesting, stop the timer, flush whatever is left and wait until
    /// every queued generation is on disk.
    pub async fn shutdown(self) -> ShutdownReport {
        self.token.cancel();

        let ingest = self.ingest.await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "ingest task failed");
            IngestStats::default()
        });
        if let Err(e) = self.timer.await {
            tracing::error!(error = %e, "flush timer task failed");
        }

        let final_partition = self.flusher.flush(FlushTrigger::Shutdown).await;
        self.flusher.drain().await;
        tracing::info!(
            buffered = ingest.buffered,
            dropped = ingest.dropped,
            "collector stopped"
        );
        ShutdownReport {
            ingest,
            final_partition,
        }
    }
}
