use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::buffer::{Generation, RecordBuffer};
use crate::error::CollectorError;
use crate::writer::PartitionWriter;

/// What asked for a flush. Carried into logs only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    Timer,
    Capacity,
    Shutdown,
    Manual,
}

impl std::fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlushTrigger::Timer => write!(f, "timer"),
            FlushTrigger::Capacity => write!(f, "capacity"),
            FlushTrigger::Shutdown => write!(f, "shutdown"),
            FlushTrigger::Manual => write!(f, "manual"),
        }
    }
}

/// A partition that was written.
#[derive(Debug, Clone)]
pub struct PartitionInfo {
    pub path: PathBuf,
    pub records: usize,
    pub bytes: u64,
    pub elapsed: Duration,
}

struct Pending {
    generation: Generation,
    trigger: FlushTrigger,
    done: Option<oneshot::Sender<Option<PartitionInfo>>>,
}

enum FlushJob {
    Write(Pending),
    Drain(oneshot::Sender<()>),
}

// ═══════════════════════════════════════════════════════════════
//  Flusher
// ═══════════════════════════════════════════════════════════════

/// Single entry point for every flush.
///
/// Captured generations go through a bounded queue to one partition writer
/// task. The writer handles them strictly by `seq`, so partitions appear on
/// disk, and sort by name, in capture order. When `queue_depth` generations
/// are already waiting, handing off another one waits for room. A failed
/// write is logged and its records are dropped.
#[derive(Clone)]
pub struct Flusher {
    buffer: Arc<RecordBuffer>,
    queue: mpsc::Sender<FlushJob>,
}

impl Flusher {
    /// Spawn the partition writer. Must be called inside a tokio runtime.
    /// The writer stops once every clone of the returned flusher is gone.
    pub fn new(buffer: Arc<RecordBuffer>, writer: PartitionWriter, queue_depth: usize) -> Self {
        let (queue, jobs) = mpsc::channel(queue_depth.max(1));
        tokio::spawn(run_partition_writer(writer, jobs));
        Self { buffer, queue }
    }

    pub fn buffer(&self) -> &Arc<RecordBuffer> {
        &self.buffer
    }

    /// Swap out the live generation and wait for its write. `None` when the
    /// buffer was empty or the write failed.
    pub async fn flush(&self, trigger: FlushTrigger) -> Option<PartitionInfo> {
        let Some(generation) = self.buffer.flush_and_reset() else {
            tracing::info!(%trigger, "flush: nothing to write");
            return None;
        };
        let (done, written) = oneshot::channel();
        self.submit(FlushJob::Write(Pending {
            generation,
            trigger,
            done: Some(done),
        }))
        .await;
        written.await.ok().flatten()
    }

    /// Queue a generation that was already sealed elsewhere (capacity).
    /// Returns once it is queued, not written.
    pub async fn persist(&self, generation: Generation, trigger: FlushTrigger) {
        self.submit(FlushJob::Write(Pending {
            generation,
            trigger,
            done: None,
        }))
        .await;
    }

    /// Wait until everything queued before this call is written or dropped.
    pub async fn drain(&self) {
        let (done, drained) = oneshot::channel();
        self.submit(FlushJob::Drain(done)).await;
        let _ = drained.await;
    }

    async fn submit(&self, job: FlushJob) {
        if let Err(mpsc::error::SendError(job)) = self.queue.send(job).await {
            if let FlushJob::Write(pending) = job {
                tracing::error!(
                    trigger = %pending.trigger,
                    seq = pending.generation.seq,
                    records = pending.generation.len(),
                    "partition writer stopped, records discarded"
                );
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Partition writer task
// ═══════════════════════════════════════════════════════════════

/// Two swaps can race to the queue, so generations may arrive out of
/// order. They are parked until every lower `seq` has been handled.
async fn run_partition_writer(writer: PartitionWriter, mut jobs: mpsc::Receiver<FlushJob>) {
    let mut parked: BTreeMap<u64, Pending> = BTreeMap::new();
    let mut next_seq = 0u64;
    let mut last_stamp: Option<DateTime<Utc>> = None;

    while let Some(job) = jobs.recv().await {
        match job {
            FlushJob::Write(pending) => {
                parked.insert(pending.generation.seq, pending);
                while let Some(pending) = parked.remove(&next_seq) {
                    write_pending(&writer, pending, &mut last_stamp).await;
                    next_seq += 1;
                }
            }
            FlushJob::Drain(done) => {
                // A gap left at this point will never be filled.
                while let Some((seq, pending)) = parked.pop_first() {
                    tracing::warn!(expected = next_seq, seq, "writing past a missing generation");
                    write_pending(&writer, pending, &mut last_stamp).await;
                    next_seq = seq + 1;
                }
                let _ = done.send(());
            }
        }
    }

    while let Some((_, pending)) = parked.pop_first() {
        write_pending(&writer, pending, &mut last_stamp).await;
    }
    tracing::debug!("partition writer stopped");
}

async fn write_pending(writer: &PartitionWriter, pending: Pending, last_stamp: &mut Option<DateTime<Utc>>) {
    let Pending { generation, trigger, done } = pending;
    let seq = generation.seq;
    let records = generation.len();
    // Names never go backwards, even if the wall clock does.
    let at = (*last_stamp).map_or(generation.sealed_at, |last| last.max(generation.sealed_at));
    *last_stamp = Some(at);
    tracing::debug!(%trigger, seq, records, "flush started");

    let writer = writer.clone();
    let result = tokio::task::spawn_blocking(move || writer.write_generation(&generation, at))
        .await
        .map_err(|e| CollectorError::Join(e.to_string()))
        .and_then(|r| r);

    let info = match result {
        Ok(info) => {
            tracing::info!(
                %trigger,
                seq,
                path = %info.path.display(),
                records = info.records,
                size_mb = %format!("{:.2}", info.bytes as f64 / (1024.0 * 1024.0)),
                elapsed_ms = info.elapsed.as_millis() as u64,
                "partition written"
            );
            Some(info)
        }
        Err(e) => {
            tracing::error!(
                %trigger,
                seq,
                records,
                kind = %e.kind(),
                error = %e,
                "partition write failed, records discarded"
            );
            None
        }
    };
    if let Some(done) = done {
        let _ = done.send(info);
    }
}

// ═══════════════════════════════════════════════════════════════
//  Timer
// ═══════════════════════════════════════════════════════════════

/// Flush every `interval` until `token` is cancelled. The first flush
/// happens one full interval after start.
pub fn spawn_flush_timer(
    flusher: Flusher,
    interval: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_secs = interval.as_secs(), "flush timer started");

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    flusher.flush(FlushTrigger::Timer).await;
                }
            }
        }
        tracing::info!("flush timer stopped");
    })
}
