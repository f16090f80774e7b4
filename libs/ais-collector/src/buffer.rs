use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use ais_api::Record;
use chrono::{DateTime, Utc};

// ═══════════════════════════════════════════════════════════════
//  Generation
// ═══════════════════════════════════════════════════════════════

/// Buffer contents captured by one swap. Owned by whoever flushes it.
#[derive(Debug)]
pub struct Generation {
    /// Increases by one per swap, starting at 0.
    pub seq: u64,
    pub sealed_at: DateTime<Utc>,
    pub records: Vec<Record>,
}

impl Generation {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Result of a single [`RecordBuffer::append`].
#[derive(Debug)]
pub struct Appended {
    /// Records in the live generation after the append (0 if it sealed).
    pub count: usize,
    /// Fill percentage newly reached by this append, in steps of 10.
    pub progress: Option<usize>,
    /// Set when this append filled the buffer; the live generation has
    /// already been replaced.
    pub sealed: Option<Generation>,
}

// ═══════════════════════════════════════════════════════════════
//  RecordBuffer
// ═══════════════════════════════════════════════════════════════

struct Live {
    records: Vec<Record>,
    /// Highest decile already reported for this generation.
    decile: usize,
    seq: u64,
}

/// Append-only in-memory buffer with an atomic swap.
///
/// All mutation happens under one mutex that covers only vector and
/// counter updates; nothing does I/O while holding it. `count` mirrors
/// `records.len()` for lock-free progress reads and is only written inside
/// the critical section.
pub struct RecordBuffer {
    live: Mutex<Live>,
    count: AtomicUsize,
    capacity: usize,
}

impl RecordBuffer {
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            live: Mutex::new(Live {
                records: Vec::new(),
                decile: 0,
                seq: 0,
            }),
            count: AtomicUsize::new(0),
            capacity,
        }
    }

    /// Best-effort size of the live generation.
    pub fn current_count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    fn lock(&self) -> MutexGuard<'_, Live> {
        match self.live.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("record buffer lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Add a record to the live generation.
    ///
    /// When the append makes the generation reach capacity, the generation
    /// is sealed and swapped out in the same critical section and returned
    /// in [`Appended::sealed`]; the next append lands in the fresh one.
    pub fn append(&self, record: Record) -> Appended {
        let appended = {
            let mut live = self.lock();
            live.records.push(record);
            let count = live.records.len();

            let decile = (count * 10 / self.capacity).min(10);
            let progress = if decile > live.decile {
                live.decile = decile;
                Some(decile * 10)
            } else {
                None
            };

            if count >= self.capacity {
                let generation = self.swap(&mut live);
                Appended {
                    count: 0,
                    progress,
                    sealed: Some(generation),
                }
            } else {
                self.count.store(count, Ordering::Release);
                Appended {
                    count,
                    progress,
                    sealed: None,
                }
            }
        };

        if let Some(pct) = appended.progress {
            tracing::info!(
                percent = pct,
                capacity = self.capacity,
                "buffer fill"
            );
        }
        appended
    }

    /// Capture the live generation and install an empty one. `None` when
    /// there was nothing to capture.
    pub fn flush_and_reset(&self) -> Option<Generation> {
        let mut live = self.lock();
        if live.records.is_empty() {
            return None;
        }
        Some(self.swap(&mut live))
    }

    fn swap(&self, live: &mut Live) -> Generation {
        let records = std::mem::take(&mut live.records);
        let seq = live.seq;
        live.seq += 1;
        live.decile = 0;
        self.count.store(0, Ordering::Release);
        Generation {
            seq,
            sealed_at: Utc::now(),
            records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn rec(i: usize) -> Record {
        Record::new(Utc::now(), i.to_string(), format!("{{\"i\":{i}}}"))
    }

    #[test]
    fn empty_flush_is_none() {
        let buf = RecordBuffer::new(10);
        assert!(buf.flush_and_reset().is_none());
        assert_eq!(buf.current_count(), 0);
    }

    #[test]
    fn flush_keeps_arrival_order() {
        let buf = RecordBuffer::new(10);
        for i in 0..3 {
            assert_eq!(buf.append(rec(i)).count, i + 1);
        }
        assert_eq!(buf.current_count(), 3);

        let generation = buf.flush_and_reset().unwrap();
        let keys: Vec<_> = generation.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["0", "1", "2"]);
        assert_eq!(generation.seq, 0);
        assert_eq!(buf.current_count(), 0);

        buf.append(rec(9));
        assert_eq!(buf.flush_and_reset().unwrap().seq, 1);
    }

    #[test]
    fn seals_exactly_at_capacity() {
        let buf = RecordBuffer::new(4);
        for i in 0..3 {
            assert!(buf.append(rec(i)).sealed.is_none());
        }
        let appended = buf.append(rec(3));
        let generation = appended.sealed.unwrap();
        assert_eq!(generation.len(), 4);
        assert_eq!(appended.count, 0);
        assert_eq!(buf.current_count(), 0);

        let next = buf.append(rec(4));
        assert!(next.sealed.is_none());
        assert_eq!(next.count, 1);
    }

    #[test]
    fn deciles_fire_once() {
        let buf = RecordBuffer::new(20);
        let fired: Vec<usize> = (0..19).filter_map(|i| buf.append(rec(i)).progress).collect();
        assert_eq!(fired, [10, 20, 30, 40, 50, 60, 70, 80, 90]);
        assert_eq!(buf.append(rec(19)).progress, Some(100));

        // New generation starts over.
        let fired: Vec<usize> = (0..2).filter_map(|i| buf.append(rec(i)).progress).collect();
        assert_eq!(fired, [10]);
    }

    #[test]
    fn multi_decile_jump_reports_highest() {
        let buf = RecordBuffer::new(3);
        assert_eq!(buf.append(rec(0)).progress, Some(30));
        assert_eq!(buf.append(rec(1)).progress, Some(60));
    }

    #[test]
    fn interleaved_appends_and_flushes_are_exactly_once() {
        let buf = Arc::new(RecordBuffer::new(1_000_000));
        let total = 20_000;

        let producer = {
            let buf = buf.clone();
            std::thread::spawn(move || {
                for i in 0..total {
                    buf.append(rec(i));
                }
            })
        };

        let mut seen = Vec::new();
        while !producer.is_finished() {
            if let Some(generation) = buf.flush_and_reset() {
                seen.extend(generation.records);
            }
            std::thread::yield_now();
        }
        producer.join().unwrap();
        if let Some(generation) = buf.flush_and_reset() {
            seen.extend(generation.records);
        }

        assert_eq!(seen.len(), total);
        let keys: HashSet<_> = seen.iter().map(|r| r.key.clone()).collect();
        assert_eq!(keys.len(), total);
        // Single producer: concatenated generations keep arrival order.
        let order: Vec<usize> = seen.iter().map(|r| r.key.parse().unwrap()).collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
    }
}
