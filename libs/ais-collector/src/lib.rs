//! Ingestion side of the AIS collector: decode raw feed payloads, buffer
//! them in memory and commit each buffer generation to an immutable Parquet
//! partition.
//!
//! ```text
//! MessageSource → Decoder → RecordBuffer ──(capacity)──┐
//!                                 ▲                     ▼
//!                     FlushTimer ─┴──────────────→ Flusher → PartitionWriter → {data_dir}/YYYY-MM-DD_HH-MM-SS.parquet
//! ```

pub mod buffer;
pub mod collector;
pub mod config;
pub mod decode;
pub mod error;
pub mod flush;
pub mod ingest;
pub mod writer;

pub use buffer::{Appended, Generation, RecordBuffer};
pub use collector::{Collector, CollectorHandle, ShutdownReport};
pub use config::CollectorConfig;
pub use decode::{DEFAULT_KEY_PATH, Decoder};
pub use error::{CollectorError, DecodeError};
pub use flush::{FlushTrigger, Flusher, PartitionInfo, spawn_flush_timer};
pub use ingest::{IngestStats, spawn_ingest};
pub use writer::{PartitionWriter, read_partition};
