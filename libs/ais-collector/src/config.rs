use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Buffering and partitioning settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Directory that receives partition files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Wall-clock flush period.
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
    /// Capacity watermark: a generation is sealed when it reaches this size.
    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,
    /// Parquet row group size.
    #[serde(default = "default_row_group_size")]
    pub row_group_size: usize,
    /// Sealed generations allowed to wait for the partition writer before
    /// ingestion is held back.
    #[serde(default = "default_flush_queue_depth")]
    pub flush_queue_depth: usize,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("ais_data")
}
fn default_flush_interval_secs() -> u64 {
    3600
}
fn default_max_records_per_file() -> usize {
    100_000
}
fn default_row_group_size() -> usize {
    100_000
}
fn default_flush_queue_depth() -> usize {
    4
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            flush_interval_secs: default_flush_interval_secs(),
            max_records_per_file: default_max_records_per_file(),
            row_group_size: default_row_group_size(),
            flush_queue_depth: default_flush_queue_depth(),
        }
    }
}

impl CollectorConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.flush_interval_secs == 0 {
            return Err("flush_interval_secs must be at least 1".into());
        }
        if self.max_records_per_file == 0 {
            return Err("max_records_per_file must be at least 1".into());
        }
        if self.row_group_size == 0 {
            return Err("row_group_size must be at least 1".into());
        }
        if self.flush_queue_depth == 0 {
            return Err("flush_queue_depth must be at least 1".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_values_rejected() {
        assert!(CollectorConfig::default().validate().is_ok());
        let cfg = CollectorConfig {
            max_records_per_file: 0,
            ..Default::default()
        };
        assert!(cfg.validate().unwrap_err().contains("max_records_per_file"));
        let cfg = CollectorConfig {
            flush_interval_secs: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = CollectorConfig {
            flush_queue_depth: 0,
            ..Default::default()
        };
        assert!(cfg.validate().unwrap_err().contains("flush_queue_depth"));
    }
}
