use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use ais_api::{PARTITION_EXTENSION, Record, format_timestamp, parse_timestamp, partition_file_name};
use ais_api::partition::max_ordinal;
use arrow::array::{Array, ArrayRef, AsArray, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;

use crate::buffer::Generation;
use crate::error::CollectorError;
use crate::flush::PartitionInfo;

const COL_CAPTURED_AT: &str = "captured_at";
const COL_MMSI: &str = "mmsi";
const COL_RAW_JSON: &str = "raw_json";

fn partition_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(COL_CAPTURED_AT, DataType::Utf8, false),
        Field::new(COL_MMSI, DataType::Utf8, false),
        Field::new(COL_RAW_JSON, DataType::Utf8, false),
    ]))
}

// ═══════════════════════════════════════════════════════════════
//  PartitionWriter
// ═══════════════════════════════════════════════════════════════

/// Writes buffer generations as ZSTD-compressed Parquet files.
///
/// Every file is written under a dot-prefixed temporary name and hard-linked
/// into place once complete, so readers listing the directory never see a
/// partial partition. Linking fails on an existing target, so partitions are
/// never overwritten.
#[derive(Debug, Clone)]
pub struct PartitionWriter {
    dir: PathBuf,
    extension: String,
    row_group_size: usize,
    schema: SchemaRef,
}

impl PartitionWriter {
    /// Create the data directory (once) and return a writer for it.
    pub fn open(dir: impl Into<PathBuf>, row_group_size: usize) -> Result<Self, CollectorError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| CollectorError::io(format!("create {}", dir.display()), e))?;
        Ok(Self {
            dir,
            extension: PARTITION_EXTENSION.to_string(),
            row_group_size: row_group_size.max(1),
            schema: partition_schema(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// First free partition path for a flush at `at`.
    pub fn next_path(&self, at: DateTime<Utc>) -> Result<PathBuf, CollectorError> {
        let mut last = None;
        for ordinal in 0..=max_ordinal() {
            let path = self.dir.join(partition_file_name(at, ordinal, &self.extension));
            if !path.exists() {
                return Ok(path);
            }
            last = Some(path);
        }
        Err(CollectorError::AlreadyExists(
            last.unwrap_or_else(|| self.dir.clone()),
        ))
    }

    /// Persist a captured generation under the first free name for `at`.
    /// Blocking.
    pub fn write_generation(&self, generation: &Generation, at: DateTime<Utc>) -> Result<PartitionInfo, CollectorError> {
        let started = Instant::now();
        let path = self.next_path(at)?;
        let bytes = self.write(&generation.records, &path)?;
        Ok(PartitionInfo {
            path,
            records: generation.len(),
            bytes,
            elapsed: started.elapsed(),
        })
    }

    /// Write `records` in order to a new file at `path` and return its size.
    /// Blocking. All-or-nothing: on error no file is left behind.
    pub fn write(&self, records: &[Record], path: &Path) -> Result<u64, CollectorError> {
        if path.exists() {
            return Err(CollectorError::AlreadyExists(path.to_path_buf()));
        }
        let tmp = temp_path(path);
        let file = File::options()
            .write(true)
            .create_new(true)
            .open(&tmp)
            .map_err(|e| CollectorError::io(format!("create {}", tmp.display()), e))?;

        if let Err(e) = self.encode(records, file) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }
        publish(&tmp, path)?;

        std::fs::metadata(path)
            .map(|m| m.len())
            .map_err(|e| CollectorError::io(format!("stat {}", path.display()), e))
    }

    fn encode(&self, records: &[Record], file: File) -> Result<(), CollectorError> {
        let batch = self.to_batch(records)?;
        let props = WriterProperties::builder()
            .set_compression(Compression::ZSTD(ZstdLevel::default()))
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, self.schema.clone(), Some(props))?;
        writer.write(&batch)?;
        let file = writer.into_inner()?;
        file.sync_all()
            .map_err(|e| CollectorError::io("sync partition", e))
    }

    fn to_batch(&self, records: &[Record]) -> Result<RecordBatch, CollectorError> {
        let captured: StringArray = records
            .iter()
            .map(|r| Some(format_timestamp(r.captured_at)))
            .collect();
        let keys: StringArray = records.iter().map(|r| Some(r.key.as_str())).collect();
        let payloads: StringArray = records.iter().map(|r| Some(r.payload.as_str())).collect();

        let columns: Vec<ArrayRef> = vec![Arc::new(captured), Arc::new(keys), Arc::new(payloads)];
        Ok(RecordBatch::try_new(self.schema.clone(), columns)?)
    }
}

/// Link the finished temp file to `path`, then drop the temp name.
fn publish(tmp: &Path, path: &Path) -> Result<(), CollectorError> {
    let linked = std::fs::hard_link(tmp, path);
    let _ = std::fs::remove_file(tmp);
    match linked {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(CollectorError::AlreadyExists(path.to_path_buf()))
        }
        Err(e) => Err(CollectorError::io(format!("link {}", path.display()), e)),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

// ═══════════════════════════════════════════════════════════════
//  Reading
// ═══════════════════════════════════════════════════════════════

/// Read a partition back into records, in file order.
pub fn read_partition(path: &Path) -> Result<Vec<Record>, CollectorError> {
    let file = File::open(path).map_err(|e| CollectorError::io(format!("open {}", path.display()), e))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut records = Vec::new();
    for batch in reader {
        let batch = batch?;
        let captured = string_column(&batch, COL_CAPTURED_AT)?;
        let keys = string_column(&batch, COL_MMSI)?;
        let payloads = string_column(&batch, COL_RAW_JSON)?;

        for row in 0..batch.num_rows() {
            if captured.is_null(row) || keys.is_null(row) || payloads.is_null(row) {
                return Err(CollectorError::Encode(format!("null value in row {row}")));
            }
            let ts = captured.value(row);
            let captured_at = parse_timestamp(ts)
                .ok_or_else(|| CollectorError::Encode(format!("bad timestamp '{ts}' in row {row}")))?;
            records.push(Record::new(captured_at, keys.value(row), payloads.value(row)));
        }
    }
    Ok(records)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, CollectorError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_string_opt::<i32>())
        .ok_or_else(|| CollectorError::Encode(format!("missing utf8 column '{name}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Vec<Record> {
        let at = Utc.with_ymd_and_hms(2023, 9, 1, 12, 0, 0).unwrap();
        vec![
            Record::new(at, "111111111", r#"{"a": 1,  "b":"ü"}"#),
            Record::new(at + chrono::Duration::milliseconds(5), "222222222", r#"{"x":[1,2]}"#),
        ]
    }

    #[test]
    fn round_trip_preserves_order_and_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = PartitionWriter::open(tmp.path().join("data"), 1).unwrap();
        let path = writer.dir().join("2023-09-01_12-00-00.parquet");

        let bytes = writer.write(&sample(), &path).unwrap();
        assert!(bytes > 0);
        assert_eq!(read_partition(&path).unwrap(), sample());
    }

    #[test]
    fn existing_target_is_not_overwritten() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = PartitionWriter::open(tmp.path(), 100).unwrap();
        let path = tmp.path().join("2023-09-01_12-00-00.parquet");
        std::fs::write(&path, b"keep").unwrap();

        let err = writer.write(&sample(), &path).unwrap_err();
        assert!(matches!(err, CollectorError::AlreadyExists(_)));
        assert_eq!(std::fs::read(&path).unwrap(), b"keep");
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn target_created_after_the_check_is_kept() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("2023-09-01_12-00-00.parquet");
        let staged = temp_path(&path);
        std::fs::write(&staged, b"new").unwrap();
        std::fs::write(&path, b"keep").unwrap();

        let err = publish(&staged, &path).unwrap_err();
        assert!(matches!(err, CollectorError::AlreadyExists(_)));
        assert_eq!(std::fs::read(&path).unwrap(), b"keep");
        assert!(!staged.exists());
    }

    #[test]
    fn generation_is_named_from_the_given_instant() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = PartitionWriter::open(tmp.path(), 100).unwrap();
        let at = Utc.with_ymd_and_hms(2023, 9, 1, 12, 0, 0).unwrap();
        let generation = Generation {
            seq: 0,
            sealed_at: at,
            records: sample(),
        };

        let info = writer.write_generation(&generation, at).unwrap();
        assert_eq!(info.path, tmp.path().join("2023-09-01_12-00-00.parquet"));
        assert_eq!(info.records, 2);
        assert_eq!(read_partition(&info.path).unwrap(), sample());
    }

    #[test]
    fn missing_directory_leaves_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("gone");
        let writer = PartitionWriter::open(&dir, 100).unwrap();
        std::fs::remove_dir(&dir).unwrap();

        let err = writer.write(&sample(), &dir.join("2023-09-01_12-00-00.parquet")).unwrap_err();
        assert!(matches!(err, CollectorError::Io { .. }));
        assert!(!dir.exists());
    }

    #[test]
    fn same_second_names_get_suffixes() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = PartitionWriter::open(tmp.path(), 100).unwrap();
        let at = Utc.with_ymd_and_hms(2023, 9, 1, 12, 0, 0).unwrap();

        let first = writer.next_path(at).unwrap();
        writer.write(&sample(), &first).unwrap();
        let second = writer.next_path(at).unwrap();
        writer.write(&sample(), &second).unwrap();
        let third = writer.next_path(at).unwrap();

        let name = |p: &Path| p.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(name(&first), "2023-09-01_12-00-00.parquet");
        assert_eq!(name(&second), "2023-09-01_12-00-00_001.parquet");
        assert_eq!(name(&third), "2023-09-01_12-00-00_002.parquet");
        assert!(name(&first) < name(&second));
    }
}
