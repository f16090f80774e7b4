use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::range::{DATE_FORMAT, DateRange};

/// Extension of partition files written by the collector.
pub const PARTITION_EXTENSION: &str = "parquet";

const STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const TIME_FORMAT: &str = "%H-%M-%S";
/// `YYYY-MM-DD_HH-MM-SS`
const STAMP_LEN: usize = 19;
/// `_NNN`
const ORDINAL_LEN: usize = 4;
const MAX_ORDINAL: u32 = 999;

// ════════════════════════════════════════════════════════════════
//  Naming
// ════════════════════════════════════════════════════════════════

/// Partition file name for a flush at `at`.
///
/// `ordinal == 0` gives `YYYY-MM-DD_HH-MM-SS.<ext>`; a non-zero ordinal
/// disambiguates flushes within the same second as `..._NNN.<ext>`.
/// `.` sorts before `_`, so the plain name precedes its suffixed siblings
/// and lexicographic order stays chronological.
pub fn partition_file_name(at: DateTime<Utc>, ordinal: u32, extension: &str) -> String {
    let stamp = at.format(STAMP_FORMAT);
    if ordinal == 0 {
        format!("{stamp}.{extension}")
    } else {
        format!("{stamp}_{:03}.{extension}", ordinal.min(MAX_ORDINAL))
    }
}

/// Highest same-second ordinal a writer may use.
pub fn max_ordinal() -> u32 {
    MAX_ORDINAL
}

/// Date prefix of a well-formed partition file name, `None` for anything else
/// (temp files, foreign files, other extensions).
pub fn parse_partition_date(file_name: &str, extension: &str) -> Option<NaiveDate> {
    if !file_name.is_ascii() || file_name.starts_with('.') {
        return None;
    }
    let stem = file_name.strip_suffix(extension)?.strip_suffix('.')?;
    match stem.len() {
        STAMP_LEN => {}
        n if n == STAMP_LEN + ORDINAL_LEN => {
            let ordinal = &stem[STAMP_LEN..];
            if !ordinal.starts_with('_') || !ordinal[1..].bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
        }
        _ => return None,
    }
    if stem.as_bytes()[10] != b'_' {
        return None;
    }
    NaiveTime::parse_from_str(&stem[11..STAMP_LEN], TIME_FORMAT).ok()?;
    NaiveDate::parse_from_str(&stem[..10], DATE_FORMAT).ok()
}

// ════════════════════════════════════════════════════════════════
//  FileCatalog
// ════════════════════════════════════════════════════════════════

/// Maps a date range to the partition files that may hold matching rows.
///
/// The directory listing is the only index: no manifest is kept and file
/// contents are never read. Writers publish complete files under their final name, so a listing
/// taken during a flush only ever sees complete partitions.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    dir: PathBuf,
    extension: String,
}

impl FileCatalog {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Partitions for every day in `range`, ascending by day and, within a
    /// day, by file name. A missing directory yields an empty list.
    pub fn resolve(&self, range: &DateRange) -> std::io::Result<Vec<PathBuf>> {
        let dir = match std::fs::read_dir(&self.dir) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut entries: Vec<(String, PathBuf)> = Vec::new();
        for entry in dir {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(date) = parse_partition_date(name, &self.extension) else {
                continue;
            };
            if !range.contains(date) || !entry.file_type()?.is_file() {
                continue;
            }
            entries.push((name.to_string(), entry.path()));
        }

        // Names start with the date, so one sort orders by day, then by time.
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries.into_iter().map(|(_, path)| path).collect())
    }
}
