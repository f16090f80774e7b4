//! Shared types for the AIS collector: records, date ranges, bounding boxes,
//! partition naming and the partition file catalog.

pub mod error;
pub mod partition;
pub mod range;
pub mod types;
pub mod util;

pub use error::ErrorKind;
pub use partition::{FileCatalog, PARTITION_EXTENSION, partition_file_name, parse_partition_date};
pub use range::{DATE_FORMAT, DateRange, RangeError};
pub use types::{BoundingBox, Corner, Record, Region, WireKey};
pub use util::{format_timestamp, parse_timestamp, resolve_path};
