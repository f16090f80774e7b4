use std::path::PathBuf;

use ais_api::ErrorKind;

/// Why an inbound payload was not buffered. Never fatal: the message is
/// dropped and ingestion continues.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("payload is not valid utf-8")]
    NotUtf8,

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing key field '{0}'")]
    MissingKey(String),

    #[error("unusable key at '{path}': {value}")]
    InvalidKey { path: String, value: String },
}

impl DecodeError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Format
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("config: {0}")]
    Config(String),

    #[error("io ({context}): {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },

    #[error("partition already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("encode: {0}")]
    Encode(String),

    #[error("write task: {0}")]
    Join(String),
}

impl CollectorError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        CollectorError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CollectorError::Config(_) => ErrorKind::Config,
            CollectorError::Io { .. } | CollectorError::AlreadyExists(_) => ErrorKind::Io,
            CollectorError::Encode(_) => ErrorKind::Format,
            CollectorError::Join(_) => ErrorKind::Logic,
        }
    }
}

impl From<arrow::error::ArrowError> for CollectorError {
    fn from(e: arrow::error::ArrowError) -> Self {
        CollectorError::Encode(e.to_string())
    }
}

impl From<parquet::errors::ParquetError> for CollectorError {
    fn from(e: parquet::errors::ParquetError) -> Self {
        CollectorError::Encode(e.to_string())
    }
}
