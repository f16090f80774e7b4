use ais_api::{DateRange, ErrorKind, RangeError};
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error(transparent)]
    Validation(#[from] RangeError),

    #[error("no data available for {0}")]
    NoData(DateRange),

    #[error("catalog: {0}")]
    Catalog(#[from] std::io::Error),

    #[error("engine: {0}")]
    Engine(String),
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::Validation(_) => ErrorKind::Format,
            QueryError::NoData(_) => ErrorKind::Logic,
            QueryError::Catalog(_) => ErrorKind::Io,
            QueryError::Engine(_) => ErrorKind::Logic,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            QueryError::Validation(_) => StatusCode::BAD_REQUEST,
            QueryError::NoData(_) => StatusCode::NOT_FOUND,
            QueryError::Catalog(_) | QueryError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<duckdb::Error> for QueryError {
    fn from(e: duckdb::Error) -> Self {
        QueryError::Engine(e.to_string())
    }
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = %self.kind(), error = %self, "query failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
