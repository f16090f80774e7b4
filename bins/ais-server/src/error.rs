#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("AIS_API_KEY is required (set the variable or pass --api-key)")]
    MissingApiKey,

    #[error("{0}")]
    Collector(#[from] ais_collector::CollectorError),

    #[error("{0}")]
    Query(#[from] ais_query_server::QueryError),

    #[error("invalid date range: {0}")]
    Range(#[from] ais_api::RangeError),

    #[error("api server: {0}")]
    Api(String),
}
