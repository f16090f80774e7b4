use ais_api::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("connect {url}: {detail}")]
    Connect { url: String, detail: String },

    #[error("subscribe: {0}")]
    Subscribe(String),

    #[error("transport: {0}")]
    Transport(String),

    #[error("closed by peer{}", .0.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    Closed(Option<String>),
}

impl FeedError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FeedError::Subscribe(_) => ErrorKind::Format,
            _ => ErrorKind::Io,
        }
    }
}
