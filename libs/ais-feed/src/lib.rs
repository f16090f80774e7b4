//! Upstream AIS feed: the [`MessageSource`] capability and its WebSocket
//! implementation.

pub mod backoff;
pub mod error;
pub mod source;
pub mod subscription;
pub mod websocket;

pub use backoff::Backoff;
pub use error::FeedError;
pub use source::{ChannelSource, FeedEvent, MessageSource};
pub use subscription::Subscription;
pub use websocket::{AISSTREAM_URL, WebSocketSource};
