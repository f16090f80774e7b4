use std::future::Future;
use std::pin::Pin;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::backoff::Backoff;
use crate::error::FeedError;
use crate::source::{FeedEvent, MessageSource};
use crate::subscription::Subscription;

/// Public aisstream.io endpoint.
pub const AISSTREAM_URL: &str = "wss://stream.aisstream.io/v0/stream";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Reconnecting WebSocket feed.
///
/// Connects lazily on the first [`MessageSource::next_event`] call, sends the
/// subscription, then yields every text or binary frame as a payload. Any
/// connect, subscribe or read failure drops the connection and yields
/// [`FeedEvent::Retry`] once the backoff delay has elapsed.
pub struct WebSocketSource {
    url: String,
    subscription: Subscription,
    backoff: Backoff,
    stream: Option<WsStream>,
    attempt: u32,
}

impl WebSocketSource {
    pub fn new(url: impl Into<String>, subscription: Subscription, backoff: Backoff) -> Self {
        Self {
            url: url.into(),
            subscription,
            backoff,
            stream: None,
            attempt: 0,
        }
    }

    async fn connect(&self) -> Result<WsStream, FeedError> {
        tracing::info!(url = %self.url, "connecting to AIS feed");
        let (mut stream, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| FeedError::Connect {
                url: self.url.clone(),
                detail: e.to_string(),
            })?;

        let request = self
            .subscription
            .to_json()
            .map_err(|e| FeedError::Subscribe(e.to_string()))?;
        stream
            .send(Message::Text(request.into()))
            .await
            .map_err(|e| FeedError::Subscribe(e.to_string()))?;

        tracing::info!(
            url = %self.url,
            boxes = self.subscription.bounding_boxes.len(),
            "subscribed, listening for AIS messages"
        );
        Ok(stream)
    }

    async fn retry(&mut self, error: FeedError) -> FeedEvent {
        self.stream = None;
        self.attempt += 1;
        let delay = self.backoff.next_delay();
        tracing::warn!(
            url = %self.url,
            attempt = self.attempt,
            delay_ms = delay.as_millis() as u64,
            kind = %error.kind(),
            error = %error,
            "feed disconnected, reconnecting"
        );
        tokio::time::sleep(delay).await;
        FeedEvent::Retry {
            attempt: self.attempt,
            delay,
            reason: error.to_string(),
        }
    }

    async fn next(&mut self) -> FeedEvent {
        loop {
            if self.stream.is_none() {
                match self.connect().await {
                    Ok(stream) => {
                        self.stream = Some(stream);
                        self.attempt = 0;
                        self.backoff.reset();
                    }
                    Err(e) => return self.retry(e).await,
                }
            }

            let Some(stream) = self.stream.as_mut() else {
                continue;
            };
            let frame = stream.next().await;

            match frame {
                Some(Ok(msg @ (Message::Text(_) | Message::Binary(_)))) => {
                    return FeedEvent::Payload(msg.into_data().to_vec());
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame.map(|f| f.reason.to_string()).filter(|r| !r.is_empty());
                    return self.retry(FeedError::Closed(reason)).await;
                }
                // Ping/Pong are answered by tungstenite itself.
                Some(Ok(_)) => continue,
                Some(Err(e)) => return self.retry(FeedError::Transport(e.to_string())).await,
                None => return self.retry(FeedError::Closed(None)).await,
            }
        }
    }
}

impl MessageSource for WebSocketSource {
    fn next_event(&mut self) -> Pin<Box<dyn Future<Output = FeedEvent> + Send + '_>> {
        Box::pin(self.next())
    }
}
