use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::mpsc;

// ═══════════════════════════════════════════════════════════════
//  FeedEvent
// ═══════════════════════════════════════════════════════════════

/// One step of an upstream feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// A raw message body, exactly as received.
    Payload(Vec<u8>),
    /// The transport failed; the source already waited `delay` and will
    /// reconnect on the next call.
    Retry {
        attempt: u32,
        delay: Duration,
        reason: String,
    },
    /// The source is exhausted and will not produce more events.
    Closed,
}

// ═══════════════════════════════════════════════════════════════
//  MessageSource
// ═══════════════════════════════════════════════════════════════

/// A lazy, restartable sequence of raw payloads.
///
/// Implementations own their reconnect policy: a transport failure is
/// reported as [`FeedEvent::Retry`] after a bounded delay instead of ending
/// the sequence. Dropping the returned future cancels any pending wait.
pub trait MessageSource: Send {
    fn next_event(&mut self) -> Pin<Box<dyn Future<Output = FeedEvent> + Send + '_>>;
}

// ═══════════════════════════════════════════════════════════════
//  ChannelSource
// ═══════════════════════════════════════════════════════════════

/// In-process source fed through an mpsc channel. Ends with
/// [`FeedEvent::Closed`] once every sender is dropped.
pub struct ChannelSource {
    rx: mpsc::Receiver<Vec<u8>>,
}

impl ChannelSource {
    pub fn new(buffer: usize) -> (mpsc::Sender<Vec<u8>>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self { rx })
    }
}

impl MessageSource for ChannelSource {
    fn next_event(&mut self) -> Pin<Box<dyn Future<Output = FeedEvent> + Send + '_>> {
        Box::pin(async move {
            match self.rx.recv().await {
                Some(payload) => FeedEvent::Payload(payload),
                None => FeedEvent::Closed,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_source_yields_then_closes() {
        let (tx, mut source) = ChannelSource::new(4);
        tx.send(b"one".to_vec()).await.unwrap();
        tx.send(b"two".to_vec()).await.unwrap();
        drop(tx);

        assert_eq!(source.next_event().await, FeedEvent::Payload(b"one".to_vec()));
        assert_eq!(source.next_event().await, FeedEvent::Payload(b"two".to_vec()));
        assert_eq!(source.next_event().await, FeedEvent::Closed);
    }
}
