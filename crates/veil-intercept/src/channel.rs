use tokio::sync::broadcast;

use crate::error::{InterceptError, Result};
use crate::protocol::Message;

/// At-most-once message transport shared by both sides of the boundary.
/// Every subscriber sees every message posted after it subscribed.
pub trait MessageChannel: Send + Sync {
    fn post(&self, message: Message) -> Result<()>;

    fn subscribe(&self) -> broadcast::Receiver<Message>;
}

/// In-process channel over a tokio broadcast.
#[derive(Clone)]
pub struct BroadcastChannel {
    tx: broadcast::Sender<Message>,
}

impl BroadcastChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }
}

impl Default for BroadcastChannel {
    fn default() -> Self {
        Self::new(64)
    }
}

impl MessageChannel for BroadcastChannel {
    fn post(&self, message: Message) -> Result<()> {
        self.tx
            .send(message)
            .map(|_| ())
            .map_err(|_| InterceptError::ChannelClosed)
    }

    fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.tx.subscribe()
    }
}
