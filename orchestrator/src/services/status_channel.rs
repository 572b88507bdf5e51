//! Broadcast-backed live status channel
//!
//! Fans events out to any number of subscribers. Slow subscribers lag and
//! lose events instead of holding up publishers.

use tokio::sync::broadcast;

use shared::BatchEvent;

use crate::traits::StatusSink;

pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct BroadcastStatusChannel {
    sender: broadcast::Sender<BatchEvent>,
}

impl BroadcastStatusChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastStatusChannel {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl StatusSink for BroadcastStatusChannel {
    fn publish(&self, event: BatchEvent) {
        // No subscribers is not an error
        let _ = self.sender.send(event);
    }
}
