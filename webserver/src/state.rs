//! Shared handler state

use std::sync::Arc;
use std::time::Instant;

use orchestrator::{BatchManager, BroadcastStatusChannel};

/// State cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<BatchManager>,
    /// Same channel the manager publishes to; websocket clients subscribe here
    pub channel: BroadcastStatusChannel,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(manager: Arc<BatchManager>, channel: BroadcastStatusChannel) -> Self {
        Self {
            manager,
            channel,
            started_at: Instant::now(),
        }
    }
}
