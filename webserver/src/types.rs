//! Type definitions for webserver
//!
//! Messages pushed to websocket clients besides the batch events themselves,
//! and the health endpoint body.

use serde::{Deserialize, Serialize};

use shared::BatchJob;

/// Non-event messages sent to websocket clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Every known batch, sent once on connect
    Snapshot { batches: Vec<BatchJob> },
    /// The client fell behind and `missed` events were dropped; poll status to resync
    Lagged { missed: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub live_clients: usize,
}
