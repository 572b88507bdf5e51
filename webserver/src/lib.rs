//! Webserver library for the batch generation system
//!
//! HTTP trigger surface (start, stop, status, history) over a `BatchManager`,
//! and a WebSocket feed of live batch events.

pub mod error;
pub mod state;
pub mod types;
pub mod web;
pub mod webserver_impl;

// Re-export main types
pub use error::{WebServerError, WebServerResult};
pub use state::AppState;
pub use types::*;
pub use webserver_impl::{build_router, WebServer};
