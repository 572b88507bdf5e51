//! Tests for producer services
//!
//! Provider calls run against a local wiremock server standing in for each
//! provider's HTTP API.


// Re-export test utilities
pub use crate::traits::*;
