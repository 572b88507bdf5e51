//! Core business logic modules
//!
//! Pure decision logic with no I/O: failure classification, circuit
//! breaking, fallback selection, rate accounting and work sequencing. Time is
//! read from `tokio::time` so tests can drive it with a paused clock.

pub mod circuit_breaker;
pub mod error_classifier;
pub mod fallback;
pub mod rate_limiter;
pub mod topics;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
pub use error_classifier::{ClassifierRule, ErrorClassifier};
pub use fallback::{default_profile, FallbackSelector, TriedModels, DEFAULT_PROVIDER_ORDER};
pub use rate_limiter::RateWindow;
pub use topics::{TopicCatalog, WorkCycle};
