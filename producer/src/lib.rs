//! Producer library for the batch generation system
//!
//! Concrete sample generators: `LlmSampleGenerator` calls remote providers
//! through an `ApiClient` and validates their output, `SimulatedGenerator`
//! produces synthetic samples for dry runs.

pub mod core;
pub mod error;
pub mod services;
pub mod traits;
pub mod types;

// Re-export main types
pub use error::{ProducerError, ProducerResult};
pub use types::*;
pub use traits::*;
pub use core::{LlmSampleGenerator, SimulatedGenerator};
pub use services::RealApiClient;
