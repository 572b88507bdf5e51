//! Producer services implementations

pub mod api_client;

#[cfg(test)]
pub mod tests;

pub use api_client::*;
