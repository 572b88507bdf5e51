//! Service implementations
//!
//! Real implementations of the orchestrator's collaborator traits. These are
//! the parts that touch disk or fan out events.

pub mod file_store;
pub mod memory_store;
pub mod status_channel;

#[cfg(test)]
mod tests;

pub use file_store::FileBatchStore;
pub use memory_store::InMemoryBatchStore;
pub use status_channel::BroadcastStatusChannel;
