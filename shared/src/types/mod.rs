//! Core shared types and identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

pub mod batch;
pub mod provider;
pub mod sample;
pub mod work;

pub use batch::{
    BatchJob, BatchStatus, CircuitEntry, CircuitState, ErrorCategory, ErrorKind, ErrorRecord, SwitchKind,
    SwitchRecord,
};
pub use provider::{ProviderId, ProviderProfile, RateLimits};
pub use sample::{GeneratedSample, SampleContent};
pub use work::{Difficulty, SampleType, SampleTypeFilter, TopicEntry, WorkItem};

/// Global process ID singleton - set once at startup
static PROCESS_ID: OnceLock<ProcessId> = OnceLock::new();

/// Process identifier used to tag log output
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessId {
    /// Headless batch runner
    Orchestrator,
    /// HTTP trigger surface hosting the job manager
    WebServer,
}

impl ProcessId {
    /// Initialize the global process ID for the orchestrator binary
    pub fn init_orchestrator() -> &'static ProcessId {
        PROCESS_ID.get_or_init(|| ProcessId::Orchestrator)
    }

    /// Initialize the global process ID for the webserver binary
    pub fn init_webserver() -> &'static ProcessId {
        PROCESS_ID.get_or_init(|| ProcessId::WebServer)
    }

    /// Get the global process ID, defaulting to the orchestrator when unset
    pub fn current() -> &'static ProcessId {
        PROCESS_ID.get_or_init(|| ProcessId::Orchestrator)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessId::Orchestrator => write!(f, "orchestrator"),
            ProcessId::WebServer => write!(f, "webserver"),
        }
    }
}
