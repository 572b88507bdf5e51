//! Batch job state and its audit logs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::provider::ProviderId;
use super::work::{Difficulty, SampleTypeFilter};

/// Lifecycle status of a batch job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Running,
    Completed,
    Stopped,
    TimedOut,
    Exhausted,
}

impl BatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchStatus::Completed | BatchStatus::Stopped | BatchStatus::TimedOut | BatchStatus::Exhausted
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Running => "running",
            BatchStatus::Completed => "completed",
            BatchStatus::Stopped => "stopped",
            BatchStatus::TimedOut => "timed_out",
            BatchStatus::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Category assigned to a provider failure message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Authentication,
    ModelUnavailable,
    RateLimit,
    Timeout,
    ConnectionError,
    ServerError,
    BadRequest,
    General,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::ModelUnavailable => "model_unavailable",
            ErrorCategory::RateLimit => "rate_limit",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::ConnectionError => "connection_error",
            ErrorCategory::ServerError => "server_error",
            ErrorCategory::BadRequest => "bad_request",
            ErrorCategory::General => "general",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where an error record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Provider,
    ContentValidation,
    Persistence,
    Timeout,
    Exhaustion,
    IterationBudget,
    /// The job's loop died before it could finalise
    Aborted,
}

/// One entry in a job's error log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub timestamp: DateTime<Utc>,
    pub kind: ErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_item: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub message: String,
    /// True when the error ended the job
    #[serde(default)]
    pub fatal: bool,
}

impl ErrorRecord {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            category: None,
            work_item: None,
            provider: None,
            model: None,
            message: message.into(),
            fatal: false,
        }
    }

    pub fn with_category(mut self, category: ErrorCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_work_item(mut self, key: impl Into<String>) -> Self {
        self.work_item = Some(key.into());
        self
    }

    pub fn with_target(mut self, provider: ProviderId, model: &str) -> Self {
        self.provider = Some(provider);
        self.model = Some(model.to_string());
        self
    }

    pub fn fatal(mut self) -> Self {
        self.fatal = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchKind {
    Model,
    Provider,
}

/// A change of generation target recorded in the job's switch logs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchRecord {
    pub kind: SwitchKind,
    pub from_provider: ProviderId,
    pub to_provider: ProviderId,
    pub from_model: String,
    pub to_model: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
    pub samples_generated: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Observability view of one circuit breaker entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitEntry {
    pub state: CircuitState,
    pub failure_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_failure: Option<String>,
}

/// One orchestrated run targeting a total sample count
///
/// Cloned values are snapshots; the live instance is owned by exactly one
/// orchestrator loop. Mutators refuse to change a job once it is terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchJob {
    pub id: String,
    pub target: u32,
    pub provider: ProviderId,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty_filter: Option<Difficulty>,
    #[serde(default)]
    pub sample_type_filter: SampleTypeFilter,
    pub status: BatchStatus,
    pub samples_generated: u32,
    #[serde(default)]
    pub samples_persisted: u32,
    pub total_tokens: u64,
    pub consecutive_failures: u32,
    #[serde(default)]
    pub iterations: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_item: Option<String>,
    #[serde(default)]
    pub model_switches: Vec<SwitchRecord>,
    #[serde(default)]
    pub provider_switches: Vec<SwitchRecord>,
    #[serde(default)]
    pub errors: Vec<ErrorRecord>,
    #[serde(default)]
    pub failed_models_by_provider: BTreeMap<ProviderId, BTreeSet<String>>,
    #[serde(default)]
    pub skipped_items: BTreeSet<String>,
    #[serde(default)]
    pub circuit_breakers: BTreeMap<String, CircuitEntry>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl BatchJob {
    pub fn new(id: impl Into<String>, target: u32, provider: ProviderId, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            target,
            provider,
            model: model.into(),
            topic_filter: None,
            difficulty_filter: None,
            sample_type_filter: SampleTypeFilter::Balance,
            status: BatchStatus::Pending,
            samples_generated: 0,
            samples_persisted: 0,
            total_tokens: 0,
            consecutive_failures: 0,
            iterations: 0,
            current_item: None,
            model_switches: Vec::new(),
            provider_switches: Vec::new(),
            errors: Vec::new(),
            failed_models_by_provider: BTreeMap::new(),
            skipped_items: BTreeSet::new(),
            circuit_breakers: BTreeMap::new(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn with_filters(
        mut self,
        topic: Option<String>,
        difficulty: Option<Difficulty>,
        sample_type: SampleTypeFilter,
    ) -> Self {
        self.topic_filter = topic;
        self.difficulty_filter = difficulty;
        self.sample_type_filter = sample_type;
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_running(&self) -> bool {
        self.status == BatchStatus::Running
    }

    pub fn samples_needed(&self) -> u32 {
        self.target.saturating_sub(self.samples_generated)
    }

    pub fn mark_running(&mut self) {
        if self.status == BatchStatus::Pending {
            self.status = BatchStatus::Running;
        }
    }

    /// Count a successful generation and reset the failure streak
    pub fn record_success(&mut self, tokens: u64) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.samples_generated += 1;
        self.total_tokens += tokens;
        self.consecutive_failures = 0;
        true
    }

    pub fn record_error(&mut self, record: ErrorRecord) {
        if !self.is_terminal() {
            self.errors.push(record);
        }
    }

    /// Append to the model or provider switch log and retarget the job
    pub fn record_switch(&mut self, record: SwitchRecord) {
        if self.is_terminal() {
            return;
        }
        self.provider = record.to_provider;
        self.model = record.to_model.clone();
        self.consecutive_failures = 0;
        match record.kind {
            SwitchKind::Model => self.model_switches.push(record),
            SwitchKind::Provider => self.provider_switches.push(record),
        }
    }

    pub fn mark_model_failed(&mut self, provider: ProviderId, model: &str) {
        self.failed_models_by_provider
            .entry(provider)
            .or_default()
            .insert(model.to_string());
    }

    /// Total switches of either kind
    pub fn switch_count(&self) -> usize {
        self.model_switches.len() + self.provider_switches.len()
    }

    /// Move to a terminal status; a job that is already terminal keeps its first outcome
    pub fn finish(&mut self, status: BatchStatus) -> bool {
        if self.is_terminal() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        self.completed_at = Some(Utc::now());
        self.current_item = None;
        true
    }
}
