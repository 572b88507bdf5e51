//! Per-work-item circuit breaker
//!
//! # States
//! - Closed: item is attempted normally
//! - Open: item is skipped until the cooldown elapses
//! - Half-Open: cooldown elapsed, one probe attempt is let through
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= threshold
//! Open → Half-Open: first is_open() query after cooldown
//! Half-Open → Closed: probe succeeds
//! Half-Open → Open: probe fails
//! ```
//!
//! Entries are created lazily on first failure and live only as long as the
//! owning job.

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

use shared::{CircuitEntry, CircuitState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
struct Circuit {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<String>,
    last_failure_at: Option<Instant>,
    opened_at: Option<Instant>,
}

impl Circuit {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure: None,
            last_failure_at: None,
            opened_at: None,
        }
    }
}

#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    circuits: HashMap<String, Circuit>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            circuits: HashMap::new(),
        }
    }

    /// True while the key's circuit is open and cooling down
    ///
    /// The first query after the cooldown moves the entry to half-open and
    /// returns false, letting a single probe through.
    pub fn is_open(&mut self, key: &str) -> bool {
        let cooldown = self.config.cooldown;
        let Some(circuit) = self.circuits.get_mut(key) else {
            return false;
        };
        if circuit.state != CircuitState::Open {
            return false;
        }

        let cooled = circuit
            .opened_at
            .map(|opened| opened.elapsed() >= cooldown)
            .unwrap_or(true);
        if cooled {
            circuit.state = CircuitState::HalfOpen;
            tracing::info!(key, "Circuit half-open, allowing probe");
            return false;
        }
        true
    }

    pub fn record_success(&mut self, key: &str) {
        if let Some(circuit) = self.circuits.get_mut(key) {
            if circuit.state != CircuitState::Closed {
                tracing::info!(key, "Circuit closed after successful probe");
            }
            circuit.state = CircuitState::Closed;
            circuit.failure_count = 0;
            circuit.opened_at = None;
        }
    }

    pub fn record_failure(&mut self, key: &str, reason: &str) {
        let threshold = self.config.failure_threshold;
        let circuit = self.circuits.entry(key.to_string()).or_insert_with(Circuit::new);
        let now = Instant::now();

        circuit.failure_count += 1;
        circuit.last_failure = Some(reason.to_string());
        circuit.last_failure_at = Some(now);

        let reopen = circuit.state == CircuitState::HalfOpen;
        if reopen || (circuit.state == CircuitState::Closed && circuit.failure_count >= threshold) {
            circuit.state = CircuitState::Open;
            circuit.opened_at = Some(now);
            tracing::warn!(
                key,
                failures = circuit.failure_count,
                "Circuit opened{}",
                if reopen { " again after failed probe" } else { "" }
            );
        }
    }

    pub fn state(&self, key: &str) -> CircuitState {
        self.circuits
            .get(key)
            .map(|circuit| circuit.state)
            .unwrap_or(CircuitState::Closed)
    }

    pub fn failure_count(&self, key: &str) -> u32 {
        self.circuits.get(key).map(|circuit| circuit.failure_count).unwrap_or(0)
    }

    pub fn last_failure_at(&self, key: &str) -> Option<Instant> {
        self.circuits.get(key).and_then(|circuit| circuit.last_failure_at)
    }

    /// Earliest instant at which any currently open circuit may be probed again
    pub fn next_probe_at(&self) -> Option<Instant> {
        self.circuits
            .values()
            .filter(|circuit| circuit.state == CircuitState::Open)
            .filter_map(|circuit| circuit.opened_at)
            .min()
            .map(|opened| opened + self.config.cooldown)
    }

    /// Read-only snapshot of every tracked key
    pub fn summary(&self) -> std::collections::BTreeMap<String, CircuitEntry> {
        self.circuits
            .iter()
            .map(|(key, circuit)| {
                (
                    key.clone(),
                    CircuitEntry {
                        state: circuit.state,
                        failure_count: circuit.failure_count,
                        last_failure: circuit.last_failure.clone(),
                    },
                )
            })
            .collect()
    }

    /// Forget one key, or every key
    pub fn reset(&mut self, key: Option<&str>) {
        match key {
            Some(key) => {
                self.circuits.remove(key);
            }
            None => self.circuits.clear(),
        }
    }
}
