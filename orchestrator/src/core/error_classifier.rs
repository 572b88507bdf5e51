//! Failure message classification
//!
//! Maps raw provider failure text onto a fixed set of categories by
//! case-insensitive substring matching. Rules are checked in priority order and
//! the first category with a matching keyword wins.

use shared::ErrorCategory;

const AUTHENTICATION: &[&str] = &[
    "authentication",
    "unauthorized",
    "401",
    "403",
    "forbidden",
    "invalid api key",
    "api key",
];

const MODEL_UNAVAILABLE: &[&str] = &[
    "model not found",
    "model_not_found",
    "unknown model",
    "does not exist",
    "not found",
    "404",
    "unavailable",
    "decommissioned",
    "busy",
    "overloaded",
    "capacity",
    "flex tier",
    "498",
];

const RATE_LIMIT: &[&str] = &[
    "rate limit",
    "rate_limit",
    "quota",
    "too many requests",
    "429",
    "resource exhausted",
    "resource_exhausted",
    "throttled",
    "rpm",
    "tpm",
];

const TIMEOUT: &[&str] = &["timeout", "timed out", "deadline exceeded", "took too long", "408"];

const CONNECTION_ERROR: &[&str] = &[
    "connection",
    "network",
    "refused",
    "unreachable",
    "bad gateway",
    "502",
    "gateway",
    "dns",
];

const SERVER_ERROR: &[&str] = &["500", "503", "504", "internal server", "server error"];

const BAD_REQUEST: &[&str] = &["400", "bad request", "invalid request", "unprocessable", "422"];

/// Keyword rule for one category
#[derive(Debug, Clone)]
pub struct ClassifierRule {
    pub category: ErrorCategory,
    pub keywords: Vec<String>,
}

impl ClassifierRule {
    pub fn new(category: ErrorCategory, keywords: &[&str]) -> Self {
        Self {
            category,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    fn matches(&self, message: &str) -> bool {
        self.keywords.iter().any(|keyword| message.contains(keyword.as_str()))
    }
}

/// Ordered keyword classifier
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    rules: Vec<ClassifierRule>,
}

impl ErrorClassifier {
    pub fn new(rules: Vec<ClassifierRule>) -> Self {
        Self { rules }
    }

    /// Category for a raw failure message; `General` when nothing matches
    pub fn classify(&self, message: &str) -> ErrorCategory {
        let lowered = message.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map(|rule| rule.category)
            .unwrap_or(ErrorCategory::General)
    }

    /// Whether a failure of this category moves the job to another model at once
    pub fn requires_immediate_switch(&self, category: ErrorCategory) -> bool {
        !matches!(category, ErrorCategory::BadRequest | ErrorCategory::General)
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(vec![
            ClassifierRule::new(ErrorCategory::Authentication, AUTHENTICATION),
            ClassifierRule::new(ErrorCategory::ModelUnavailable, MODEL_UNAVAILABLE),
            ClassifierRule::new(ErrorCategory::RateLimit, RATE_LIMIT),
            ClassifierRule::new(ErrorCategory::Timeout, TIMEOUT),
            ClassifierRule::new(ErrorCategory::ConnectionError, CONNECTION_ERROR),
            ClassifierRule::new(ErrorCategory::ServerError, SERVER_ERROR),
            ClassifierRule::new(ErrorCategory::BadRequest, BAD_REQUEST),
        ])
    }
}
