//! Service-specific tests
//!
//! One file per service implementation, sharing the fixtures below.

#[cfg(test)]
mod file_store;

// Common test utilities for services
#[cfg(test)]
pub mod common {
    use std::time::Duration;
    use tokio::time::timeout;

    use shared::{BatchJob, Difficulty, GeneratedSample, ProviderId, SampleContent, SampleType, WorkItem};

    /// Standard timeout for async operations in tests
    pub const TEST_TIMEOUT: Duration = Duration::from_millis(500);

    /// Helper to run async operations with timeout
    pub async fn with_timeout<T, F>(future: F) -> Result<T, tokio::time::error::Elapsed>
    where
        F: std::future::Future<Output = T>,
    {
        timeout(TEST_TIMEOUT, future).await
    }

    pub fn test_job(id: &str) -> BatchJob {
        BatchJob::new(id, 10, ProviderId::Groq, "llama-3.3-70b-versatile")
    }

    /// A stamped sample whose question carries `n` so tests can tell samples apart
    pub fn test_sample(batch_id: &str, n: usize) -> GeneratedSample {
        let content = SampleContent {
            work_item: WorkItem {
                category: "Contract Law".to_string(),
                subcategory: "Formation".to_string(),
                difficulty: Difficulty::Intermediate,
            },
            sample_type: SampleType::CaseAnalysis,
            body: serde_json::json!({
                "question": format!("question {n}"),
                "answer": "answer",
                "reasoning": "Step 1: read",
                "case_citation": "Carlill v Carbolic Smoke Ball Co [1893] 1 QB 256",
            }),
        };
        GeneratedSample::stamp(content, batch_id, ProviderId::Groq, "llama-3.3-70b-versatile", 100)
    }
}
