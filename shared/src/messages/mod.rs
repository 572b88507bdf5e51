//! Message types exchanged between the job manager and its clients
//!
//! - `api`: trigger surface requests and responses (start/stop/status/history)
//! - `events`: live status events pushed while batches run

pub mod api;
pub mod events;

pub use api::{BatchListResponse, StartBatchRequest, StartBatchResponse, StopBatchRequest, StopBatchResponse};
pub use events::BatchEvent;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BatchJob, ProviderId, SampleType, SampleTypeFilter};

    #[test]
    fn test_start_request_defaults() {
        let request: StartBatchRequest = serde_json::from_str(r#"{"target": 12}"#).unwrap();
        assert_eq!(request, StartBatchRequest::new(12));
    }

    #[test]
    fn test_start_request_full_body() {
        let request: StartBatchRequest = serde_json::from_str(
            r#"{"target": 4, "provider": "cerebras", "model": "qwen-3-32b",
                "topic": "Company Law", "difficulty": "expert", "sample_type": "educational"}"#,
        )
        .unwrap();

        assert_eq!(request.provider, Some(ProviderId::Cerebras));
        assert_eq!(request.model.as_deref(), Some("qwen-3-32b"));
        assert_eq!(request.sample_type, SampleTypeFilter::Fixed(SampleType::Educational));
    }

    #[test]
    fn test_event_is_tagged() {
        let event = BatchEvent::Terminal {
            batch: BatchJob::new("batch_1_00000000", 1, ProviderId::Groq, "llama-3.1-8b-instant"),
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "terminal");
        assert_eq!(json["batch"]["id"], "batch_1_00000000");
        assert!(event.is_terminal());
    }
}
