//! Shared fixtures for producer integration tests

#![allow(dead_code)] // Test utilities may not all be used by every test binary

use serde_json::json;
use std::time::Duration;

use producer::ProviderResponse;
use shared::{Difficulty, GenerationRequest, ProviderId, SampleType, WorkItem};

pub fn work_item(difficulty: Difficulty) -> WorkItem {
    WorkItem {
        category: "Contract Law".to_string(),
        subcategory: "Formation".to_string(),
        difficulty,
    }
}

pub fn request(sample_type: SampleType) -> GenerationRequest {
    GenerationRequest {
        batch_id: "batch_0_00000000".to_string(),
        work_item: work_item(Difficulty::Intermediate),
        sample_type,
        provider: ProviderId::Groq,
        model: "llama-3.3-70b-versatile".to_string(),
    }
}

/// A well-formed IRAC answer with the given number of reasoning steps
pub fn irac_body(steps: usize) -> String {
    let reasoning: Vec<String> = (1..=steps).map(|n| format!("Step {n}: reason {n}.")).collect();
    json!({
        "question": "Was a contract formed?",
        "answer": "ISSUE: offer. RULE: acceptance must be communicated. APPLICATION: it was. CONCLUSION: yes.",
        "reasoning": reasoning.join(" "),
        "case_citation": "Carlill v Carbolic Smoke Ball Co [1893] 1 QB 256",
        "sample_type": "educational"
    })
    .to_string()
}

pub fn response(content: impl Into<String>, tokens_used: u64) -> ProviderResponse {
    ProviderResponse {
        content: content.into(),
        tokens_used,
        response_time: Duration::from_millis(20),
    }
}
