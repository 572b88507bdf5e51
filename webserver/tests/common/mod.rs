//! Shared setup for webserver tests

#![allow(dead_code)] // Test utilities may not all be used by every test binary

use axum::body::{to_bytes, Body};
use axum::http::{Request, Response};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use orchestrator::{BatchManager, BroadcastStatusChannel, InMemoryBatchStore, OrchestratorConfig, TopicCatalog};
use producer::SimulatedGenerator;
use webserver::AppState;

/// App state over an in-memory store and a failure-free simulated generator
pub fn test_state(latency: Duration) -> AppState {
    let channel = BroadcastStatusChannel::default();
    let manager = BatchManager::new(
        OrchestratorConfig::default(),
        TopicCatalog::default(),
        Arc::new(SimulatedGenerator::new(0.0).unwrap().with_latency(latency)),
        Arc::new(InMemoryBatchStore::new()),
        Arc::new(channel.clone()),
    )
    .expect("default configuration is valid");
    AppState::new(Arc::new(manager), channel)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
