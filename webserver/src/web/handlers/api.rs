//! REST API handlers
//!
//! The trigger surface: start, stop, status and history of batches.

use axum::{
    body::Bytes,
    extract::{Path, State},
    response::Json,
};

use shared::{
    process_info, BatchJob, BatchListResponse, ProcessId, StartBatchRequest, StartBatchResponse, StopBatchRequest,
    StopBatchResponse,
};

use crate::error::{WebServerError, WebServerResult};
use crate::state::AppState;
use crate::types::HealthResponse;

/// Start a batch - POST /api/batch/start
pub async fn start_batch(
    State(state): State<AppState>,
    Json(request): Json<StartBatchRequest>,
) -> WebServerResult<Json<StartBatchResponse>> {
    let batch_id = state.manager.start(request).await?;
    process_info!(ProcessId::current(), "🌐 Batch {} started over HTTP", batch_id);
    Ok(Json(StartBatchResponse { batch_id }))
}

/// Stop one batch, or all of them when the body is empty - POST /api/batch/stop
pub async fn stop_batch(State(state): State<AppState>, body: Bytes) -> WebServerResult<Json<StopBatchResponse>> {
    // Only an empty body means "stop everything"
    let request: StopBatchRequest = if body.iter().all(u8::is_ascii_whitespace) {
        StopBatchRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| WebServerError::InvalidRequest {
            message: format!("invalid stop request: {e}"),
        })?
    };
    let stopped = state.manager.stop(request.batch_id.as_deref()).await?;
    Ok(Json(StopBatchResponse { stopped }))
}

/// Most recent live batch - GET /api/batch/status
pub async fn latest_status(State(state): State<AppState>) -> WebServerResult<Json<BatchJob>> {
    state
        .manager
        .status(None)
        .await?
        .map(Json)
        .ok_or_else(|| WebServerError::not_found("no batch has been started"))
}

/// One batch by id - GET /api/batch/status/:batch_id
pub async fn batch_status(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> WebServerResult<Json<BatchJob>> {
    state
        .manager
        .status(Some(&batch_id))
        .await?
        .map(Json)
        .ok_or_else(|| WebServerError::not_found(format!("batch {batch_id}")))
}

/// Every known batch, newest first - GET /api/batch/history
pub async fn batch_history(State(state): State<AppState>) -> WebServerResult<Json<BatchListResponse>> {
    let batches = state.manager.history().await?;
    Ok(Json(BatchListResponse { batches }))
}

/// Health check - GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        live_clients: state.channel.subscriber_count(),
    })
}
