//! Main webserver implementation
//!
//! Routes the trigger surface and the live status websocket onto one axum
//! router, and owns the listener lifecycle.

use std::net::SocketAddr;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use shared::{process_info, ProcessId};

use crate::error::{WebServerError, WebServerResult};
use crate::state::AppState;
use crate::web::handlers::{api, websocket};

/// Build the Axum router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // WebSocket route
        .route("/ws", get(websocket::websocket_handler))

        // API routes
        .route("/api/batch/start", post(api::start_batch))
        .route("/api/batch/stop", post(api::stop_batch))
        .route("/api/batch/status", get(api::latest_status))
        .route("/api/batch/status/:batch_id", get(api::batch_status))
        .route("/api/batch/history", get(api::batch_history))

        // Health check
        .route("/health", get(api::health))

        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()) // Allow CORS for development
                .into_inner(),
        )
        .with_state(state)
}

pub struct WebServer {
    state: AppState,
    bind_address: SocketAddr,
}

impl WebServer {
    pub fn new(state: AppState, bind_address: SocketAddr) -> Self {
        Self { state, bind_address }
    }

    /// Serve until Ctrl+C, then stop every batch and wait for them to finalise
    pub async fn run(self) -> WebServerResult<()> {
        let router = build_router(self.state.clone());

        let listener = tokio::net::TcpListener::bind(self.bind_address)
            .await
            .map_err(|e| WebServerError::ServerStartup(format!("Failed to bind to {}: {}", self.bind_address, e)))?;

        process_info!(ProcessId::current(), "🌐 Web server listening on http://{}", self.bind_address);
        process_info!(ProcessId::current(), "📡 Live status at ws://{}/ws", self.bind_address);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| WebServerError::ServerStartup(format!("Server error: {}", e)))?;

        let finished = self.state.manager.shutdown().await;
        process_info!(ProcessId::current(), "🛑 Finalised {} batches on shutdown", finished.len());
        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => shared::logging::log_shutdown(ProcessId::current(), "Received Ctrl+C signal"),
        Err(err) => shared::logging::log_error(ProcessId::current(), "Signal handling", &err),
    }
}
