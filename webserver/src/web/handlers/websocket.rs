//! WebSocket connection handler
//!
//! Each client gets a snapshot of every known batch on connect, then every
//! batch event as it is published. Clients only listen; anything they send
//! other than a close frame is ignored.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::AppState;
use crate::types::ServerMessage;

/// WebSocket connection handler - GET /ws
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

fn to_frame<T: Serialize>(message: &T) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(json) => Some(Message::Text(json)),
        Err(e) => {
            warn!("Failed to serialize client message: {}", e);
            None
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_websocket(socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();
    info!("🔗 New WebSocket connection: {}", client_id);

    // Subscribe before reading the snapshot so no event falls in between
    let mut events = state.channel.subscribe();
    let (mut sender, mut receiver) = socket.split();

    let batches = match state.manager.history().await {
        Ok(batches) => batches,
        Err(e) => {
            warn!("Snapshot for client {} failed: {}", client_id, e);
            Vec::new()
        }
    };
    if let Some(frame) = to_frame(&ServerMessage::Snapshot { batches }) {
        if sender.send(frame).await.is_err() {
            return;
        }
    }

    let outgoing_task = tokio::spawn(async move {
        loop {
            let frame = match events.recv().await {
                Ok(event) => to_frame(&event),
                Err(RecvError::Lagged(missed)) => {
                    debug!("Client {} lagged by {} events", client_id, missed);
                    to_frame(&ServerMessage::Lagged { missed })
                }
                Err(RecvError::Closed) => break,
            };
            let Some(frame) = frame else { continue };

            if let Err(e) = sender.send(frame).await {
                warn!("Failed to send message to client {}: {}", client_id, e);
                break;
            }
        }

        debug!("Outgoing message task ended for client {}", client_id);
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Close(_)) => {
                info!("Client {} requested close", client_id);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket error for client {}: {}", client_id, e);
                break;
            }
        }
    }

    outgoing_task.abort();
    info!("👋 WebSocket connection closed: {}", client_id);
}
