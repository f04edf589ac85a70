//! `WebSocket` handler for live waiting-list updates.
//!
//! Clients connect to `GET /ws/queue` and receive a JSON-encoded
//! [`BroadcastMessage`](clinicq_types::BroadcastMessage)
//! (`{"type": "queue_update", "queue": [...]}`) on every push. A fresh
//! snapshot is sent right after the upgrade so a display never starts
//! blank.
//!
//! Each connection owns one [`Subscription`]. If the display reads too
//! slowly the broadcaster drops it, the subscription ends, and this
//! handler closes the socket. The subscription is removed explicitly on
//! every exit path.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use clinicq_core::Subscription;
use clinicq_types::BroadcastMessage;
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming queue updates.
///
/// # Route
///
/// `GET /ws/queue`
pub async fn ws_queue(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Subscribe, forward every message as a text frame, and unsubscribe on
/// the way out.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let mut subscription = state.broadcaster.subscribe().await;
    let id = subscription.id();
    debug!(subscriber = %id, "Display connected");

    match state.engine.waiting_list().await {
        Ok(queue) => {
            if !send_json(&mut socket, &BroadcastMessage::QueueUpdate { queue }).await {
                state.broadcaster.unsubscribe(id).await;
                return;
            }
        }
        Err(e) => warn!(subscriber = %id, error = %e, "Initial snapshot failed"),
    }

    forward(&mut socket, &mut subscription).await;

    state.broadcaster.unsubscribe(id).await;
    debug!(subscriber = %id, "Display disconnected");
}

async fn forward(socket: &mut WebSocket, subscription: &mut Subscription) {
    loop {
        tokio::select! {
            // Next queue update from the broadcaster.
            update = subscription.recv() => {
                let Some(message) = update else {
                    debug!(subscriber = %subscription.id(), "Subscription dropped, closing socket");
                    let _ = socket.send(Message::Close(None)).await;
                    return;
                };
                if !send_json(socket, &message).await {
                    return;
                }
            }
            // Check if the client sent a close frame or disconnected.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => return,
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        return;
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Send one JSON text frame. Returns `false` once the socket is unusable.
async fn send_json(socket: &mut WebSocket, message: &BroadcastMessage) -> bool {
    let json = match serde_json::to_string(message) {
        Ok(j) => j,
        Err(e) => {
            warn!("Failed to serialize queue update: {e}");
            return true;
        }
    };
    socket.send(Message::Text(json.into())).await.is_ok()
}
