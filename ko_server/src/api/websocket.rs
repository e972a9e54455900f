//! WebSocket handler for real-time bracket notifications.
//!
//! Entrants subscribe to their own notification stream and receive a JSON
//! message whenever a bracket event concerns them: the bracket is released,
//! an opponent lands in their next match, or the tournament settles.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws/{entrant_ref}`
//! 2. Server registers the entrant with the notification hub
//! 3. Notifications queued for the entrant are pushed as they arrive
//! 4. On disconnect, the registration is cleaned up
//!
//! Delivery is one-way. Client frames other than close are ignored.
//!
//! # Server Messages
//!
//! ```json
//! {
//!   "entrant": 7,
//!   "title": "Match ready",
//!   "message": "Your round 2 opponent in Summer Cup is set.",
//!   "link": "/events/1/matches/5"
//! }
//! ```
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:8080/ws/7');
//!
//! ws.onmessage = (event) => {
//!   const notification = JSON.parse(event.data);
//!   showToast(notification.title, notification.message, notification.link);
//! };
//! ```

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use knockout::bracket::models::EntrantRef;
use tracing::{error, info};

use super::AppState;
use crate::metrics;

/// Upgrade HTTP connection to WebSocket for notification delivery.
///
/// # Path Parameters
///
/// - `entrant_ref`: Entrant to receive notifications for
///
/// # Response
///
/// On success, upgrades the connection to WebSocket protocol
/// (101 Switching Protocols).
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(entrant_ref): Path<EntrantRef>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, entrant_ref, state))
}

/// Handle an established WebSocket connection.
///
/// Registers the entrant with the notification hub, forwards queued
/// notifications until the client disconnects, then removes the
/// registration.
async fn handle_socket(socket: WebSocket, entrant_ref: EntrantRef, state: AppState) {
    let mut rx = state.hub.register(entrant_ref).await;
    metrics::ws_connection_opened();

    info!("WebSocket connected: entrant={}", entrant_ref);

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            maybe_notification = rx.recv() => {
                match maybe_notification {
                    Some(notification) => {
                        let json = match serde_json::to_string(&notification) {
                            Ok(j) => j,
                            Err(e) => {
                                error!("Failed to serialize notification: {}", e);
                                continue;
                            }
                        };

                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    // Channel replaced by a newer connection for this entrant.
                    None => break,
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // One-way stream: other client frames are ignored.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    // Drop the receiver before unregistering so the hub can tell a dead
    // registration from one a reconnect already replaced.
    drop(rx);
    state.hub.unregister(entrant_ref).await;
    metrics::ws_connection_closed();

    info!("WebSocket disconnected: entrant={}", entrant_ref);
}
