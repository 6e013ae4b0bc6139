//! Realtime events endpoint.
//!
//! Observers connect over a websocket and receive the relay's change events
//! as JSON text frames. An observer that passes `?client=<id>` and sends the
//! same id in `x-client-id` on its mutating requests never sees its own
//! changes echoed back.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use serde::Deserialize;
use tokio::sync::broadcast;

use crate::relay::{should_deliver, RelayEvent};
use crate::AppState;

/// Query parameters for the events socket.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Observer identity used to suppress echoes of its own mutations.
    #[serde(default)]
    client: Option<String>,
}

/// GET /api/events - Subscribe to change events over a websocket.
pub async fn events_ws(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let rx = state.relay.subscribe();
    ws.on_upgrade(move |socket| relay_connection(socket, rx, query.client))
}

async fn relay_connection(
    mut socket: WebSocket,
    mut rx: broadcast::Receiver<RelayEvent>,
    client: Option<String>,
) {
    loop {
        tokio::select! {
            event = rx.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Events observer lagged, {} events dropped", skipped);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if !should_deliver(&event, client.as_deref()) {
                    continue;
                }
                let payload = match serde_json::to_string(&event) {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::warn!("Failed to serialize relay event: {}", e);
                        continue;
                    }
                };
                if socket.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            message = socket.recv() => {
                // Observers only listen; a close or error ends the subscription.
                match message {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }
}
