//! Per-ticket WebSocket streams.
//!
//! Each connection subscribes to exactly one ticket. The first frame is a
//! snapshot of the ticket's current state; every later frame is a stream
//! event in orchestrator emission order.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_EVENTS_SENT};
use crate::state::AppState;

/// WebSocket upgrade handler for `/ws/tickets/{id}`.
///
/// Unknown ticket ids are rejected with 404 before the upgrade completes.
pub async fn ticket_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<String>,
) -> impl IntoResponse {
    if state.service().get_ticket(&ticket_id).is_err() {
        return (StatusCode::NOT_FOUND, "ticket not found").into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state, ticket_id))
        .into_response()
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, ticket_id: String) {
    let (mut sender, mut receiver) = socket.split();

    // Attach after the upgrade so the snapshot reflects the state at
    // connection time, not at the HTTP handshake.
    let mut handle = match state.service().open_stream(&ticket_id) {
        Ok(handle) => handle,
        Err(e) => {
            warn!(ticket_id, error = %e, "stream attach failed after upgrade");
            let _ = sender.close().await;
            return;
        }
    };
    let subscriber_id = handle.id;

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();
    info!(ticket_id, subscriber_id, "WebSocket client connected");

    // Forward stream events to the client
    let send_task = tokio::spawn(async move {
        while let Some(event) = handle.receiver.recv().await {
            WS_EVENTS_SENT.with_label_values(&[event.kind()]).inc();
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, client disconnected");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize stream event: {}", e);
                }
            }
        }
    });

    // Handle incoming messages from client (ping/pong, close)
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Close(_)) => {
                debug!("WebSocket client requested close");
                break;
            }
            Ok(Message::Ping(data)) => {
                // Pong is handled automatically by axum
                debug!("Received ping: {:?}", data);
            }
            Ok(Message::Text(text)) => {
                // Clients have nothing to say on this socket, but log it
                debug!("Received text message: {}", text);
            }
            Ok(_) => {
                // Ignore other message types
            }
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    // Detach first: that drops the registry's sender, so the forwarder
    // finishes any in-flight send, drains what is left in the queue and
    // exits on its own instead of being cut off mid-frame.
    state.service().close_stream(&ticket_id, subscriber_id);
    let _ = send_task.await;
    WS_CONNECTIONS_ACTIVE.dec();
    info!(ticket_id, subscriber_id, "WebSocket client disconnected");
}
