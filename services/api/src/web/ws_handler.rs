//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! It forwards client actions into the shared book and pushes every new snapshot,
//! including the ones produced by timers, back to the browser.

use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

type WsSender = SplitSink<WebSocket, Message>;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New WebSocket connection established");

    let (mut sender, mut receiver) = socket.split();
    // Subscribe before reading the initial snapshot so no transition slips between them.
    let mut updates = app_state.updates.subscribe();

    let initial = ServerMessage::State(app_state.snapshot().await);
    if send_message(&mut sender, &initial).await.is_err() {
        error!("Failed to send initial snapshot.");
        return;
    }

    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Some(reply) = handle_text_message(text.as_str(), &app_state).await {
                        if send_message(&mut sender, &reply).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) => {
                    info!("Client sent close message.");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket receive error: {}", e);
                    break;
                }
                None => {
                    info!("Client disconnected.");
                    break;
                }
            },
            update = updates.recv() => match update {
                Ok(message) => {
                    if send_message(&mut sender, &message).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Client fell behind, resending current state");
                    let resync = ServerMessage::State(app_state.snapshot().await);
                    if send_message(&mut sender, &resync).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    info!("WebSocket connection closed.");
}

/// Applies one client frame. The resulting snapshot arrives through the broadcast
/// channel, so only errors are answered directly.
async fn handle_text_message(text: &str, app_state: &Arc<AppState>) -> Option<ServerMessage> {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            warn!("Failed to parse client message: {}", e);
            return Some(ServerMessage::Error {
                message: format!("Invalid message: {}", e),
            });
        }
    };

    let action = match message.into_action() {
        Ok(action) => action,
        Err(e) => return Some(ServerMessage::Error { message: e.to_string() }),
    };

    match app_state.dispatch(action).await {
        Ok(dispatched) => dispatched
            .rejected
            .map(|reason| ServerMessage::Error { message: reason.to_string() }),
        Err(e) => {
            error!("Failed to apply action: {:?}", e);
            Some(ServerMessage::Error {
                message: "Failed to apply action.".to_string(),
            })
        }
    }
}

async fn send_message(sender: &mut WsSender, message: &ServerMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(message).map_err(axum::Error::new)?;
    sender.send(Message::Text(json.into())).await
}
