pub mod handlers;
mod host;
mod player;
mod session;

pub use session::{Membership, Session};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!("WebSocket connection request");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Serialize and send one message. Returns false once the socket is gone.
async fn send(sender: &mut SplitSink<WebSocket, Message>, msg: &ServerMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize message: {}", e);
            true
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut session = Session::new();

    loop {
        tokio::select! {
            // Room broadcasts, once this connection has joined a room
            room_msg = async {
                match session.receiver_mut() {
                    Some(rx) => rx.recv().await,
                    None => std::future::pending().await,
                }
            } => {
                match room_msg {
                    Ok(msg) => {
                        if !send(&mut sender, &msg).await {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        // Missed events are superseded by a fresh snapshot
                        let Some(membership) = session.membership() else {
                            continue;
                        };
                        tracing::warn!(
                            "Connection of {} lagged by {} messages, resyncing",
                            membership.pseudo,
                            skipped
                        );
                        let snapshot = membership.room.snapshot().await;
                        if !send(&mut sender, &ServerMessage::GameState(snapshot)).await {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => session.unsubscribe(),
                }
            }

            // Handle client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        let response = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                handlers::handle_message(client_msg, &mut session, &state).await
                            }
                            Err(e) => {
                                tracing::warn!("Failed to parse client message: {}", e);
                                Some(ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    message: format!("Invalid message format: {}", e),
                                })
                            }
                        };

                        if let Some(response) = response {
                            if !send(&mut sender, &response).await {
                                tracing::error!("Failed to send response");
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    handlers::handle_disconnect(&mut session).await;
    tracing::info!("WebSocket connection closed");
}
