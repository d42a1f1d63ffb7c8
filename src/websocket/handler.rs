use crate::{
    engine::GameEngine,
    session::GameSession,
    websocket::messages::{ClientMessage, ServerMessage},
    AppState, SessionInfo,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use uuid::Uuid;

/// WebSocket upgrade handler; each connection gets its own game
pub async fn handle_websocket(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<ServerMessage>(100);
    let (cmd_tx, cmd_rx) = mpsc::channel::<ClientMessage>(32);

    tracing::info!("WebSocket connection established: session {}", session_id);
    state.sessions.insert(
        session_id,
        SessionInfo {
            connected_at: Instant::now(),
        },
    );

    let engine = GameEngine::new(&state.vocabulary, &mut rand::rng());
    let session = GameSession::new(
        engine,
        state.vocabulary.clone(),
        state.judge.clone(),
        state.scores.clone(),
        state.config.tick_interval(),
        out_tx.clone(),
    );
    let mut session_task = tokio::spawn(session.run(cmd_rx));

    // Forward session output to the client
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to serialize message: {}", e);
                }
            }
        }
    });

    // Forward client messages into the session
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_msg) => {
                        if cmd_tx.send(client_msg).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!("Failed to parse message: {}", e);
                        let error_msg = ServerMessage::Error {
                            message: format!("Invalid message format: {}", e),
                        };
                        let _ = out_tx.send(error_msg).await;
                    }
                },
                Message::Close(_) => {
                    tracing::info!("Client disconnected: session {}", session_id);
                    break;
                }
                _ => {}
            }
        }
    });

    // Whichever side finishes first tears the connection down
    tokio::select! {
        _ = (&mut session_task) => {
            send_task.abort();
            recv_task.abort();
        }
        _ = (&mut send_task) => {
            session_task.abort();
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            session_task.abort();
            send_task.abort();
        }
    }

    state.sessions.remove(&session_id);
    tracing::info!("WebSocket connection closed: session {}", session_id);
}
