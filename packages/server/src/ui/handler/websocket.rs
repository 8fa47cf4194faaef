//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;

use crate::{
    domain::ConnectionId,
    ui::{
        session::{RelaySession, SessionAction},
        state::AppState,
    },
    usecase::{CoordinatorError, CoordinatorHandle, RelayError},
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Spawns a task that receives frames from the rx channel and pushes them to the WebSocket sender.
///
/// The task ends when the channel is closed, which happens when the connection is
/// unregistered from the MessagePusher, or when writing to the socket fails.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                return;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection = ConnectionId::generate();
    let (sender, mut receiver) = socket.split();

    // Create a channel for this connection to receive frames
    let (tx, rx) = mpsc::unbounded_channel();
    if let Err(e) = state.coordinator.connect(connection, tx) {
        tracing::warn!(connection = %connection, "Rejecting connection: {}", e);
        return;
    }
    tracing::info!(connection = %connection, "Connection opened");

    let mut send_task = pusher_loop(rx, sender);
    let mut session = RelaySession::new(connection, state.max_message_chars);

    loop {
        tokio::select! {
            frame = receiver.next() => {
                let msg = match frame {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        tracing::warn!(connection = %connection, "WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                };

                let action = match msg {
                    Message::Text(text) => session.on_text(text.as_str()),
                    Message::Binary(_) => session.on_binary(),
                    Message::Close(_) => {
                        tracing::debug!(connection = %connection, "Client requested close");
                        break;
                    }
                    // Ping/pong is handled automatically by the WebSocket protocol
                    Message::Ping(_) | Message::Pong(_) => continue,
                };

                if let Err(e) = apply(&state.coordinator, &mut session, action).await {
                    tracing::warn!(connection = %connection, "Closing session: {}", e);
                    break;
                }
            }
            _ = &mut send_task => {
                tracing::debug!(connection = %connection, "Outbound channel closed");
                break;
            }
        }
    }

    send_task.abort();
    let user_id = session.on_close();
    tracing::info!(
        connection = %connection,
        user_id = user_id.as_ref().map(|id| id.as_str()).unwrap_or("-"),
        "Connection closed"
    );
    if let Err(e) = state.coordinator.disconnect(connection, user_id) {
        tracing::warn!(connection = %connection, "Failed to report disconnect: {}", e);
    }
}

/// Hand a session action over to the coordinator
async fn apply(
    coordinator: &CoordinatorHandle,
    session: &mut RelaySession,
    action: SessionAction,
) -> Result<(), CoordinatorError> {
    let connection = session.connection();

    match action {
        SessionAction::Join(identity) => match coordinator.join(connection, identity).await {
            Ok(Some(outcome)) => {
                session.on_joined();
                tracing::debug!(
                    connection = %connection,
                    registration = ?outcome.registration,
                    "Session is active"
                );
            }
            // 送信チャンネルは解放済みなので、このあと送信タスクの終了でループを抜ける
            Ok(None) => session.on_join_failed(),
            Err(e) => {
                session.on_join_failed();
                return Err(e);
            }
        },
        SessionAction::Send { user_id, text } => {
            match coordinator.send_message(connection, user_id.clone(), text).await {
                Ok(_) => {}
                Err(RelayError::Unavailable) => return Err(CoordinatorError::Closed),
                Err(e) => coordinator.reject(connection, Some(user_id), e)?,
            }
        }
        SessionAction::Heartbeat(user_id) => coordinator.heartbeat(connection, user_id)?,
        SessionAction::Reject(e) => {
            coordinator.reject(connection, session.active_user_id().cloned(), e)?
        }
        SessionAction::Ignore => {}
    }

    Ok(())
}
