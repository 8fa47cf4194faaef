//! One WebSocket session against the relay.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Error as WsError, protocol::Message},
};

use parlor_server::{
    infrastructure::dto::websocket::{ClientMessage, JoinPayload, MessagePayload, ServerMessage},
    usecase::RelayError,
};

use crate::error::ClientError;

use super::{formatter::MessageFormatter, runner::ClientOptions, ui::redisplay_prompt};

/// Interval between heartbeats, well inside the relay's staleness window
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Run a single session until the connection drops or input ends.
///
/// Returns `Ok(())` when the user ended input, so the caller should not reconnect.
pub async fn run_client_session(
    options: &ClientOptions,
    input_rx: &mut mpsc::UnboundedReceiver<String>,
) -> Result<(), ClientError> {
    let (ws_stream, _response) = connect_async(options.url.as_str())
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))?;

    tracing::info!(user_id = %options.user_id, "Connected to relay");
    println!(
        "\nYou are '{}'. Type messages and press Enter to send. Press Ctrl+C to exit.\n",
        options.username
    );

    let (mut write, mut read) = ws_stream.split();

    // Every connection, first or reconnect, starts with a join
    send_event(
        &mut write,
        &ClientMessage::Join(JoinPayload {
            user_id: options.user_id.clone(),
            username: options.username.clone(),
        }),
    )
    .await?;

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;
    let mut rejection: Option<String> = None;

    loop {
        tokio::select! {
            frame = read.next() => {
                if let Some(ended) = on_frame(frame, &options.username, &mut rejection) {
                    return Err(ended);
                }
            }
            line = input_rx.recv() => match line {
                Some(text) => {
                    send_event(&mut write, &ClientMessage::Message(MessagePayload { text })).await?;
                }
                None => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }
            },
            _ = heartbeat.tick() => {
                tracing::debug!("Sending heartbeat");
                send_event(&mut write, &ClientMessage::Heartbeat).await?;
            }
        }
    }
}

/// Print one relay frame. Returns the reason once the connection has ended.
///
/// A superseded error is remembered in `rejection` so that the close that
/// follows it ends the client instead of triggering a reconnect.
fn on_frame(
    frame: Option<Result<Message, WsError>>,
    username: &str,
    rejection: &mut Option<String>,
) -> Option<ClientError> {
    match frame {
        Some(Ok(Message::Text(text))) => {
            match serde_json::from_str::<ServerMessage>(text.as_str()) {
                Ok(message) => {
                    if let ServerMessage::Error(payload) = &message
                        && payload.message == RelayError::Superseded.to_string()
                    {
                        *rejection = Some(payload.message.clone());
                    }
                    print!("{}", MessageFormatter::format(&message, username));
                }
                Err(_) => print!("{}", MessageFormatter::format_raw_message(text.as_str())),
            }
            redisplay_prompt(username);
            None
        }
        Some(Ok(Message::Binary(data))) => {
            print!("{}", MessageFormatter::format_binary_message(data.len()));
            redisplay_prompt(username);
            None
        }
        Some(Ok(Message::Close(_))) | None => {
            tracing::info!("Relay closed the connection");
            Some(match rejection.take() {
                Some(reason) => ClientError::SessionRejected(reason),
                None => ClientError::ConnectionError("Connection closed".to_string()),
            })
        }
        Some(Ok(_)) => None,
        Some(Err(e)) => {
            tracing::warn!("WebSocket read error: {}", e);
            Some(ClientError::ConnectionError(e.to_string()))
        }
    }
}

async fn send_event(
    write: &mut SplitSink<WsStream, Message>,
    event: &ClientMessage,
) -> Result<(), ClientError> {
    let json = serde_json::to_string(event)
        .map_err(|e| ClientError::ConnectionError(format!("failed to encode event: {}", e)))?;

    write
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_frame(message: &str) -> Option<Result<Message, WsError>> {
        let json = serde_json::json!({"event": "error", "data": {"message": message}});
        Some(Ok(Message::Text(json.to_string().into())))
    }

    #[test]
    fn test_close_after_superseded_error_rejects_session() {
        // テスト項目: superseded エラーの後に切断されると SessionRejected になる
        // given (前提条件):
        let mut rejection = None;
        let frame = error_frame(&RelayError::Superseded.to_string());
        assert!(on_frame(frame, "Alice", &mut rejection).is_none());

        // when (操作):
        let ended = on_frame(Some(Ok(Message::Close(None))), "Alice", &mut rejection);

        // then (期待する結果):
        assert!(matches!(ended, Some(ClientError::SessionRejected(_))));
    }

    #[test]
    fn test_close_after_other_error_is_connection_error() {
        // テスト項目: 入力エラーの後の切断は通常の接続エラー（再接続対象）になる
        // given (前提条件):
        let mut rejection = None;
        let frame = error_frame(&RelayError::NotJoined.to_string());
        assert!(on_frame(frame, "Alice", &mut rejection).is_none());

        // when (操作):
        let ended = on_frame(None, "Alice", &mut rejection);

        // then (期待する結果):
        assert!(matches!(ended, Some(ClientError::ConnectionError(_))));
    }
}
