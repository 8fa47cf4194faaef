//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続ごとの `UnboundedSender` を管理
//! - RelayEvent を JSON フレームにエンコードして送信（push_to, broadcast）
//!
//! ## 設計ノート
//!
//! WebSocket の生成は UI 層（`ui/handler/websocket.rs`）で行われます。
//! この実装は生成された `UnboundedSender` を受け取り、メッセージ送信に使用します。
//! 登録解除するとチャンネルの送信側が drop され、接続の送信タスクが終了します。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ConnectionId, MessagePushError, MessagePusher, PusherChannel, RelayEvent};
use crate::infrastructure::dto::conversion::encode_event;

/// WebSocket を使った MessagePusher 実装
///
/// ## 使用例
///
/// ```ignore
/// let pusher = WebSocketMessagePusher::new();
/// pusher.register_client(connection, tx).await;
/// pusher.push_to(&connection, &RelayEvent::error("oops")).await?;
/// ```
#[derive(Default)]
pub struct WebSocketMessagePusher {
    /// 接続中のクライアントの送信チャンネル
    clients: Arc<Mutex<HashMap<ConnectionId, PusherChannel>>>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登録済みの接続数
    pub async fn client_count(&self) -> usize {
        self.clients.lock().await.len()
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(&self, connection: ConnectionId, sender: PusherChannel) {
        let mut clients = self.clients.lock().await;
        clients.insert(connection, sender);
        tracing::debug!(connection = %connection, "connection registered to MessagePusher");
    }

    async fn unregister_client(&self, connection: &ConnectionId) {
        let mut clients = self.clients.lock().await;
        if clients.remove(connection).is_some() {
            tracing::debug!(connection = %connection, "connection unregistered from MessagePusher");
        }
    }

    async fn is_registered(&self, connection: &ConnectionId) -> bool {
        self.clients.lock().await.contains_key(connection)
    }

    async fn push_to(
        &self,
        connection: &ConnectionId,
        event: &RelayEvent,
    ) -> Result<(), MessagePushError> {
        let frame =
            encode_event(event).map_err(|e| MessagePushError::EncodeFailed(e.to_string()))?;
        let clients = self.clients.lock().await;

        let sender = clients
            .get(connection)
            .ok_or_else(|| MessagePushError::ClientNotFound(connection.to_string()))?;
        sender
            .send(frame)
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
        tracing::trace!(connection = %connection, event = event.name(), "pushed event");
        Ok(())
    }

    async fn broadcast(
        &self,
        targets: Vec<ConnectionId>,
        event: &RelayEvent,
    ) -> Result<(), MessagePushError> {
        // 1 回だけエンコードし、全員に同じフレームを送る
        let frame =
            encode_event(event).map_err(|e| MessagePushError::EncodeFailed(e.to_string()))?;
        let clients = self.clients.lock().await;

        for target in targets {
            match clients.get(&target) {
                // ブロードキャストでは一部の送信失敗を許容
                Some(sender) => {
                    if let Err(e) = sender.send(frame.clone()) {
                        tracing::warn!(connection = %target, "failed to push {}: {}", event.name(), e);
                    }
                }
                None => {
                    tracing::warn!(
                        connection = %target,
                        "connection not found during broadcast of {}, skipping",
                        event.name()
                    );
                }
            }
        }

        Ok(())
    }
}
