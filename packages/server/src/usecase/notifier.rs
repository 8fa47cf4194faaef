//! MessagePusher を使った送信のヘルパー
//!
//! 送信はベストエフォートです。失敗はログに残し、呼び出し元には返しません。

use std::sync::Arc;

use crate::domain::{ConnectionId, MessagePusher, PusherChannel, RelayEvent};

use super::state::RelayState;

#[derive(Clone)]
pub struct Notifier {
    message_pusher: Arc<dyn MessagePusher>,
}

impl Notifier {
    pub fn new(message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self { message_pusher }
    }

    pub async fn register(&self, connection: ConnectionId, sender: PusherChannel) {
        self.message_pusher.register_client(connection, sender).await;
    }

    /// 接続の送信チャンネルを解放する（送信タスクが終了し、ソケットが閉じる）
    pub async fn release(&self, connection: &ConnectionId) {
        self.message_pusher.unregister_client(connection).await;
    }

    /// 接続の送信チャンネルが解放されていなければ true
    pub async fn is_open(&self, connection: &ConnectionId) -> bool {
        self.message_pusher.is_registered(connection).await
    }

    pub async fn send_to(&self, connection: &ConnectionId, event: RelayEvent) {
        if let Err(e) = self.message_pusher.push_to(connection, &event).await {
            tracing::warn!(connection = %connection, "failed to send {}: {}", event.name(), e);
        }
    }

    /// 現在 ACTIVE な全セッションに送信
    ///
    /// 送信先はこの呼び出し時点の Registry のスナップショットから決まります。
    pub async fn fan_out(&self, state: &RelayState, event: RelayEvent) {
        let targets = state.registry.active_connections();
        if targets.is_empty() {
            return;
        }
        if let Err(e) = self.message_pusher.broadcast(targets, &event).await {
            tracing::warn!("failed to broadcast {}: {}", event.name(), e);
        }
    }
}
