//! UseCase: 接続の受け付け
//!
//! トランスポート接続の送信チャンネルを MessagePusher に登録します。
//! この時点ではまだ identity を持たない `CONNECTING` のセッションです。

use crate::domain::{ConnectionId, PusherChannel};

use super::notifier::Notifier;

/// 接続受け付けのユースケース
pub struct ConnectParticipantUseCase {
    notifier: Notifier,
}

impl ConnectParticipantUseCase {
    pub fn new(notifier: Notifier) -> Self {
        Self { notifier }
    }

    pub async fn execute(&self, connection: ConnectionId, sender: PusherChannel) {
        self.notifier.register(connection, sender).await;
        tracing::debug!(connection = %connection, "connection accepted");
    }
}
