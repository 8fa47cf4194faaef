//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - Message Log への追加と、送信者を含む全 ACTIVE セッションへのファンアウト
//!
//! ### なぜこのテストが必要か
//! - 全員が同じ ID・同じ順序でメッセージを受け取ることを保証
//! - join していない / 置き換えられた接続からの送信がブロードキャストされないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：メッセージ送信とエコー
//! - 異常系：join 前の送信、置き換え済み接続からの送信

use std::sync::Arc;

use parlor_shared::time::Clock;

use crate::domain::{ConnectionId, Message, MessageDraft, MessageText, RelayEvent, Timestamp, UserId};

use super::{error::RelayError, notifier::Notifier, state::RelayState};

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    notifier: Notifier,
    clock: Arc<dyn Clock>,
}

impl SendMessageUseCase {
    pub fn new(notifier: Notifier, clock: Arc<dyn Clock>) -> Self {
        Self { notifier, clock }
    }

    /// メッセージ送信を実行
    ///
    /// # Returns
    ///
    /// * `Ok(Message)` - ID 採番済みのメッセージ（全 ACTIVE セッションに送信済み）
    /// * `Err(RelayError)` - 送信元がこの userId にバインドされていない
    pub async fn execute(
        &self,
        state: &mut RelayState,
        connection: ConnectionId,
        user_id: &UserId,
        text: MessageText,
    ) -> Result<Message, RelayError> {
        let author = state.bound_identity(user_id, connection)?;

        let now = Timestamp::new(self.clock.now_millis());
        state.registry.touch(user_id, now);
        let message = state.log.append(MessageDraft::user(author, text, now));
        tracing::debug!(user_id = %user_id, id = message.id.as_str(), "message appended");

        self.notifier
            .fan_out(state, RelayEvent::NewMessage(message.clone()))
            .await;

        Ok(message)
    }
}
