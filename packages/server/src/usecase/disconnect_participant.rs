//! UseCase: 参加者切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectParticipantUseCase::execute() / expire_grace() メソッド
//! - 切断時に猶予期間を開始し、満了時にだけ userLeft を通知すること
//!
//! ### なぜこのテストが必要か
//! - 短い再接続（リロードなど）を「退出」として扱わないことを保証
//! - 再接続後に届いた古いタイマーの満了が破棄されることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：切断 → 猶予満了 → userLeft + userList
//! - エッジケース：切断 → 再接続 → 古いタイマーの満了（何も起きない）
//! - エッジケース：join 前の切断（猶予なし）

use std::{sync::Arc, time::Duration};

use parlor_shared::time::Clock;

use crate::domain::{
    ConnectionId, GraceTicket, MessageDraft, PresenceEntry, RelayEvent, Timestamp, UserId,
};

use super::{notifier::Notifier, state::RelayState};

/// 参加者切断のユースケース
pub struct DisconnectParticipantUseCase {
    notifier: Notifier,
    clock: Arc<dyn Clock>,
    grace: Duration,
}

impl DisconnectParticipantUseCase {
    pub fn new(notifier: Notifier, clock: Arc<dyn Clock>, grace: Duration) -> Self {
        Self {
            notifier,
            clock,
            grace,
        }
    }

    /// 切断を処理し、猶予期間を開始する
    ///
    /// # Arguments
    ///
    /// * `connection` - 閉じた接続
    /// * `user_id` - その接続が join していた userId（join 前の切断なら `None`）
    ///
    /// # Returns
    ///
    /// 猶予タイマーを起動すべきならそのチケット。
    /// 置き換え済みの古い接続の切断や join 前の切断では `None`。
    pub async fn execute(
        &self,
        state: &mut RelayState,
        connection: ConnectionId,
        user_id: Option<UserId>,
    ) -> Option<GraceTicket> {
        self.notifier.release(&connection).await;

        let user_id = user_id?;
        let now = Timestamp::new(self.clock.now_millis());
        let ticket = state
            .registry
            .begin_grace(&user_id, connection, self.grace, now)?;
        tracing::debug!(
            user_id = %user_id,
            seq = ticket.seq,
            "grace period started ({}s)",
            self.grace.as_secs()
        );
        Some(ticket)
    }

    /// 猶予タイマーの満了を処理する
    ///
    /// チケットが古い（再接続済みなど）場合は何もせず `None` を返します。
    pub async fn expire_grace(
        &self,
        state: &mut RelayState,
        ticket: &GraceTicket,
    ) -> Option<PresenceEntry> {
        let Some(entry) = state.registry.expire_grace(ticket) else {
            tracing::debug!(user_id = %ticket.user_id, seq = ticket.seq, "discarded stale grace timer");
            return None;
        };

        tracing::info!(user_id = %ticket.user_id, "grace period expired, participant left");
        let now = Timestamp::new(self.clock.now_millis());
        announce_departure(&self.notifier, state, &entry, now).await;
        Some(entry)
    }
}

/// 退出をシステムメッセージとして記録し、userLeft と userList を全員に送る
pub(super) async fn announce_departure(
    notifier: &Notifier,
    state: &mut RelayState,
    entry: &PresenceEntry,
    now: Timestamp,
) {
    let username = entry.identity.username.clone();
    let message = format!("{} left the chat", username);
    state.log.append(MessageDraft::system(message.clone(), now));

    notifier
        .fan_out(
            state,
            RelayEvent::UserLeft {
                username,
                message,
                timestamp: now,
            },
        )
        .await;
    let users = state.registry.list();
    notifier.fan_out(state, RelayEvent::UserList { users }).await;
}
