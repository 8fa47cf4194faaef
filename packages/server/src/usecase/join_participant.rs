//! UseCase: 参加者の join
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinParticipantUseCase::execute() メソッド
//! - 新規参加 / 猶予期間中の再接続 / 別接続による置き換え の判定と通知
//!
//! ### なぜこのテストが必要か
//! - `userJoined` は本当に新しい参加者のときだけ送る（再接続で重複通知しない）
//! - 置き換えられた古い接続にエラーを送り、チャンネルを解放することを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規参加者の join（welcome, history, userJoined, userList）
//! - 正常系：猶予期間中の再接続（userJoined なし）
//! - エッジケース：同じ userId の別接続からの join（古い接続の置き換え）

use std::sync::Arc;

use parlor_shared::time::Clock;

use crate::domain::{
    ConnectionId, Identity, MessageDraft, RegisterOutcome, Registration, RelayEvent, Timestamp,
};

use super::{error::RelayError, notifier::Notifier, state::RelayState};

/// join のユースケース
pub struct JoinParticipantUseCase {
    notifier: Notifier,
    clock: Arc<dyn Clock>,
    /// join 時に送る直近メッセージの件数
    backfill: usize,
}

impl JoinParticipantUseCase {
    pub fn new(notifier: Notifier, clock: Arc<dyn Clock>, backfill: usize) -> Self {
        Self {
            notifier,
            clock,
            backfill,
        }
    }

    /// identity を接続にバインドし、本人と他の参加者に通知する
    ///
    /// # Arguments
    ///
    /// * `state` - Coordinator が所有する relay の状態
    /// * `connection` - join を送ってきた接続
    /// * `identity` - 検証済みの identity
    ///
    /// # Returns
    ///
    /// Registry への登録結果（新規 / 再接続 / 置き換え / 再 join）。
    /// 送信チャンネルが既に解放された接続からの join は破棄して `None` を返す
    pub async fn execute(
        &self,
        state: &mut RelayState,
        connection: ConnectionId,
        identity: Identity,
    ) -> Option<RegisterOutcome> {
        // 置き換えで解放された接続の join が遅れて届いても、identity を奪い返させない
        if !self.notifier.is_open(&connection).await {
            tracing::debug!(
                connection = %connection,
                user_id = %identity.user_id,
                "join from a released connection dropped"
            );
            return None;
        }

        let now = Timestamp::new(self.clock.now_millis());
        let user_id = identity.user_id.clone();
        let username = identity.username.clone();
        let outcome = state.registry.register(identity, connection, now);

        match &outcome.registration {
            Registration::New => {
                tracing::info!(user_id = %user_id, username = %username, "participant joined");
            }
            Registration::Reconnected => {
                tracing::info!(user_id = %user_id, "participant reconnected within grace period");
            }
            Registration::Superseded { previous } => {
                tracing::info!(
                    user_id = %user_id,
                    previous = %previous,
                    "participant joined from a new connection, releasing the old one"
                );
                self.notifier
                    .send_to(previous, RelayEvent::error(RelayError::Superseded.to_string()))
                    .await;
                self.notifier.release(previous).await;
            }
            Registration::Refreshed => {
                tracing::debug!(user_id = %user_id, "participant refreshed its identity");
            }
        }

        if outcome.registration != Registration::Refreshed {
            self.notifier
                .send_to(
                    &connection,
                    RelayEvent::Welcome {
                        message: format!("Welcome to the chat, {}!", username),
                        users: state.registry.list(),
                    },
                )
                .await;
            self.notifier
                .send_to(
                    &connection,
                    RelayEvent::History {
                        messages: state.log.tail(self.backfill),
                    },
                )
                .await;
        }

        if outcome.registration == Registration::New {
            let message = format!("{} joined the chat", username);
            state.log.append(MessageDraft::system(message.clone(), now));
            let event = RelayEvent::UserJoined {
                username,
                message,
                timestamp: now,
                users: state.registry.list(),
            };
            self.notifier.fan_out(state, event).await;
        }

        let users = state.registry.list();
        self.notifier
            .fan_out(state, RelayEvent::UserList { users })
            .await;

        Some(outcome)
    }
}
