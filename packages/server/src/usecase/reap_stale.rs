//! UseCase: stale な参加者の刈り取り
//!
//! 猶予タイマーの取りこぼしに対するバックストップです。lastSeenAt が
//! staleness window より古いエントリを削除し、猶予満了と同じように退出を通知します。

use std::{sync::Arc, time::Duration};

use parlor_shared::time::Clock;

use crate::domain::{PresenceEntry, Timestamp};

use super::{disconnect_participant::announce_departure, notifier::Notifier, state::RelayState};

pub struct ReapStaleUseCase {
    notifier: Notifier,
    clock: Arc<dyn Clock>,
    stale_after: Duration,
}

impl ReapStaleUseCase {
    pub fn new(notifier: Notifier, clock: Arc<dyn Clock>, stale_after: Duration) -> Self {
        Self {
            notifier,
            clock,
            stale_after,
        }
    }

    /// stale なエントリを削除して返す（登録順）
    pub async fn execute(&self, state: &mut RelayState) -> Vec<PresenceEntry> {
        let now = Timestamp::new(self.clock.now_millis());
        let reaped = state.registry.reap_stale(now, self.stale_after);

        for entry in &reaped {
            // まだ接続が残っていれば解放してソケットを閉じる
            if let Some(connection) = entry.connection {
                self.notifier.release(&connection).await;
            }
            tracing::info!(user_id = %entry.identity.user_id, "reaped stale participant");
            announce_departure(&self.notifier, state, entry, now).await;
        }

        reaped
    }
}
