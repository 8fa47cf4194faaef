//! Presence Registry
//!
//! userId → PresenceEntry の対応を保持する「誰がオンラインか」の唯一の情報源です。
//!
//! ## 猶予期間（grace period）
//!
//! 切断時にはエントリを即座に削除せず、`begin_grace` で接続ハンドルを外して
//! 世代番号付きの [`GraceTicket`] を発行します。タイマーの満了は
//! `expire_grace` にチケットを渡して処理し、その間に `register` で再接続されていれば
//! 世代番号が一致しないため満了は破棄されます。
//!
//! Registry 自体はタイマーを持たず、同期的な状態遷移だけを提供します。
//! タイマーの起動と満了イベントの直列化は Coordinator が担当します。

use std::collections::HashMap;
use std::time::Duration;

use super::entity::{Identity, PresenceEntry, PresenceSnapshot};
use super::value_object::{ConnectionId, Timestamp, UserId};

/// 猶予タイマー 1 回分のチケット
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraceTicket {
    pub user_id: UserId,
    pub seq: u64,
    pub grace: Duration,
}

/// `register` がどの種類の登録だったか
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// 初めての参加者
    New,
    /// 猶予期間中の再接続
    Reconnected,
    /// 別の接続にバインドされていた identity を新しい接続が置き換えた
    Superseded { previous: ConnectionId },
    /// 同じ接続からの再 join
    Refreshed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterOutcome {
    pub entry: PresenceEntry,
    pub registration: Registration,
}

#[derive(Debug, Default)]
pub struct PresenceRegistry {
    entries: HashMap<UserId, PresenceEntry>,
    next_order: u64,
    next_grace_seq: u64,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// identity を接続にバインドする
    ///
    /// 既存のエントリがあれば接続ハンドルを置き換え、保留中の猶予を取り消します。
    /// username は最後の join で上書きされます。
    pub fn register(
        &mut self,
        identity: Identity,
        connection: ConnectionId,
        now: Timestamp,
    ) -> RegisterOutcome {
        if let Some(entry) = self.entries.get_mut(&identity.user_id) {
            let registration = match (entry.grace_seq, entry.connection) {
                (Some(_), _) | (None, None) => Registration::Reconnected,
                (None, Some(current)) if current == connection => Registration::Refreshed,
                (None, Some(previous)) => Registration::Superseded { previous },
            };
            entry.identity = identity;
            entry.connection = Some(connection);
            entry.grace_seq = None;
            entry.last_seen_at = now;

            return RegisterOutcome {
                entry: entry.clone(),
                registration,
            };
        }

        let entry = PresenceEntry {
            identity: identity.clone(),
            connection: Some(connection),
            joined_at: now,
            last_seen_at: now,
            grace_seq: None,
            order: self.next_order,
        };
        self.next_order += 1;
        self.entries.insert(identity.user_id, entry.clone());

        RegisterOutcome {
            entry,
            registration: Registration::New,
        }
    }

    /// lastSeenAt を更新する。未知の userId なら何もしない
    pub fn touch(&mut self, user_id: &UserId, now: Timestamp) -> bool {
        match self.entries.get_mut(user_id) {
            Some(entry) => {
                entry.last_seen_at = now;
                true
            }
            None => {
                tracing::debug!(user_id = %user_id, "touch ignored for unknown identity");
                false
            }
        }
    }

    /// 切断された接続の identity を猶予状態にする
    ///
    /// エントリがすでに別の接続にバインドされている場合（置き換え済みの古い接続の切断）は
    /// 何もせず `None` を返します。
    pub fn begin_grace(
        &mut self,
        user_id: &UserId,
        connection: ConnectionId,
        grace: Duration,
        now: Timestamp,
    ) -> Option<GraceTicket> {
        let entry = self.entries.get_mut(user_id)?;
        if entry.connection != Some(connection) {
            tracing::debug!(
                user_id = %user_id,
                connection = %connection,
                "disconnect of a superseded connection, keeping entry"
            );
            return None;
        }

        self.next_grace_seq += 1;
        entry.connection = None;
        entry.grace_seq = Some(self.next_grace_seq);
        entry.last_seen_at = now;

        Some(GraceTicket {
            user_id: user_id.clone(),
            seq: self.next_grace_seq,
            grace,
        })
    }

    /// 猶予タイマーの満了を処理する
    ///
    /// チケットの世代が現在の猶予と一致する場合だけエントリを削除して返します。
    /// 一致しない（再接続済み、または新しい切断で更新済み）場合は `None`。
    pub fn expire_grace(&mut self, ticket: &GraceTicket) -> Option<PresenceEntry> {
        let is_current = self
            .entries
            .get(&ticket.user_id)
            .is_some_and(|entry| entry.grace_seq == Some(ticket.seq));
        if !is_current {
            return None;
        }
        self.entries.remove(&ticket.user_id)
    }

    /// lastSeenAt が `stale_after` より古いエントリをすべて削除して返す（登録順）
    pub fn reap_stale(&mut self, now: Timestamp, stale_after: Duration) -> Vec<PresenceEntry> {
        let window = i64::try_from(stale_after.as_millis()).unwrap_or(i64::MAX);
        let stale_ids: Vec<UserId> = self
            .entries
            .iter()
            .filter(|(_, entry)| now.millis_since(entry.last_seen_at) > window)
            .map(|(user_id, _)| user_id.clone())
            .collect();

        let mut reaped: Vec<PresenceEntry> = stale_ids
            .iter()
            .filter_map(|user_id| self.entries.remove(user_id))
            .collect();
        reaped.sort_by_key(|entry| entry.order);
        reaped
    }

    /// 参加者一覧のスナップショット（登録順）
    pub fn list(&self) -> Vec<PresenceSnapshot> {
        self.ordered_entries()
            .into_iter()
            .map(|entry| PresenceSnapshot {
                username: entry.identity.username.clone(),
                online: entry.is_online(),
            })
            .collect()
    }

    /// 現在バインドされている接続（= ACTIVE なセッション）のスナップショット
    pub fn active_connections(&self) -> Vec<ConnectionId> {
        self.ordered_entries()
            .into_iter()
            .filter_map(|entry| entry.connection)
            .collect()
    }

    pub fn get(&self, user_id: &UserId) -> Option<&PresenceEntry> {
        self.entries.get(user_id)
    }

    /// userId が指定の接続にバインドされているか
    pub fn is_bound(&self, user_id: &UserId, connection: ConnectionId) -> bool {
        self.entries
            .get(user_id)
            .is_some_and(|entry| entry.connection == Some(connection))
    }

    pub fn online_count(&self) -> usize {
        self.entries.values().filter(|entry| entry.is_online()).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn ordered_entries(&self) -> Vec<&PresenceEntry> {
        let mut entries: Vec<&PresenceEntry> = self.entries.values().collect();
        entries.sort_by_key(|entry| entry.order);
        entries
    }
}
