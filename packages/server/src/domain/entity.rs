//! エンティティ

use super::value_object::{ConnectionId, MessageId, MessageText, Timestamp, UserId, Username};

/// チャット参加者の識別情報（userId と username の組）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub username: Username,
}

impl Identity {
    pub fn new(user_id: UserId, username: Username) -> Self {
        Self { user_id, username }
    }

    /// システムメッセージの送信者
    pub fn system() -> Self {
        Self {
            user_id: UserId("system".to_string()),
            username: Username("System".to_string()),
        }
    }
}

/// Presence Registry が管理する参加者 1 人分の状態
///
/// `connection` が `None` の間は猶予期間（grace period）中で、
/// 同じ userId での再接続を待っています。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceEntry {
    pub identity: Identity,
    pub connection: Option<ConnectionId>,
    pub joined_at: Timestamp,
    pub last_seen_at: Timestamp,
    /// 猶予タイマーの世代番号。再接続や新しい切断で更新される
    pub(crate) grace_seq: Option<u64>,
    /// 登録順（一覧の並び順に使用）
    pub(crate) order: u64,
}

impl PresenceEntry {
    pub fn is_online(&self) -> bool {
        self.connection.is_some()
    }
}

/// UI 向けの参加者一覧の 1 行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceSnapshot {
    pub username: Username,
    pub online: bool,
}

/// メッセージの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    User,
    System,
}

/// Message Log に追加される前のメッセージ
///
/// `id` が `None` の場合は Message Log が採番します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    pub id: Option<MessageId>,
    pub author: Identity,
    pub text: MessageText,
    pub kind: MessageKind,
    pub created_at: Timestamp,
}

impl MessageDraft {
    pub fn user(author: Identity, text: MessageText, created_at: Timestamp) -> Self {
        Self {
            id: None,
            author,
            text,
            kind: MessageKind::User,
            created_at,
        }
    }

    pub fn system(text: String, created_at: Timestamp) -> Self {
        Self {
            id: None,
            author: Identity::system(),
            text: MessageText::system(text),
            kind: MessageKind::System,
            created_at,
        }
    }
}

/// Message Log に追加済みのメッセージ（追加後は不変）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub author: Identity,
    pub text: MessageText,
    pub kind: MessageKind,
    pub created_at: Timestamp,
}
