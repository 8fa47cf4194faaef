//! Relay が参加者に送るイベント
//!
//! ドメイン層の表現です。ワイヤ形式（JSON）への変換は
//! `infrastructure::dto` が担当します。

use super::entity::{Message, PresenceSnapshot};
use super::value_object::{Timestamp, Username};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// join 直後に本人へ送る挨拶と現在の参加者一覧
    Welcome {
        message: String,
        users: Vec<PresenceSnapshot>,
    },
    /// join 直後に本人へ送る直近のメッセージ（backfill）
    History { messages: Vec<Message> },
    /// 新規参加者の通知（再接続時は送らない）
    UserJoined {
        username: Username,
        message: String,
        timestamp: Timestamp,
        users: Vec<PresenceSnapshot>,
    },
    /// 猶予期間が切れた参加者の通知
    UserLeft {
        username: Username,
        message: String,
        timestamp: Timestamp,
    },
    UserList { users: Vec<PresenceSnapshot> },
    NewMessage(Message),
    /// 送信元セッションにだけ返すエラー
    Error { message: String },
}

impl RelayEvent {
    pub fn error(message: impl Into<String>) -> Self {
        RelayEvent::Error {
            message: message.into(),
        }
    }

    /// ログ出力用のイベント名
    pub fn name(&self) -> &'static str {
        match self {
            RelayEvent::Welcome { .. } => "welcome",
            RelayEvent::History { .. } => "history",
            RelayEvent::UserJoined { .. } => "userJoined",
            RelayEvent::UserLeft { .. } => "userLeft",
            RelayEvent::UserList { .. } => "userList",
            RelayEvent::NewMessage(_) => "newMessage",
            RelayEvent::Error { .. } => "error",
        }
    }
}
