//! Relay Session
//!
//! 1 本の WebSocket 接続の状態機械です。受信したフレームをデコード・検証し、
//! Coordinator に渡すべき操作（[`SessionAction`]）に変換します。
//!
//! ```text
//! CONNECTING --join--> IDENTIFIED --登録完了--> ACTIVE --close--> DISCONNECTED
//!      ^                   |                      |
//!      +---登録失敗--------+                      +--message / heartbeat--> ACTIVE
//! ```
//!
//! 不正な入力はエラーとして送信元にだけ返し、セッションは継続します。

use crate::domain::{ConnectionId, Identity, MessageText, UserId, Username};
use crate::infrastructure::dto::websocket::{ClientMessage, JoinPayload};
use crate::usecase::RelayError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    /// join を受け付け、Registry への登録を待っている
    Identified(Identity),
    Active(UserId),
    Disconnected,
}

/// 受信フレームから導かれる操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    Join(Identity),
    Send { user_id: UserId, text: MessageText },
    Heartbeat(UserId),
    Reject(RelayError),
    Ignore,
}

#[derive(Debug)]
pub struct RelaySession {
    connection: ConnectionId,
    max_message_chars: usize,
    state: SessionState,
}

impl RelaySession {
    pub fn new(connection: ConnectionId, max_message_chars: usize) -> Self {
        Self {
            connection,
            max_message_chars,
            state: SessionState::Connecting,
        }
    }

    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// ACTIVE なら バインドされている userId
    pub fn active_user_id(&self) -> Option<&UserId> {
        match &self.state {
            SessionState::Active(user_id) => Some(user_id),
            _ => None,
        }
    }

    /// テキストフレームを処理する
    pub fn on_text(&mut self, frame: &str) -> SessionAction {
        match serde_json::from_str::<ClientMessage>(frame) {
            Ok(ClientMessage::Join(payload)) => self.on_join(payload),
            Ok(ClientMessage::Message(payload)) => self.on_message(payload.text),
            Ok(ClientMessage::Heartbeat) => match &self.state {
                SessionState::Active(user_id) => SessionAction::Heartbeat(user_id.clone()),
                _ => SessionAction::Ignore,
            },
            Err(e) => SessionAction::Reject(RelayError::Malformed(e.to_string())),
        }
    }

    /// バイナリフレームはサポートしない
    pub fn on_binary(&mut self) -> SessionAction {
        SessionAction::Reject(RelayError::Malformed(
            "binary frames are not supported".to_string(),
        ))
    }

    /// Registry への登録が完了した（IDENTIFIED → ACTIVE）
    pub fn on_joined(&mut self) {
        if let SessionState::Identified(identity) = &self.state {
            self.state = SessionState::Active(identity.user_id.clone());
        }
    }

    /// Registry への登録に失敗した（IDENTIFIED → CONNECTING）
    pub fn on_join_failed(&mut self) {
        if matches!(self.state, SessionState::Identified(_)) {
            self.state = SessionState::Connecting;
        }
    }

    /// 接続が閉じた。バインドされていた userId を返す
    pub fn on_close(&mut self) -> Option<UserId> {
        let state = std::mem::replace(&mut self.state, SessionState::Disconnected);
        match state {
            SessionState::Identified(identity) => Some(identity.user_id),
            SessionState::Active(user_id) => Some(user_id),
            SessionState::Connecting | SessionState::Disconnected => None,
        }
    }

    fn on_join(&mut self, payload: JoinPayload) -> SessionAction {
        let identity = match parse_identity(payload) {
            Ok(identity) => identity,
            Err(e) => return SessionAction::Reject(e),
        };

        match &self.state {
            SessionState::Connecting => {
                self.state = SessionState::Identified(identity.clone());
                SessionAction::Join(identity)
            }
            // 同じ userId での再 join は username の更新として扱う
            SessionState::Active(user_id) if *user_id == identity.user_id => {
                SessionAction::Join(identity)
            }
            SessionState::Active(user_id) => {
                SessionAction::Reject(RelayError::IdentityMismatch(user_id.to_string()))
            }
            SessionState::Identified(_) | SessionState::Disconnected => SessionAction::Ignore,
        }
    }

    fn on_message(&mut self, text: String) -> SessionAction {
        let SessionState::Active(user_id) = &self.state else {
            return SessionAction::Reject(RelayError::NotJoined);
        };
        match MessageText::new(text, self.max_message_chars) {
            Ok(text) => SessionAction::Send {
                user_id: user_id.clone(),
                text,
            },
            Err(e) => SessionAction::Reject(e.into()),
        }
    }
}

fn parse_identity(payload: JoinPayload) -> Result<Identity, RelayError> {
    let user_id = UserId::try_from(payload.user_id)?;
    let username = Username::try_from(payload.username)?;
    Ok(Identity::new(user_id, username))
}
