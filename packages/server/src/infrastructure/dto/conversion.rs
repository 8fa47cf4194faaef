//! Conversion logic between DTOs and domain entities.

use parlor_shared::time::timestamp_to_rfc3339;

use crate::domain::{Message, MessageKind, PresenceSnapshot, RelayEvent};
use crate::infrastructure::dto::websocket as dto;

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&PresenceSnapshot> for dto::UserInfo {
    fn from(model: &PresenceSnapshot) -> Self {
        Self {
            username: model.username.as_str().to_string(),
            online: model.online,
        }
    }
}

impl From<MessageKind> for dto::MessageKindDto {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::User => dto::MessageKindDto::User,
            MessageKind::System => dto::MessageKindDto::System,
        }
    }
}

impl From<&Message> for dto::ChatMessagePayload {
    fn from(model: &Message) -> Self {
        Self {
            id: model.id.as_str().to_string(),
            user_id: model.author.user_id.as_str().to_string(),
            username: model.author.username.as_str().to_string(),
            text: model.text.as_str().to_string(),
            r#type: model.kind.into(),
            timestamp: timestamp_to_rfc3339(model.created_at.value()),
        }
    }
}

fn users_to_dto(users: &[PresenceSnapshot]) -> Vec<dto::UserInfo> {
    users.iter().map(dto::UserInfo::from).collect()
}

impl From<&RelayEvent> for dto::ServerMessage {
    fn from(event: &RelayEvent) -> Self {
        match event {
            RelayEvent::Welcome { message, users } => {
                dto::ServerMessage::Welcome(dto::WelcomePayload {
                    message: message.clone(),
                    users: users_to_dto(users),
                })
            }
            RelayEvent::History { messages } => dto::ServerMessage::History(dto::HistoryPayload {
                messages: messages.iter().map(dto::ChatMessagePayload::from).collect(),
            }),
            RelayEvent::UserJoined {
                username,
                message,
                timestamp,
                users,
            } => dto::ServerMessage::UserJoined(dto::UserJoinedPayload {
                username: username.as_str().to_string(),
                message: message.clone(),
                timestamp: timestamp_to_rfc3339(timestamp.value()),
                users: users_to_dto(users),
            }),
            RelayEvent::UserLeft {
                username,
                message,
                timestamp,
            } => dto::ServerMessage::UserLeft(dto::UserLeftPayload {
                username: username.as_str().to_string(),
                message: message.clone(),
                timestamp: timestamp_to_rfc3339(timestamp.value()),
            }),
            RelayEvent::UserList { users } => dto::ServerMessage::UserList(dto::UserListPayload {
                users: users_to_dto(users),
            }),
            RelayEvent::NewMessage(message) => {
                dto::ServerMessage::NewMessage(dto::ChatMessagePayload::from(message))
            }
            RelayEvent::Error { message } => dto::ServerMessage::Error(dto::ErrorPayload {
                message: message.clone(),
            }),
        }
    }
}

/// Encode a relay event as a JSON text frame
pub fn encode_event(event: &RelayEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(&dto::ServerMessage::from(event))
}
