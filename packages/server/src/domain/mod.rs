//! ドメイン層
//!
//! 値オブジェクト、エンティティ、Presence Registry、Message Log、
//! および外部への通知に使う port（`MessagePusher`）を定義します。

pub mod entity;
pub mod error;
pub mod event;
pub mod message_log;
pub mod presence;
pub mod pusher;
pub mod value_object;

pub use entity::{Identity, Message, MessageDraft, MessageKind, PresenceEntry, PresenceSnapshot};
pub use error::{MessagePushError, ValueObjectError};
pub use event::RelayEvent;
pub use message_log::{DEFAULT_BACKFILL, DEFAULT_HISTORY_CAP, MessageLog};
pub use presence::{GraceTicket, PresenceRegistry, RegisterOutcome, Registration};
pub use pusher::{MessagePusher, PusherChannel};
pub use value_object::{
    ConnectionId, DEFAULT_MAX_MESSAGE_CHARS, MessageId, MessageText, Timestamp, UserId, Username,
};

#[cfg(test)]
pub use pusher::MockMessagePusher;
