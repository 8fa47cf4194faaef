//! Coordinator が排他的に所有する relay の状態

use crate::domain::{ConnectionId, Identity, MessageLog, PresenceRegistry, UserId};

use super::error::RelayError;

/// Presence Registry と Message Log の組
///
/// Coordinator のタスクだけがこの値を所有し、各ユースケースには
/// `&mut RelayState` として渡されます。
#[derive(Debug, Default)]
pub struct RelayState {
    pub registry: PresenceRegistry,
    pub log: MessageLog,
}

impl RelayState {
    pub fn new(history_cap: usize) -> Self {
        Self {
            registry: PresenceRegistry::new(),
            log: MessageLog::new(history_cap),
        }
    }

    /// `connection` が `user_id` にバインドされていればその identity を返す
    pub fn bound_identity(
        &self,
        user_id: &UserId,
        connection: ConnectionId,
    ) -> Result<Identity, RelayError> {
        match self.registry.get(user_id) {
            None => Err(RelayError::NotJoined),
            Some(entry) if entry.connection == Some(connection) => Ok(entry.identity.clone()),
            Some(_) => Err(RelayError::Superseded),
        }
    }
}
