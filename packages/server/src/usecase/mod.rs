//! UseCase 層
//!
//! 各ユースケースは Coordinator が所有する [`RelayState`] を引数で受け取り、
//! Registry / Message Log の更新と、それに伴う送信を行います。

mod connect_participant;
mod coordinator;
mod disconnect_participant;
mod error;
mod get_status;
mod heartbeat;
mod join_participant;
mod notifier;
mod reap_stale;
mod send_message;
mod state;

#[cfg(test)]
mod test_support;

pub use connect_participant::ConnectParticipantUseCase;
pub use coordinator::{Coordinator, CoordinatorHandle};
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use error::{CoordinatorError, RelayError};
pub use get_status::{GetStatusUseCase, RelayStatus};
pub use heartbeat::HeartbeatUseCase;
pub use join_participant::JoinParticipantUseCase;
pub use notifier::Notifier;
pub use reap_stale::ReapStaleUseCase;
pub use send_message::SendMessageUseCase;
pub use state::RelayState;
