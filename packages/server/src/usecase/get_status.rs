//! UseCase: ステータス取得

use std::sync::Arc;

use parlor_shared::time::Clock;

use crate::domain::Timestamp;

use super::state::RelayState;

/// relay の状態のスナップショット
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayStatus {
    pub timestamp: Timestamp,
    pub online_user_count: usize,
    pub message_count: usize,
}

pub struct GetStatusUseCase {
    clock: Arc<dyn Clock>,
}

impl GetStatusUseCase {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn execute(&self, state: &RelayState) -> RelayStatus {
        RelayStatus {
            timestamp: Timestamp::new(self.clock.now_millis()),
            online_user_count: state.registry.online_count(),
            message_count: state.log.len(),
        }
    }
}
