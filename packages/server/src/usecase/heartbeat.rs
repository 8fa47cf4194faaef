//! UseCase: heartbeat
//!
//! クライアントからの heartbeat で lastSeenAt を更新し、
//! stale reaper に刈り取られないようにします。

use std::sync::Arc;

use parlor_shared::time::Clock;

use crate::domain::{ConnectionId, Timestamp, UserId};

use super::{error::RelayError, state::RelayState};

pub struct HeartbeatUseCase {
    clock: Arc<dyn Clock>,
}

impl HeartbeatUseCase {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn execute(
        &self,
        state: &mut RelayState,
        connection: ConnectionId,
        user_id: &UserId,
    ) -> Result<(), RelayError> {
        state.bound_identity(user_id, connection)?;
        state
            .registry
            .touch(user_id, Timestamp::new(self.clock.now_millis()));
        Ok(())
    }
}
