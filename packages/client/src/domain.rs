//! Reconnect decisions.
//!
//! Pure functions without side effects so that the reconnect policy can be
//! tested without a relay.

use crate::error::ClientError;

/// Check if the client should exit immediately based on the error type.
///
/// A session ended by the relay means the same identity is in use by a newer
/// connection. Reconnecting would only take the identity back and start a tug of war.
pub fn should_exit_immediately(error: &ClientError) -> bool {
    matches!(error, ClientError::SessionRejected(_))
}

/// Check if the client should attempt to reconnect.
///
/// # Arguments
///
/// * `error` - The client error that occurred
/// * `failed_attempts` - The number of failed sessions so far
/// * `max_attempts` - The maximum number of reconnection attempts allowed
pub fn should_attempt_reconnect(
    error: &ClientError,
    failed_attempts: u32,
    max_attempts: u32,
) -> bool {
    if should_exit_immediately(error) {
        return false;
    }

    failed_attempts <= max_attempts
}
