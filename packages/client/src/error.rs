//! Error types for the chat client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection could not be established or was lost
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The relay ended this session, e.g. because the identity joined elsewhere
    #[error("Session ended by the relay: {0}")]
    SessionRejected(String),
}
