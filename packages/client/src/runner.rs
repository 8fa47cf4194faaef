//! Client execution logic with reconnection support.

use std::time::Duration;

use super::{
    domain::{should_attempt_reconnect, should_exit_immediately},
    error::ClientError,
    session::run_client_session,
    ui::spawn_input_reader,
};

const MAX_RECONNECT_ATTEMPTS: u32 = 5;
const RECONNECT_INTERVAL: Duration = Duration::from_secs(2);

/// Who to connect as, and where
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub url: String,
    pub user_id: String,
    pub username: String,
}

/// Run the chat client, reconnecting with the same identity after a lost connection.
///
/// Reusing the identity lets the relay absorb a quick reconnect within its grace
/// window, so other participants do not see a leave and re-join.
pub async fn run_client(options: ClientOptions) -> Result<(), ClientError> {
    let mut input_rx = spawn_input_reader(&options.username);
    let mut failed_attempts = 0;

    loop {
        tracing::info!(
            "Connecting to {} as '{}' ({})",
            options.url,
            options.username,
            options.user_id
        );

        let error = match run_client_session(&options, &mut input_rx).await {
            Ok(()) => {
                tracing::info!("Client session ended normally");
                return Ok(());
            }
            Err(e) => e,
        };

        if should_exit_immediately(&error) {
            tracing::error!("{}", error);
            return Err(error);
        }

        failed_attempts += 1;
        tracing::warn!("Connection lost: {}", error);

        if !should_attempt_reconnect(&error, failed_attempts, MAX_RECONNECT_ATTEMPTS) {
            tracing::error!(
                "Failed to reconnect after {} attempts. Exiting.",
                MAX_RECONNECT_ATTEMPTS
            );
            return Err(error);
        }

        tracing::info!(
            "Reconnecting in {} seconds... (attempt {}/{})",
            RECONNECT_INTERVAL.as_secs(),
            failed_attempts,
            MAX_RECONNECT_ATTEMPTS
        );
        tokio::time::sleep(RECONNECT_INTERVAL).await;
    }
}
