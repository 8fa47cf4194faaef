//! Server configuration.
//!
//! Every option can be given as a CLI flag or through a `PARLOR_*` environment
//! variable. The parsed [`ServerConfig`] is turned into a [`RelaySettings`]
//! value, which is the only thing the relay core reads.

use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::domain::{DEFAULT_BACKFILL, DEFAULT_HISTORY_CAP, DEFAULT_MAX_MESSAGE_CHARS};

pub const DEFAULT_GRACE: Duration = Duration::from_secs(10);
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(300);
pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(60);

/// Realtime presence and message-relay server
#[derive(Parser, Debug, Clone)]
#[command(name = "parlor-server", version, about = "Realtime presence and message-relay server", long_about = None)]
pub struct ServerConfig {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "PARLOR_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "PARLOR_PORT", default_value = "8080")]
    pub port: u16,

    /// Seconds a disconnected participant is kept before being announced as departed
    #[arg(long, env = "PARLOR_GRACE_SECS", default_value = "10")]
    pub grace_secs: u64,

    /// Seconds without activity after which the reaper removes a participant
    #[arg(long, env = "PARLOR_STALE_SECS", default_value = "300")]
    pub stale_secs: u64,

    /// Seconds between two stale reaper sweeps
    #[arg(long, env = "PARLOR_REAP_INTERVAL_SECS", default_value = "60")]
    pub reap_interval_secs: u64,

    /// Number of messages kept in the history
    #[arg(long, env = "PARLOR_HISTORY_CAP", default_value = "100")]
    pub history_cap: usize,

    /// Number of messages sent to a client right after it joins
    #[arg(long, env = "PARLOR_BACKFILL", default_value = "20")]
    pub backfill: usize,

    /// Maximum number of characters in a chat message
    #[arg(long, env = "PARLOR_MAX_MESSAGE_CHARS", default_value = "500")]
    pub max_message_chars: usize,
}

impl ServerConfig {
    /// Build validated relay settings from the parsed options
    pub fn relay_settings(&self) -> Result<RelaySettings, ConfigError> {
        let settings = RelaySettings {
            grace: Duration::from_secs(self.grace_secs),
            stale_after: Duration::from_secs(self.stale_secs),
            reap_interval: Duration::from_secs(self.reap_interval_secs),
            history_cap: self.history_cap,
            backfill: self.backfill,
            max_message_chars: self.max_message_chars,
        };
        settings.validate()?;
        Ok(settings)
    }
}

/// Tunables of the relay core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySettings {
    pub grace: Duration,
    pub stale_after: Duration,
    pub reap_interval: Duration,
    pub history_cap: usize,
    pub backfill: usize,
    pub max_message_chars: usize,
}

impl RelaySettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_cap == 0 {
            return Err(ConfigError::ZeroValue("history cap"));
        }
        if self.backfill == 0 {
            return Err(ConfigError::ZeroValue("backfill"));
        }
        if self.max_message_chars == 0 {
            return Err(ConfigError::ZeroValue("max message chars"));
        }
        if self.reap_interval.is_zero() {
            return Err(ConfigError::ZeroValue("reap interval"));
        }
        if self.grace >= self.stale_after {
            return Err(ConfigError::GraceNotShorterThanStale {
                grace_secs: self.grace.as_secs(),
                stale_secs: self.stale_after.as_secs(),
            });
        }
        Ok(())
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            grace: DEFAULT_GRACE,
            stale_after: DEFAULT_STALE_AFTER,
            reap_interval: DEFAULT_REAP_INTERVAL,
            history_cap: DEFAULT_HISTORY_CAP,
            backfill: DEFAULT_BACKFILL,
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error(
        "grace period ({grace_secs}s) must be shorter than the staleness window ({stale_secs}s)"
    )]
    GraceNotShorterThanStale { grace_secs: u64, stale_secs: u64 },
}
