//! Realtime presence and message-relay server.
//!
//! Tracks who is connected, relays chat messages to every connected session
//! in one total order and absorbs short reconnects through a grace period.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin parlor-server
//! cargo run --bin parlor-server -- --host 0.0.0.0 --port 3000 --grace-secs 5
//! PARLOR_PORT=3000 cargo run --bin parlor-server
//! ```

use std::sync::Arc;

use clap::Parser;
use parlor_server::{
    config::ServerConfig, infrastructure::message_pusher::WebSocketMessagePusher, ui::Server,
    usecase::Coordinator,
};
use parlor_shared::{logger::setup_logger, time::SystemClock};

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let config = ServerConfig::parse();
    let settings = match config.relay_settings() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    tracing::debug!(?settings, "relay settings");

    // Initialize dependencies in order:
    // 1. MessagePusher
    // 2. Coordinator (owns Presence Registry and Message Log)
    // 3. Stale reaper
    // 4. Server

    // 1. Create MessagePusher (WebSocket implementation)
    let message_pusher = Arc::new(WebSocketMessagePusher::new());

    // 2. Spawn the coordinator task
    let (coordinator, coordinator_task) =
        Coordinator::spawn(message_pusher, Arc::new(SystemClock), settings.clone());

    // 3. Spawn the stale reaper
    let reaper_task = coordinator.spawn_reaper(settings.reap_interval);

    // 4. Create and run the server
    let server = Server::new(coordinator, settings.max_message_chars);
    let result = server.run(config.host, config.port).await;

    reaper_task.abort();
    coordinator_task.abort();

    if let Err(e) = result {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
