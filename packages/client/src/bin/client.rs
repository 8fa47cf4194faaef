//! Terminal chat client for the Parlor relay.
//!
//! Joins the relay as `--username`, sends every stdin line as a chat message and
//! keeps the presence entry fresh with periodic heartbeats. A lost connection is
//! retried up to 5 times with a 2 second interval under the same `--user-id`.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin parlor-client -- --username Alice
//! cargo run --bin parlor-client -- --user-id u-bob --username Bob --url ws://127.0.0.1:8080/ws
//! ```

use clap::Parser;
use uuid::Uuid;

use parlor_client::{ClientOptions, run_client};
use parlor_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "parlor-client")]
#[command(about = "Terminal chat client for the Parlor presence and message relay", long_about = None)]
struct Args {
    /// Display name shown to other participants
    #[arg(short = 'n', long)]
    username: String,

    /// Stable identity; reuse it to resume a session (random if omitted)
    #[arg(short = 'i', long)]
    user_id: Option<String>,

    /// WebSocket relay URL
    #[arg(short = 'u', long, env = "PARLOR_URL", default_value = "ws://127.0.0.1:8080/ws")]
    url: String,
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let options = ClientOptions {
        url: args.url,
        user_id: args.user_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        username: args.username,
    };

    if let Err(e) = run_client(options).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
