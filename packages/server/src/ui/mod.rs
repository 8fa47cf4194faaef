//! UI 層（axum のルーター、WebSocket セッション、HTTP エンドポイント）

mod handler;
mod server;
pub mod session;
mod signal;
pub mod state;

pub use server::Server;
