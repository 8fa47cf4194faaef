//! MessagePusher の実装

mod websocket;

pub use websocket::WebSocketMessagePusher;
