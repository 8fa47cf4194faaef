//! ユースケースのテスト用ヘルパー

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::domain::{ConnectionId, Identity, MessagePusher, UserId, Username};
use crate::infrastructure::message_pusher::WebSocketMessagePusher;

/// テスト用の接続（送信チャンネルの受信側を保持）
pub struct TestConnection {
    pub connection: ConnectionId,
    pub rx: mpsc::UnboundedReceiver<String>,
}

impl TestConnection {
    /// 受信済みのフレームをすべて取り出して JSON として返す
    pub fn drain(&mut self) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.rx.try_recv() {
            frames.push(serde_json::from_str(&frame).unwrap());
        }
        frames
    }

    /// 受信済みのフレームのイベント名
    pub fn drain_event_names(&mut self) -> Vec<String> {
        self.drain()
            .iter()
            .map(|frame| frame["event"].as_str().unwrap().to_string())
            .collect()
    }
}

pub fn create_test_message_pusher() -> Arc<WebSocketMessagePusher> {
    Arc::new(WebSocketMessagePusher::new())
}

/// 新しい接続を MessagePusher に登録する
pub async fn open_connection(pusher: &WebSocketMessagePusher) -> TestConnection {
    let (tx, rx) = mpsc::unbounded_channel();
    let connection = ConnectionId::generate();
    pusher.register_client(connection, tx).await;
    TestConnection { connection, rx }
}

pub fn identity(user_id: &str, username: &str) -> Identity {
    Identity::new(user_id_of(user_id), Username::new(username.to_string()).unwrap())
}

pub fn user_id_of(value: &str) -> UserId {
    UserId::new(value.to_string()).unwrap()
}
