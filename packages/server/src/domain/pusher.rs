//! MessagePusher trait 定義
//!
//! 参加者へのイベント通知のインターフェース。
//! 具体的な実装（WebSocket）は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::error::MessagePushError;
use super::event::RelayEvent;
use super::value_object::ConnectionId;

/// 接続ごとの送信チャンネル（エンコード済みのフレームを流す）
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// 接続へのイベント送信
///
/// 送信は接続ごとのチャンネルへの enqueue で完了し、実際の書き込みは
/// 各接続の送信タスクが行います。そのため呼び出し側をブロックしません。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続の送信チャンネルを登録
    async fn register_client(&self, connection: ConnectionId, sender: PusherChannel);

    /// 接続の送信チャンネルを登録解除（チャンネルが閉じ、送信タスクが終了する）
    async fn unregister_client(&self, connection: &ConnectionId);

    /// 接続の送信チャンネルがまだ登録されているか
    async fn is_registered(&self, connection: &ConnectionId) -> bool;

    /// 特定の接続にイベントを送信
    async fn push_to(
        &self,
        connection: &ConnectionId,
        event: &RelayEvent,
    ) -> Result<(), MessagePushError>;

    /// 複数の接続にイベントを送信（一部の失敗は許容）
    async fn broadcast(
        &self,
        targets: Vec<ConnectionId>,
        event: &RelayEvent,
    ) -> Result<(), MessagePushError>;
}
