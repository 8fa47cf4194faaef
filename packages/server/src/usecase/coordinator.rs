//! Broadcast Coordinator
//!
//! Presence Registry と Message Log を変更する処理はすべて、このモジュールの
//! 1 つのタスクを経由して直列に実行されます。
//!
//! ## 設計ノート
//!
//! - 各 WebSocket セッションは [`CoordinatorHandle`] でコマンドを送るだけで、
//!   状態（[`RelayState`]）には直接触れません
//! - 猶予タイマーは別タスクで sleep し、満了を `GraceExpired` コマンドとして
//!   同じチャンネルに送ります。再接続と満了の競合はコマンドの到着順で決まり、
//!   古いチケットは Registry の世代番号チェックで破棄されます
//! - タイマーと reaper は弱参照の送信側しか持たないため、すべてのハンドルが
//!   drop されると Coordinator のループは終了します

use std::{collections::HashMap, sync::Arc, time::Duration};

use parlor_shared::time::Clock;
use tokio::{
    sync::{mpsc, oneshot},
    task::{AbortHandle, JoinHandle},
};

use crate::config::RelaySettings;
use crate::domain::{
    ConnectionId, GraceTicket, Identity, Message, MessagePusher, MessageText, PusherChannel,
    RegisterOutcome, RelayEvent, UserId,
};

use super::{
    connect_participant::ConnectParticipantUseCase,
    disconnect_participant::DisconnectParticipantUseCase,
    error::{CoordinatorError, RelayError},
    get_status::{GetStatusUseCase, RelayStatus},
    heartbeat::HeartbeatUseCase,
    join_participant::JoinParticipantUseCase,
    notifier::Notifier,
    reap_stale::ReapStaleUseCase,
    send_message::SendMessageUseCase,
    state::RelayState,
};

enum Command {
    Connect {
        connection: ConnectionId,
        sender: PusherChannel,
    },
    Join {
        connection: ConnectionId,
        identity: Identity,
        reply: oneshot::Sender<Option<RegisterOutcome>>,
    },
    SendMessage {
        connection: ConnectionId,
        user_id: UserId,
        text: MessageText,
        reply: oneshot::Sender<Result<Message, RelayError>>,
    },
    Heartbeat {
        connection: ConnectionId,
        user_id: UserId,
    },
    Reject {
        connection: ConnectionId,
        user_id: Option<UserId>,
        error: RelayError,
    },
    Disconnect {
        connection: ConnectionId,
        user_id: Option<UserId>,
    },
    GraceExpired(GraceTicket),
    ReapStale {
        reply: Option<oneshot::Sender<usize>>,
    },
    Status {
        reply: oneshot::Sender<RelayStatus>,
    },
}

/// Coordinator へのコマンド送信用ハンドル（clone して各セッションに渡す）
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl CoordinatorHandle {
    /// 接続の送信チャンネルを登録する
    pub fn connect(
        &self,
        connection: ConnectionId,
        sender: PusherChannel,
    ) -> Result<(), CoordinatorError> {
        self.send(Command::Connect { connection, sender })
    }

    /// identity を接続にバインドする。解放済みの接続からの join は `None`
    pub async fn join(
        &self,
        connection: ConnectionId,
        identity: Identity,
    ) -> Result<Option<RegisterOutcome>, CoordinatorError> {
        self.request(|reply| Command::Join {
            connection,
            identity,
            reply,
        })
        .await
    }

    /// メッセージを Message Log に追加し、全 ACTIVE セッションに送信する
    pub async fn send_message(
        &self,
        connection: ConnectionId,
        user_id: UserId,
        text: MessageText,
    ) -> Result<Message, RelayError> {
        self.request(|reply| Command::SendMessage {
            connection,
            user_id,
            text,
            reply,
        })
        .await?
    }

    pub fn heartbeat(
        &self,
        connection: ConnectionId,
        user_id: UserId,
    ) -> Result<(), CoordinatorError> {
        self.send(Command::Heartbeat {
            connection,
            user_id,
        })
    }

    /// 送信元の接続にだけエラーを返す。`user_id` がまだバインドされていれば lastSeenAt も更新する
    pub fn reject(
        &self,
        connection: ConnectionId,
        user_id: Option<UserId>,
        error: RelayError,
    ) -> Result<(), CoordinatorError> {
        self.send(Command::Reject {
            connection,
            user_id,
            error,
        })
    }

    /// 接続が閉じたことを通知する
    pub fn disconnect(
        &self,
        connection: ConnectionId,
        user_id: Option<UserId>,
    ) -> Result<(), CoordinatorError> {
        self.send(Command::Disconnect {
            connection,
            user_id,
        })
    }

    /// stale なエントリを刈り取り、刈り取った件数を返す
    pub async fn reap_stale(&self) -> Result<usize, CoordinatorError> {
        self.request(|reply| Command::ReapStale { reply: Some(reply) })
            .await
    }

    pub async fn status(&self) -> Result<RelayStatus, CoordinatorError> {
        self.request(|reply| Command::Status { reply }).await
    }

    /// `interval` ごとに stale reaper を起動するタスクを生成
    pub fn spawn_reaper(&self, interval: Duration) -> JoinHandle<()> {
        let weak = self.tx.downgrade();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // 最初の tick は即座に完了するので読み捨てる
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(tx) = weak.upgrade() else {
                    break;
                };
                if tx.send(Command::ReapStale { reply: None }).is_err() {
                    break;
                }
            }
            tracing::debug!("stale reaper stopped");
        })
    }

    fn send(&self, command: Command) -> Result<(), CoordinatorError> {
        self.tx.send(command).map_err(|_| CoordinatorError::Closed)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, CoordinatorError> {
        let (reply, rx) = oneshot::channel();
        self.send(command(reply))?;
        rx.await.map_err(|_| CoordinatorError::ReplyDropped)
    }
}

/// 状態を所有し、コマンドを 1 つずつ処理するタスク
pub struct Coordinator {
    state: RelayState,
    notifier: Notifier,
    connect: ConnectParticipantUseCase,
    join: JoinParticipantUseCase,
    send_message: SendMessageUseCase,
    heartbeat: HeartbeatUseCase,
    disconnect: DisconnectParticipantUseCase,
    reap_stale: ReapStaleUseCase,
    get_status: GetStatusUseCase,
    /// 猶予タイマーを起動したときの送信側（弱参照）
    commands: mpsc::WeakUnboundedSender<Command>,
    /// userId ごとの起動中の猶予タイマー（チケットの世代番号と中断用ハンドル）
    grace_timers: HashMap<UserId, (u64, AbortHandle)>,
}

impl Coordinator {
    /// Coordinator のタスクを起動し、ハンドルを返す
    pub fn spawn(
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
        settings: RelaySettings,
    ) -> (CoordinatorHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let notifier = Notifier::new(message_pusher);

        let coordinator = Self {
            state: RelayState::new(settings.history_cap),
            connect: ConnectParticipantUseCase::new(notifier.clone()),
            join: JoinParticipantUseCase::new(notifier.clone(), clock.clone(), settings.backfill),
            send_message: SendMessageUseCase::new(notifier.clone(), clock.clone()),
            heartbeat: HeartbeatUseCase::new(clock.clone()),
            disconnect: DisconnectParticipantUseCase::new(
                notifier.clone(),
                clock.clone(),
                settings.grace,
            ),
            reap_stale: ReapStaleUseCase::new(notifier.clone(), clock.clone(), settings.stale_after),
            get_status: GetStatusUseCase::new(clock),
            notifier,
            commands: tx.downgrade(),
            grace_timers: HashMap::new(),
        };

        let task = tokio::spawn(coordinator.run(rx));
        (CoordinatorHandle { tx }, task)
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        tracing::debug!("coordinator started");
        while let Some(command) = rx.recv().await {
            self.handle(command).await;
        }
        for (_, (_, timer)) in self.grace_timers.drain() {
            timer.abort();
        }
        tracing::debug!("coordinator stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Connect { connection, sender } => {
                self.connect.execute(connection, sender).await;
            }
            Command::Join {
                connection,
                identity,
                reply,
            } => {
                let user_id = identity.user_id.clone();
                let outcome = self.join.execute(&mut self.state, connection, identity).await;
                if outcome.is_some() {
                    self.cancel_grace_timer(&user_id);
                }
                let _ = reply.send(outcome);
            }
            Command::SendMessage {
                connection,
                user_id,
                text,
                reply,
            } => {
                let result = self
                    .send_message
                    .execute(&mut self.state, connection, &user_id, text)
                    .await;
                let _ = reply.send(result);
            }
            Command::Heartbeat {
                connection,
                user_id,
            } => {
                if let Err(e) = self.heartbeat.execute(&mut self.state, connection, &user_id) {
                    tracing::debug!(connection = %connection, "heartbeat ignored: {}", e);
                }
            }
            Command::Reject {
                connection,
                user_id,
                error,
            } => {
                tracing::warn!(connection = %connection, "rejected inbound event: {}", error);
                // 拒否された入力もその identity からのイベントなので lastSeenAt を更新する
                if let Some(user_id) = user_id {
                    let _ = self.heartbeat.execute(&mut self.state, connection, &user_id);
                }
                self.notifier
                    .send_to(&connection, RelayEvent::error(error.to_string()))
                    .await;
            }
            Command::Disconnect {
                connection,
                user_id,
            } => {
                if let Some(ticket) = self
                    .disconnect
                    .execute(&mut self.state, connection, user_id)
                    .await
                {
                    self.start_grace_timer(ticket);
                }
            }
            Command::GraceExpired(ticket) => {
                if self
                    .grace_timers
                    .get(&ticket.user_id)
                    .is_some_and(|(seq, _)| *seq == ticket.seq)
                {
                    self.grace_timers.remove(&ticket.user_id);
                }
                self.disconnect.expire_grace(&mut self.state, &ticket).await;
            }
            Command::ReapStale { reply } => {
                let reaped = self.reap_stale.execute(&mut self.state).await;
                for entry in &reaped {
                    self.cancel_grace_timer(&entry.identity.user_id);
                }
                tracing::debug!(count = reaped.len(), "stale reaper sweep finished");
                if let Some(reply) = reply {
                    let _ = reply.send(reaped.len());
                }
            }
            Command::Status { reply } => {
                let _ = reply.send(self.get_status.execute(&self.state));
            }
        }
    }

    fn start_grace_timer(&mut self, ticket: GraceTicket) {
        let weak = self.commands.clone();
        let user_id = ticket.user_id.clone();
        let seq = ticket.seq;

        let timer = tokio::spawn(async move {
            tokio::time::sleep(ticket.grace).await;
            if let Some(tx) = weak.upgrade() {
                let _ = tx.send(Command::GraceExpired(ticket));
            }
        });

        if let Some((_, previous)) = self
            .grace_timers
            .insert(user_id, (seq, timer.abort_handle()))
        {
            previous.abort();
        }
    }

    fn cancel_grace_timer(&mut self, user_id: &UserId) {
        if let Some((seq, timer)) = self.grace_timers.remove(user_id) {
            timer.abort();
            tracing::debug!(user_id = %user_id, seq, "grace timer cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::message_pusher::WebSocketMessagePusher;
    use crate::usecase::test_support::{TestConnection, identity, user_id_of};
    use parlor_shared::time::{ManualClock, SystemClock};

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - 猶予タイマーと再接続の競合がコマンドの直列化で決まること
    // - stale reaper の刈り取り
    //
    // 【なぜこのテストが必要か】
    // - 猶予期間中の再接続で userLeft が出ないことは relay の中心的な性質
    //
    // 【どうテストするか】
    // - tokio の仮想時間（start_paused）で猶予期間を進める
    // - status() の往復で、それまでのコマンドがすべて処理されたことを保証する
    // ========================================

    fn settings() -> RelaySettings {
        RelaySettings::default()
    }

    fn spawn_coordinator(clock: Arc<dyn Clock>) -> CoordinatorHandle {
        let pusher = Arc::new(WebSocketMessagePusher::new());
        let (handle, _task) = Coordinator::spawn(pusher, clock, settings());
        handle
    }

    fn open(handle: &CoordinatorHandle) -> TestConnection {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection = ConnectionId::generate();
        handle.connect(connection, tx).unwrap();
        TestConnection { connection, rx }
    }

    async fn join(handle: &CoordinatorHandle, user_id: &str, username: &str) -> TestConnection {
        let mut conn = open(handle);
        handle
            .join(conn.connection, identity(user_id, username))
            .await
            .unwrap();
        conn.drain();
        conn
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_within_grace_does_not_announce_leave() {
        // テスト項目: 猶予期間内に同じ userId で再接続すると、他の参加者に userLeft が届かない
        // given (前提条件):
        let handle = spawn_coordinator(Arc::new(SystemClock));
        let mut alice = join(&handle, "u1", "Alice").await;
        let bob = join(&handle, "u2", "Bob").await;
        alice.drain();

        // when (操作): 切断から 3 秒後に再接続し、猶予期間を大きく過ぎるまで待つ
        handle
            .disconnect(bob.connection, Some(user_id_of("u2")))
            .unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        let bob_again = open(&handle);
        let outcome = handle
            .join(bob_again.connection, identity("u2", "Bob"))
            .await
            .unwrap()
            .unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        handle.status().await.unwrap();

        // then (期待する結果):
        assert_eq!(outcome.registration, crate::domain::Registration::Reconnected);
        let names = alice.drain_event_names();
        assert!(!names.contains(&"userLeft".to_string()));
        assert!(!names.contains(&"userJoined".to_string()));
        assert_eq!(handle.status().await.unwrap().online_user_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_after_grace_announces_leave_then_join() {
        // テスト項目: 猶予期間を過ぎてから再接続すると userLeft の後に userJoined が届く
        // given (前提条件):
        let handle = spawn_coordinator(Arc::new(SystemClock));
        let mut alice = join(&handle, "u1", "Alice").await;
        let bob = join(&handle, "u2", "Bob").await;
        alice.drain();

        // when (操作):
        handle
            .disconnect(bob.connection, Some(user_id_of("u2")))
            .unwrap();
        tokio::time::sleep(Duration::from_secs(11)).await;
        let bob_again = open(&handle);
        handle
            .join(bob_again.connection, identity("u2", "Bob"))
            .await
            .unwrap();

        // then (期待する結果):
        let names = alice.drain_event_names();
        let left = names.iter().position(|name| name == "userLeft");
        let joined = names.iter().position(|name| name == "userJoined");
        assert!(left.is_some());
        assert!(joined.is_some());
        assert!(left < joined);
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_expiry_is_announced_once() {
        // テスト項目: 再接続して再び切断した場合、userLeft は最後の猶予満了の 1 回だけ
        // given (前提条件):
        let handle = spawn_coordinator(Arc::new(SystemClock));
        let mut alice = join(&handle, "u1", "Alice").await;
        let bob = join(&handle, "u2", "Bob").await;
        alice.drain();

        // when (操作):
        handle
            .disconnect(bob.connection, Some(user_id_of("u2")))
            .unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        let bob_again = open(&handle);
        handle
            .join(bob_again.connection, identity("u2", "Bob"))
            .await
            .unwrap();
        handle
            .disconnect(bob_again.connection, Some(user_id_of("u2")))
            .unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        handle.status().await.unwrap();

        // then (期待する結果):
        let left = alice
            .drain_event_names()
            .into_iter()
            .filter(|name| name == "userLeft")
            .count();
        assert_eq!(left, 1);
    }

    #[tokio::test]
    async fn test_concurrent_senders_observe_same_order() {
        // テスト項目: 複数のセッションから同時に送ったメッセージが全員に同じ順序で届く
        // given (前提条件):
        let handle = spawn_coordinator(Arc::new(SystemClock));
        let mut alice = join(&handle, "u1", "Alice").await;
        let mut bob = join(&handle, "u2", "Bob").await;
        alice.drain();

        // when (操作):
        let mut tasks = Vec::new();
        for (i, (connection, user)) in [(alice.connection, "u1"), (bob.connection, "u2")]
            .into_iter()
            .cycle()
            .take(20)
            .enumerate()
        {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                let text = MessageText::new(format!("m{}", i), 500).unwrap();
                handle
                    .send_message(connection, user_id_of(user), text)
                    .await
                    .unwrap()
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        // then (期待する結果):
        let ids = |conn: &mut TestConnection| -> Vec<String> {
            conn.drain()
                .iter()
                .map(|frame| frame["data"]["id"].as_str().unwrap().to_string())
                .collect()
        };
        let alice_ids = ids(&mut alice);
        assert_eq!(alice_ids.len(), 20);
        assert_eq!(alice_ids, ids(&mut bob));
    }

    #[tokio::test]
    async fn test_reaper_removes_stale_entries() {
        // テスト項目: staleness window を過ぎた参加者が reaper で刈り取られる
        // given (前提条件):
        let clock = Arc::new(ManualClock::new(0));
        let handle = spawn_coordinator(clock.clone());
        let mut alice = join(&handle, "u1", "Alice").await;
        let _bob = join(&handle, "u2", "Bob").await;
        alice.drain();
        clock.set(200_000);
        handle
            .heartbeat(alice.connection, user_id_of("u1"))
            .unwrap();
        clock.set(300_001);

        // when (操作):
        let reaped = handle.reap_stale().await.unwrap();

        // then (期待する結果):
        assert_eq!(reaped, 1);
        assert_eq!(alice.drain_event_names(), vec!["userLeft", "userList"]);
        assert_eq!(handle.status().await.unwrap().online_user_count, 1);
    }

    #[tokio::test]
    async fn test_reject_reaches_only_origin() {
        // テスト項目: reject したエラーは送信元の接続にだけ届く
        // given (前提条件):
        let handle = spawn_coordinator(Arc::new(SystemClock));
        let mut alice = join(&handle, "u1", "Alice").await;
        let mut bob = join(&handle, "u2", "Bob").await;
        alice.drain();

        // when (操作):
        handle
            .reject(bob.connection, None, RelayError::NotJoined)
            .unwrap();
        handle.status().await.unwrap();

        // then (期待する結果):
        let frames = bob.drain();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["event"], "error");
        assert_eq!(
            frames[0]["data"]["message"],
            "join the chat before sending messages"
        );
        assert!(alice.drain().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_input_refreshes_last_seen() {
        // テスト項目: ACTIVE なセッションの入力が拒否されても lastSeenAt は更新され、reaper に刈り取られない
        // given (前提条件):
        let clock = Arc::new(ManualClock::new(0));
        let handle = spawn_coordinator(clock.clone());
        let mut alice = join(&handle, "u1", "Alice").await;
        clock.set(200_000);
        handle
            .reject(
                alice.connection,
                Some(user_id_of("u1")),
                RelayError::Malformed("not json".to_string()),
            )
            .unwrap();
        clock.set(300_001);

        // when (操作):
        let reaped = handle.reap_stale().await.unwrap();

        // then (期待する結果):
        assert_eq!(reaped, 0);
        assert_eq!(alice.drain_event_names(), vec!["error"]);
        assert_eq!(handle.status().await.unwrap().online_user_count, 1);
    }

    #[tokio::test]
    async fn test_handle_reports_closed_coordinator() {
        // テスト項目: Coordinator のタスクが止まっているとハンドルはエラーを返す
        // given (前提条件):
        let pusher = Arc::new(WebSocketMessagePusher::new());
        let (handle, task) = Coordinator::spawn(pusher, Arc::new(SystemClock), settings());
        task.abort();
        let _ = task.await;

        // when (操作):
        let result = handle.status().await;

        // then (期待する結果):
        assert!(result.is_err());
    }
}
