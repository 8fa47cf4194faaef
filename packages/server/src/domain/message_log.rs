//! Message Log
//!
//! 直近のチャットメッセージを保持する、上限付きの追記専用バッファです。
//! 挿入順 = 時系列順 = 配信順。上限を超えると最も古いメッセージから FIFO で捨てます。

use std::collections::VecDeque;

use super::entity::{Message, MessageDraft};
use super::value_object::MessageId;

/// 保持するメッセージ数の上限（デフォルト）
pub const DEFAULT_HISTORY_CAP: usize = 100;

/// join 時に送る backfill の件数（デフォルト）
pub const DEFAULT_BACKFILL: usize = 20;

#[derive(Debug)]
pub struct MessageLog {
    messages: VecDeque<Message>,
    cap: usize,
    next_sequence: u64,
}

impl MessageLog {
    /// 上限 `cap` の Message Log を作成（0 は 1 として扱う）
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            messages: VecDeque::with_capacity(cap),
            cap,
            next_sequence: 0,
        }
    }

    /// メッセージを追加し、ID 採番済みのメッセージを返す
    ///
    /// 容量超過で失敗することはありません。
    pub fn append(&mut self, draft: MessageDraft) -> Message {
        self.next_sequence += 1;
        let id = draft
            .id
            .unwrap_or_else(|| MessageId::generate(self.next_sequence));

        let message = Message {
            id,
            author: draft.author,
            text: draft.text,
            kind: draft.kind,
            created_at: draft.created_at,
        };

        self.messages.push_back(message.clone());
        while self.messages.len() > self.cap {
            if let Some(evicted) = self.messages.pop_front() {
                tracing::trace!(id = evicted.id.as_str(), "evicted oldest message");
            }
        }

        message
    }

    /// 直近 `n` 件を時系列順で返す
    pub fn tail(&self, n: usize) -> Vec<Message> {
        let skip = self.messages.len().saturating_sub(n);
        self.messages.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        entity::Identity,
        value_object::{MessageText, Timestamp, UserId, Username},
    };

    fn draft(text: &str, at: i64) -> MessageDraft {
        MessageDraft::user(
            Identity::new(
                UserId::new("u1".to_string()).unwrap(),
                Username::new("Alice".to_string()).unwrap(),
            ),
            MessageText::new(text.to_string(), 500).unwrap(),
            Timestamp::new(at),
        )
    }

    fn texts(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.text.as_str()).collect()
    }

    #[test]
    fn test_tail_on_empty_log() {
        // テスト項目: 空のログの tail は空
        // given (前提条件):
        let log = MessageLog::default();

        // when (操作):
        let result = log.tail(20);

        // then (期待する結果):
        assert!(result.is_empty());
    }

    #[test]
    fn test_cap_evicts_oldest_first() {
        // テスト項目: 上限 3 で m1..m4 を追加すると tail(3) は [m2, m3, m4]
        // given (前提条件):
        let mut log = MessageLog::new(3);

        // when (操作):
        for (i, text) in ["m1", "m2", "m3", "m4"].iter().enumerate() {
            log.append(draft(text, i as i64));
        }

        // then (期待する結果):
        assert_eq!(texts(&log.tail(3)), vec!["m2", "m3", "m4"]);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_tail_after_many_appends_is_most_recent_cap() {
        // テスト項目: 上限を大きく超えて追加しても tail(cap) は直近 cap 件を時系列順で返す
        // given (前提条件):
        let cap = 5;
        let mut log = MessageLog::new(cap);

        // when (操作):
        for i in 0..23 {
            log.append(draft(&format!("m{}", i), i));
        }

        // then (期待する結果):
        assert_eq!(
            texts(&log.tail(cap)),
            vec!["m18", "m19", "m20", "m21", "m22"]
        );
    }

    #[test]
    fn test_tail_shorter_than_requested() {
        // テスト項目: ログが n 件未満なら全件を返す
        // given (前提条件):
        let mut log = MessageLog::new(10);
        log.append(draft("only", 1));

        // when (操作):
        let result = log.tail(20);

        // then (期待する結果):
        assert_eq!(texts(&result), vec!["only"]);
    }

    #[test]
    fn test_eviction_does_not_renumber_survivors() {
        // テスト項目: 追い出しで残ったメッセージの ID は変わらない
        // given (前提条件):
        let mut log = MessageLog::new(2);
        log.append(draft("m1", 1));
        let m2 = log.append(draft("m2", 2));
        let m3 = log.append(draft("m3", 3));

        // when (操作):
        log.append(draft("m4", 4));
        let tail = log.tail(2);

        // then (期待する結果):
        assert_eq!(tail[0].id, m3.id);
        assert_ne!(tail[0].id, m2.id);
    }

    #[test]
    fn test_append_keeps_existing_id() {
        // テスト項目: すでに ID を持つメッセージはその ID のまま追加される
        // given (前提条件):
        let mut log = MessageLog::new(10);
        let mut with_id = draft("hello", 1);
        with_id.id = Some(MessageId::from_existing("client-42".to_string()));

        // when (操作):
        let appended = log.append(with_id);

        // then (期待する結果):
        assert_eq!(appended.id.as_str(), "client-42");
    }

    #[test]
    fn test_assigned_ids_are_unique() {
        // テスト項目: 採番される ID はすべて異なる
        // given (前提条件):
        let mut log = MessageLog::new(100);

        // when (操作):
        let ids: Vec<MessageId> = (0..50).map(|i| log.append(draft("x", i)).id).collect();

        // then (期待する結果):
        let unique: std::collections::HashSet<&MessageId> = ids.iter().collect();
        assert_eq!(unique.len(), 50);
    }
}
