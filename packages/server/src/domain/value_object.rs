//! 値オブジェクト
//!
//! 生成時にバリデーションを行い、不正な値を持つインスタンスが存在しないことを保証します。

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use super::error::ValueObjectError;

/// メッセージ本文の最大文字数（デフォルト）
pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 500;

/// クライアントが名乗る識別子（認証はしない）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UserId(pub(super) String);

impl UserId {
    /// 前後の空白を除去し、空でなければ UserId を作成
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValueObjectError::EmptyUserId);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 表示名
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Username(pub(super) String);

impl Username {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValueObjectError::EmptyUsername);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Username {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// チャットメッセージ本文
///
/// ユーザーが送信する本文は trim 後に空でなく、`max_chars` 文字以下である必要があります。
/// 文字数は Unicode scalar value 単位で数えます。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageText(String);

impl MessageText {
    /// ユーザー入力から MessageText を作成
    pub fn new(value: String, max_chars: usize) -> Result<Self, ValueObjectError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValueObjectError::EmptyMessage);
        }
        let actual = trimmed.chars().count();
        if actual > max_chars {
            return Err(ValueObjectError::MessageTooLong {
                max: max_chars,
                actual,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// サーバーが生成するシステムメッセージ用（文字数制限なし）
    pub(crate) fn system(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Message Log が採番するメッセージ ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MessageId(String);

impl MessageId {
    /// 単調増加のカウンタとランダムなサフィックスから ID を生成
    pub fn generate(sequence: u64) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("{:08x}-{}", sequence, &suffix[..8]))
    }

    /// クライアントや上位層がすでに ID を持っている場合に使用
    pub fn from_existing(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// トランスポート接続 1 本を表すハンドル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unix タイムスタンプ（UTC, ミリ秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// `earlier` からの経過ミリ秒（負にはならない）
    pub fn millis_since(&self, earlier: Timestamp) -> i64 {
        (self.0 - earlier.0).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_is_trimmed() {
        // テスト項目: UserId は前後の空白が除去される
        // given (前提条件):
        let raw = "  u1 ".to_string();

        // when (操作):
        let result = UserId::new(raw);

        // then (期待する結果):
        assert_eq!(result.unwrap().as_str(), "u1");
    }

    #[test]
    fn test_empty_identity_fields_are_rejected() {
        // テスト項目: 空（空白のみ）の userId / username はエラーになる
        // given (前提条件):
        let blank = "   ".to_string();

        // when (操作):
        let user_id = UserId::new(blank.clone());
        let username = Username::new(blank);

        // then (期待する結果):
        assert_eq!(user_id, Err(ValueObjectError::EmptyUserId));
        assert_eq!(username, Err(ValueObjectError::EmptyUsername));
    }

    #[test]
    fn test_message_text_at_limit_is_accepted() {
        // テスト項目: ちょうど上限文字数のメッセージは受け付けられる
        // given (前提条件):
        let text = "a".repeat(DEFAULT_MAX_MESSAGE_CHARS);

        // when (操作):
        let result = MessageText::new(text, DEFAULT_MAX_MESSAGE_CHARS);

        // then (期待する結果):
        assert!(result.is_ok());
    }

    #[test]
    fn test_message_text_over_limit_is_rejected() {
        // テスト項目: 501 文字のメッセージは MessageTooLong で拒否される
        // given (前提条件):
        let text = "a".repeat(DEFAULT_MAX_MESSAGE_CHARS + 1);

        // when (操作):
        let result = MessageText::new(text, DEFAULT_MAX_MESSAGE_CHARS);

        // then (期待する結果):
        assert_eq!(
            result,
            Err(ValueObjectError::MessageTooLong {
                max: 500,
                actual: 501
            })
        );
    }

    #[test]
    fn test_message_text_counts_characters_not_bytes() {
        // テスト項目: マルチバイト文字はバイト数ではなく文字数で数えられる
        // given (前提条件):
        let text = "あ".repeat(DEFAULT_MAX_MESSAGE_CHARS);

        // when (操作):
        let result = MessageText::new(text, DEFAULT_MAX_MESSAGE_CHARS);

        // then (期待する結果):
        assert!(result.is_ok());
    }

    #[test]
    fn test_whitespace_only_message_is_rejected() {
        // テスト項目: 空白のみのメッセージは EmptyMessage で拒否される
        // given (前提条件):
        let text = " \n\t ".to_string();

        // when (操作):
        let result = MessageText::new(text, DEFAULT_MAX_MESSAGE_CHARS);

        // then (期待する結果):
        assert_eq!(result, Err(ValueObjectError::EmptyMessage));
    }

    #[test]
    fn test_message_ids_are_unique() {
        // テスト項目: 同じシーケンス番号でもサフィックスにより ID が衝突しない
        // given (前提条件):
        let sequence = 7;

        // when (操作):
        let first = MessageId::generate(sequence);
        let second = MessageId::generate(sequence);

        // then (期待する結果):
        assert_ne!(first, second);
        assert!(first.as_str().starts_with("00000007-"));
    }

    #[test]
    fn test_timestamp_millis_since_never_negative() {
        // テスト項目: millis_since は逆順でも 0 を返す
        // given (前提条件):
        let earlier = Timestamp::new(1_000);
        let later = Timestamp::new(4_000);

        // when (操作):
        let forward = later.millis_since(earlier);
        let backward = earlier.millis_since(later);

        // then (期待する結果):
        assert_eq!(forward, 3_000);
        assert_eq!(backward, 0);
    }
}
