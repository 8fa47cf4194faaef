//! ドメイン層のエラー定義

use thiserror::Error;

/// 値オブジェクトの生成時に発生するエラー
///
/// `Display` の文言はそのまま `error` イベントとしてクライアントに返されます。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("userId must not be empty")]
    EmptyUserId,

    #[error("username must not be empty")]
    EmptyUsername,

    #[error("message must not be empty")]
    EmptyMessage,

    #[error("message is too long ({actual} characters, maximum is {max})")]
    MessageTooLong { max: usize, actual: usize },
}

/// MessagePusher がメッセージを届けられなかったときのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("connection '{0}' is not registered")]
    ClientNotFound(String),

    #[error("failed to push message: {0}")]
    PushFailed(String),

    #[error("failed to encode event: {0}")]
    EncodeFailed(String),
}
