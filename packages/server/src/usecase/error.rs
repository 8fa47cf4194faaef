//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::ValueObjectError;

/// セッションに返すエラー
///
/// `Display` の文言がそのまま `error {message}` として送信元に返されます。
/// どのエラーもセッションを終了させません。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// デコードできないフレーム
    #[error("malformed event: {0}")]
    Malformed(String),

    /// 空や長すぎるなど、値として不正な入力
    #[error(transparent)]
    InvalidInput(#[from] ValueObjectError),

    /// join 前のメッセージ送信
    #[error("join the chat before sending messages")]
    NotJoined,

    /// join 済みのセッションから別の userId での join
    #[error("this session has already joined as '{0}'")]
    IdentityMismatch(String),

    /// 同じ identity のより新しい join に置き換えられた接続
    #[error("connection superseded by a newer join for this identity")]
    Superseded,

    /// Coordinator が停止している（シャットダウン中）
    #[error("relay is unavailable")]
    Unavailable,
}

/// Coordinator とのやり取りの失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    #[error("coordinator is not running")]
    Closed,

    #[error("coordinator dropped the reply")]
    ReplyDropped,
}

impl From<CoordinatorError> for RelayError {
    fn from(_: CoordinatorError) -> Self {
        RelayError::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_message_is_forwarded() {
        // テスト項目: 値オブジェクトのエラー文言がそのままセッションに返される
        // given (前提条件):
        let error = RelayError::from(ValueObjectError::MessageTooLong {
            max: 500,
            actual: 501,
        });

        // when (操作):
        let message = error.to_string();

        // then (期待する結果):
        assert_eq!(message, "message is too long (501 characters, maximum is 500)");
    }

    #[test]
    fn test_coordinator_error_maps_to_unavailable() {
        // テスト項目: Coordinator の停止は Unavailable として扱われる
        // given (前提条件):
        let error = CoordinatorError::Closed;

        // when (操作):
        let relay_error = RelayError::from(error);

        // then (期待する結果):
        assert_eq!(relay_error, RelayError::Unavailable);
    }
}
