//! Shared application state.

use crate::usecase::CoordinatorHandle;

/// Shared application state
pub struct AppState {
    /// Coordinator（Registry / Message Log を所有するタスクへのハンドル）
    pub coordinator: CoordinatorHandle,
    /// メッセージ本文の最大文字数（セッションでの検証に使用）
    pub max_message_chars: usize,
}
