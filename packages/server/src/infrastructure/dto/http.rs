//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

/// Response body of `GET /api/status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDto {
    pub status: String,
    /// RFC 3339 (UTC)
    pub timestamp: String,
    pub online_user_count: usize,
    pub message_count: usize,
}
