//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};

use crate::{infrastructure::dto::http::StatusDto, ui::state::AppState};
use parlor_shared::time::timestamp_to_rfc3339;

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Snapshot of the relay state
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusDto>, StatusCode> {
    match state.coordinator.status().await {
        Ok(status) => {
            // Domain Model から DTO への変換
            Ok(Json(StatusDto {
                status: "ok".to_string(),
                timestamp: timestamp_to_rfc3339(status.timestamp.value()),
                online_user_count: status.online_user_count,
                message_count: status.message_count,
            }))
        }
        Err(e) => {
            tracing::warn!("Failed to get relay status: {}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
