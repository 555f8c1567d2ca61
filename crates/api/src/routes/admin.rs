//! Administrative routes.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;

use beacon_common::error::AppError;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/clear", post(clear_subscriptions))
}

/// POST /api/clear — Delete every stored subscription.
async fn clear_subscriptions(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let removed = state.store.delete_all().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to clear subscriptions");
        AppError::Internal("Failed to clear data".to_string())
    })?;

    Ok(Json(json!({ "success": true, "removed": removed })))
}
