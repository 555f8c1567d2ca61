//! Notification sending.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use beacon_notifier::SendOutcome;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/notifications/send", post(send_notification))
}

#[derive(Debug, Deserialize)]
pub struct SendNotificationRequest {
    pub message: String,
}

/// POST /api/notifications/send — Push `message` to every subscriber.
///
/// Always answers 200; failure is reported in the body.
async fn send_notification(
    State(state): State<AppState>,
    Json(request): Json<SendNotificationRequest>,
) -> Json<SendOutcome> {
    Json(state.notifier.send_notification(&request.message).await)
}
