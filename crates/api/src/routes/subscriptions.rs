//! Subscription routes used by the browser client.

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use beacon_common::error::AppError;
use beacon_common::types::PushSubscriptionJson;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/vapid-public-key", get(vapid_public_key))
        .route(
            "/api/subscriptions",
            post(create_subscription).delete(delete_subscription),
        )
        .route("/api/subscription/check", get(check_subscription))
        .route("/api/subscription/validate", post(validate_subscription))
}

#[derive(Debug, Deserialize)]
pub struct EndpointBody {
    pub endpoint: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    pub endpoint: Option<String>,
}

/// GET /api/vapid-public-key — Key the browser passes as `applicationServerKey`.
async fn vapid_public_key(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "publicKey": state.config.vapid_public_key }))
}

/// POST /api/subscriptions — Persist the browser's `PushSubscription`.
async fn create_subscription(
    State(state): State<AppState>,
    Json(subscription): Json<PushSubscriptionJson>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .store
        .create(
            &subscription.endpoint,
            &subscription.keys.p256dh,
            &subscription.keys.auth,
        )
        .await?;

    Ok(Json(json!({ "success": true })))
}

/// DELETE /api/subscriptions — Remove a subscription. Unknown endpoints succeed.
async fn delete_subscription(
    State(state): State<AppState>,
    Json(body): Json<EndpointBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    if body.endpoint.trim().is_empty() {
        return Err(AppError::Validation("endpoint is required".to_string()));
    }

    state.store.delete_by_endpoint(&body.endpoint).await?;
    Ok(Json(json!({ "success": true })))
}

/// GET /api/subscription/check?endpoint= — Whether the endpoint is stored.
async fn check_subscription(
    State(state): State<AppState>,
    Query(query): Query<CheckQuery>,
) -> Json<serde_json::Value> {
    let Some(endpoint) = query.endpoint.filter(|e| !e.is_empty()) else {
        return Json(json!({ "exists": false }));
    };

    let exists = match state.store.find_by_endpoint(&endpoint).await {
        Ok(found) => found.is_some(),
        Err(e) => {
            tracing::error!(error = %e, "Error checking subscription");
            false
        }
    };

    Json(json!({ "exists": exists }))
}

/// POST /api/subscription/validate — Probe the stored subscription with a
/// zero-TTL message; gone subscriptions are deleted.
async fn validate_subscription(
    State(state): State<AppState>,
    Json(body): Json<EndpointBody>,
) -> Json<serde_json::Value> {
    let valid = state.notifier.validate_endpoint(&body.endpoint).await;
    Json(json!({ "valid": valid }))
}
