pub mod admin;
pub mod health;
pub mod notifications;
pub mod subscriptions;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(subscriptions::router())
        .merge(notifications::router())
        .merge(admin::router())
        .with_state(state)
}
