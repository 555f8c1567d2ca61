//! Shared application state for the Axum API server.

use std::sync::Arc;

use beacon_common::config::AppConfig;
use beacon_notifier::NotificationService;
use beacon_store::SubscriptionStore;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SubscriptionStore>,
    pub notifier: NotificationService,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        notifier: NotificationService,
        config: AppConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }
}
