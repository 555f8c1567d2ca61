//! Subscription persistence.
//!
//! Subscriptions are keyed by their push endpoint URL. The dispatcher and the
//! HTTP routes only see the [`SubscriptionStore`] trait; PostgreSQL backs it in
//! production and [`MemorySubscriptionStore`] serves tests and database-less runs.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use beacon_common::error::AppError;
use beacon_common::types::Subscription;

pub use memory::MemorySubscriptionStore;
pub use postgres::PgSubscriptionStore;

/// Storage operations consumed by the notifier and the API.
///
/// Implementations must tolerate concurrent calls; deletes are idempotent.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Persist a subscription. An existing row with the same endpoint has its
    /// keys replaced, so an endpoint never maps to two subscriptions.
    async fn create(
        &self,
        endpoint: &str,
        p256dh: &str,
        auth: &str,
    ) -> Result<Subscription, AppError>;

    /// All subscriptions, newest first.
    async fn find_all(&self) -> Result<Vec<Subscription>, AppError>;

    async fn find_by_endpoint(&self, endpoint: &str) -> Result<Option<Subscription>, AppError>;

    /// Remove a subscription. Returns `true` if a row was removed; a missing
    /// endpoint is not an error.
    async fn delete_by_endpoint(&self, endpoint: &str) -> Result<bool, AppError>;

    /// Remove every subscription, returning how many were removed.
    async fn delete_all(&self) -> Result<u64, AppError>;
}

/// Reject subscriptions the push relay could never address.
pub(crate) fn validate_new(endpoint: &str, p256dh: &str, auth: &str) -> Result<(), AppError> {
    if endpoint.trim().is_empty() {
        return Err(AppError::Validation("endpoint is required".to_string()));
    }
    if !endpoint.starts_with("https://") && !endpoint.starts_with("http://") {
        return Err(AppError::Validation(format!(
            "endpoint must be an http(s) URL, got '{}'",
            endpoint
        )));
    }
    if p256dh.trim().is_empty() || auth.trim().is_empty() {
        return Err(AppError::Validation(
            "subscription keys p256dh and auth are required".to_string(),
        ));
    }
    Ok(())
}
