//! PostgreSQL-backed subscription store.

use async_trait::async_trait;
use sqlx::PgPool;

use beacon_common::error::AppError;
use beacon_common::types::Subscription;

use crate::{SubscriptionStore, validate_new};

/// Subscription store over the `push_subscriptions` table.
#[derive(Clone)]
pub struct PgSubscriptionStore {
    pool: PgPool,
}

impl PgSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    async fn create(
        &self,
        endpoint: &str,
        p256dh: &str,
        auth: &str,
    ) -> Result<Subscription, AppError> {
        validate_new(endpoint, p256dh, auth)?;

        let sub: Subscription = sqlx::query_as(
            r#"
            INSERT INTO push_subscriptions (endpoint, p256dh, auth)
            VALUES ($1, $2, $3)
            ON CONFLICT (endpoint) DO UPDATE
            SET p256dh = EXCLUDED.p256dh, auth = EXCLUDED.auth
            RETURNING endpoint, p256dh, auth, created_at
            "#,
        )
        .bind(endpoint)
        .bind(p256dh)
        .bind(auth)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(endpoint = %sub.log_label(), "Subscription stored");

        Ok(sub)
    }

    async fn find_all(&self) -> Result<Vec<Subscription>, AppError> {
        let subs: Vec<Subscription> = sqlx::query_as(
            "SELECT endpoint, p256dh, auth, created_at FROM push_subscriptions ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(subs)
    }

    async fn find_by_endpoint(&self, endpoint: &str) -> Result<Option<Subscription>, AppError> {
        let sub: Option<Subscription> = sqlx::query_as(
            "SELECT endpoint, p256dh, auth, created_at FROM push_subscriptions WHERE endpoint = $1",
        )
        .bind(endpoint)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sub)
    }

    async fn delete_by_endpoint(&self, endpoint: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM push_subscriptions WHERE endpoint = $1")
            .bind(endpoint)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!("Subscription deleted");
        }

        Ok(deleted)
    }

    async fn delete_all(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM push_subscriptions")
            .execute(&self.pool)
            .await?;

        tracing::warn!(removed = result.rows_affected(), "All subscriptions cleared");

        Ok(result.rows_affected())
    }
}
