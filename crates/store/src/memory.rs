//! In-process subscription store.
//!
//! Used by tests and by the API when no `DATABASE_URL` is configured. Contents
//! are lost on restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use beacon_common::error::AppError;
use beacon_common::types::Subscription;

use crate::{SubscriptionStore, validate_new};

#[derive(Default)]
pub struct MemorySubscriptionStore {
    subscriptions: RwLock<HashMap<String, Subscription>>,
}

impl MemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.subscriptions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.subscriptions.read().await.is_empty()
    }
}

#[async_trait]
impl SubscriptionStore for MemorySubscriptionStore {
    async fn create(
        &self,
        endpoint: &str,
        p256dh: &str,
        auth: &str,
    ) -> Result<Subscription, AppError> {
        validate_new(endpoint, p256dh, auth)?;

        let mut subs = self.subscriptions.write().await;
        let created_at = subs
            .get(endpoint)
            .map(|existing| existing.created_at)
            .unwrap_or_else(Utc::now);
        let sub = Subscription {
            endpoint: endpoint.to_string(),
            p256dh: p256dh.to_string(),
            auth: auth.to_string(),
            created_at,
        };
        subs.insert(endpoint.to_string(), sub.clone());

        tracing::info!(endpoint = %sub.log_label(), "Subscription stored");

        Ok(sub)
    }

    async fn find_all(&self) -> Result<Vec<Subscription>, AppError> {
        let mut subs: Vec<Subscription> =
            self.subscriptions.read().await.values().cloned().collect();
        subs.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.endpoint.cmp(&b.endpoint))
        });
        Ok(subs)
    }

    async fn find_by_endpoint(&self, endpoint: &str) -> Result<Option<Subscription>, AppError> {
        Ok(self.subscriptions.read().await.get(endpoint).cloned())
    }

    async fn delete_by_endpoint(&self, endpoint: &str) -> Result<bool, AppError> {
        let deleted = self.subscriptions.write().await.remove(endpoint).is_some();
        if deleted {
            tracing::info!("Subscription deleted");
        }
        Ok(deleted)
    }

    async fn delete_all(&self) -> Result<u64, AppError> {
        let mut subs = self.subscriptions.write().await;
        let removed = subs.len() as u64;
        subs.clear();

        tracing::warn!(removed, "All subscriptions cleared");

        Ok(removed)
    }
}
