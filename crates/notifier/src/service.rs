//! Caller-facing notification operations.
//!
//! Everything here fails closed: callers get a structured answer, never an
//! error, and never the raw transport message.

use std::sync::Arc;

use serde::Serialize;

use beacon_common::types::NotificationPayload;
use beacon_store::SubscriptionStore;

use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;

/// Answer of [`NotificationService::send_notification`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<usize>,
}

impl SendOutcome {
    fn failure(error: &str) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            delivered: None,
            failed: None,
        }
    }
}

/// Notification presentation defaults applied to every message.
#[derive(Debug, Clone)]
pub struct NotificationDefaults {
    pub title: String,
    pub icon: Option<String>,
    pub image: Option<String>,
}

impl Default for NotificationDefaults {
    fn default() -> Self {
        Self {
            title: "Push Notification".to_string(),
            icon: None,
            image: None,
        }
    }
}

#[derive(Clone)]
pub struct NotificationService {
    dispatcher: Dispatcher,
    store: Arc<dyn SubscriptionStore>,
    defaults: NotificationDefaults,
}

impl NotificationService {
    pub fn new(
        dispatcher: Dispatcher,
        store: Arc<dyn SubscriptionStore>,
        defaults: NotificationDefaults,
    ) -> Self {
        Self {
            dispatcher,
            store,
            defaults,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    fn build_payload(&self, message: &str) -> NotificationPayload {
        let mut payload = NotificationPayload::new(self.defaults.title.clone(), message);
        payload.icon = self.defaults.icon.clone();
        payload.image = self.defaults.image.clone();
        payload
    }

    /// Send `message` to every stored subscription.
    ///
    /// Partial delivery still counts as success; the counts tell how many
    /// subscribers were reached.
    pub async fn send_notification(&self, message: &str) -> SendOutcome {
        let subscriptions = match self.store.find_all().await {
            Ok(subs) => subs,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load subscriptions");
                return SendOutcome::failure("Failed to send notification");
            }
        };

        let payload = self.build_payload(message);
        match self.dispatcher.dispatch(&payload, subscriptions).await {
            Ok(result) => SendOutcome {
                success: true,
                error: None,
                delivered: Some(result.success_count),
                failed: Some(result.failures.len()),
            },
            Err(DispatchError::NoRecipients) => {
                tracing::info!("Send requested with no stored subscriptions");
                SendOutcome::failure("No subscriptions available")
            }
            Err(DispatchError::InvalidPayload(reason)) => {
                tracing::debug!(reason = %reason, "Rejected notification payload");
                SendOutcome::failure("Invalid notification message")
            }
            Err(e) => {
                tracing::error!(error = %e, "Send notification failed");
                SendOutcome::failure("Failed to send notification")
            }
        }
    }

    /// Whether the subscription for `endpoint` is stored and still reachable.
    /// Unknown endpoints and store errors are reported as invalid.
    pub async fn validate_endpoint(&self, endpoint: &str) -> bool {
        match self.store.find_by_endpoint(endpoint).await {
            Ok(Some(subscription)) => self.dispatcher.validate(&subscription).await.is_valid(),
            Ok(None) => false,
            Err(e) => {
                tracing::error!(error = %e, "Validation lookup failed");
                false
            }
        }
    }
}
