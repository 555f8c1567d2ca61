//! Notification dispatcher: fan-out of one payload to many subscribers.
//!
//! Every subscriber gets its own task running [`deliver_with_retry`]; the
//! dispatcher keeps the task handles in an arena indexed like the input and joins
//! them all before reporting. Subscriptions that come back `Gone` are deleted from
//! the store afterwards.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use beacon_common::types::{NotificationPayload, Subscription, ValidationProbe};
use beacon_store::SubscriptionStore;

use crate::error::{DeliveryError, DispatchError};
use crate::profile::DeliveryProfile;
use crate::retry::{
    DeliveryOutcome, TerminalFailure, TerminalReason, deliver_with_retry, send_once,
};
use crate::transport::PushTransport;

/// Default number of attempts per subscriber.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// A subscriber that could not be reached.
#[derive(Debug, Clone)]
pub struct DeliveryFailure {
    pub endpoint: String,
    pub reason: TerminalReason,
    pub attempts: u32,
    pub error: DeliveryError,
}

/// Aggregate outcome of one dispatch.
#[derive(Debug, Clone, Default)]
pub struct DispatchResult {
    pub success_count: usize,
    /// Unreachable subscribers, in request order
    pub failures: Vec<DeliveryFailure>,
}

impl DispatchResult {
    pub fn total(&self) -> usize {
        self.success_count + self.failures.len()
    }

    /// Endpoints whose subscription was reported gone.
    pub fn gone_endpoints(&self) -> impl Iterator<Item = &str> {
        self.failures
            .iter()
            .filter(|f| f.reason == TerminalReason::Gone)
            .map(|f| f.endpoint.as_str())
    }
}

/// Result of a validation probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Invalid,
}

impl Validity {
    pub fn is_valid(self) -> bool {
        self == Validity::Valid
    }
}

/// Sends payloads through a [`PushTransport`] and prunes gone subscriptions
/// from a [`SubscriptionStore`].
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn PushTransport>,
    store: Arc<dyn SubscriptionStore>,
    max_attempts: u32,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn PushTransport>, store: Arc<dyn SubscriptionStore>) -> Self {
        Self {
            transport,
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Deliver `payload` to every subscription.
    ///
    /// Fails only on input validation. Per-subscriber failures are reported in
    /// the returned [`DispatchResult`].
    pub async fn dispatch(
        &self,
        payload: &NotificationPayload,
        subscriptions: Vec<Subscription>,
    ) -> Result<DispatchResult, DispatchError> {
        validate_payload(payload)?;
        if subscriptions.is_empty() {
            return Err(DispatchError::NoRecipients);
        }

        let serialized: Arc<str> = serde_json::to_string(payload)?.into();
        let dispatch_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "dispatch",
            %dispatch_id,
            recipients = subscriptions.len()
        );

        async move {
            tracing::info!("Dispatching notification");

            let tasks: Vec<(String, JoinHandle<DeliveryOutcome>)> = subscriptions
                .into_iter()
                .map(|subscription| {
                    let endpoint = subscription.endpoint.clone();
                    let transport = Arc::clone(&self.transport);
                    let payload = Arc::clone(&serialized);
                    let max_attempts = self.max_attempts;
                    let handle = tokio::spawn(
                        async move {
                            deliver_with_retry(
                                transport.as_ref(),
                                &subscription,
                                &payload,
                                max_attempts,
                            )
                            .await
                        }
                        .in_current_span(),
                    );
                    (endpoint, handle)
                })
                .collect();

            let mut result = DispatchResult::default();
            for (endpoint, handle) in tasks {
                let outcome = handle.await.unwrap_or_else(|e| {
                    tracing::error!(error = %e, "Delivery task did not complete");
                    DeliveryOutcome::Failed(TerminalFailure {
                        reason: TerminalReason::Aborted,
                        attempts: 0,
                        error: DeliveryError::retryable(
                            &endpoint,
                            format!("task failed: {}", e),
                        ),
                    })
                });

                match outcome {
                    DeliveryOutcome::Delivered { .. } => result.success_count += 1,
                    DeliveryOutcome::Failed(failure) => result.failures.push(DeliveryFailure {
                        endpoint,
                        reason: failure.reason,
                        attempts: failure.attempts,
                        error: failure.error,
                    }),
                }
            }

            self.prune_gone(&result).await;

            tracing::info!(
                delivered = result.success_count,
                failed = result.failures.len(),
                "Dispatch complete"
            );

            Ok(result)
        }
        .instrument(span)
        .await
    }

    /// Probe a subscription with a single zero-TTL validation message.
    ///
    /// A gone subscription is deleted; any other failure leaves it in place.
    pub async fn validate(&self, subscription: &Subscription) -> Validity {
        let profile = DeliveryProfile::classify(&subscription.endpoint);
        let options = profile.probe_options();
        let payload = match serde_json::to_string(&ValidationProbe::new()) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize validation probe");
                return Validity::Invalid;
            }
        };

        match send_once(self.transport.as_ref(), subscription, &payload, &options).await {
            Ok(()) => Validity::Valid,
            Err(e) if e.is_gone() => {
                tracing::info!(
                    endpoint = %subscription.log_label(),
                    "Validation probe: subscription gone"
                );
                self.delete_quietly(&subscription.endpoint).await;
                Validity::Invalid
            }
            Err(e) => {
                tracing::debug!(
                    endpoint = %subscription.log_label(),
                    error = %e,
                    "Validation probe failed"
                );
                Validity::Invalid
            }
        }
    }

    async fn prune_gone(&self, result: &DispatchResult) {
        let mut seen = HashSet::new();
        for endpoint in result.gone_endpoints() {
            if seen.insert(endpoint) {
                self.delete_quietly(endpoint).await;
            }
        }
        if !seen.is_empty() {
            tracing::info!(pruned = seen.len(), "Pruned gone subscriptions");
        }
    }

    /// Best-effort delete: failures are logged and swallowed.
    async fn delete_quietly(&self, endpoint: &str) {
        if let Err(e) = self.store.delete_by_endpoint(endpoint).await {
            tracing::warn!(error = %e, "Failed to delete gone subscription");
        }
    }
}

fn validate_payload(payload: &NotificationPayload) -> Result<(), DispatchError> {
    if payload.title.trim().is_empty() {
        return Err(DispatchError::InvalidPayload("title is required".to_string()));
    }
    if payload.body.trim().is_empty() {
        return Err(DispatchError::InvalidPayload("body is required".to_string()));
    }
    Ok(())
}
