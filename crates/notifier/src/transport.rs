//! Push transport: the seam between the dispatcher and the push services.
//!
//! Encryption (RFC 8291) and VAPID signing (RFC 8292) happen in an external push
//! relay. [`RelayTransport`] hands it the subscription, the serialized payload and
//! the delivery options, and maps the push service's answer to a
//! [`DeliveryError`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;

use beacon_common::types::{PushSubscriptionJson, Subscription};

use crate::error::DeliveryError;

/// RFC 8030 `Urgency` header values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Urgency {
    VeryLow,
    Low,
    Normal,
    High,
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Urgency::VeryLow => write!(f, "very-low"),
            Urgency::Low => write!(f, "low"),
            Urgency::Normal => write!(f, "normal"),
            Urgency::High => write!(f, "high"),
        }
    }
}

/// Per-send delivery parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOptions {
    /// Upper bound on the whole send
    pub timeout: Duration,
    /// How long the push service may hold the message
    pub ttl_seconds: u32,
    pub urgency: Urgency,
    /// Extra push-service specific headers
    pub headers: BTreeMap<String, String>,
}

/// Sends one already-serialized payload to one subscriber.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(
        &self,
        subscription: &Subscription,
        payload: &str,
        options: &DeliveryOptions,
    ) -> Result<(), DeliveryError>;
}

/// Sender identity presented to push services. Built once at startup.
#[derive(Debug, Clone)]
pub struct PushCredentials {
    /// `mailto:` or `https:` contact
    pub vapid_subject: String,
    pub vapid_public_key: String,
    /// Bearer token for the relay
    pub relay_token: Option<String>,
}

/// Transport that forwards sends to an HTTP push relay.
///
/// Relay contract: `POST {base}/send`, answering 2xx when the push service
/// accepted the message, otherwise the push service's status code.
#[derive(Clone)]
pub struct RelayTransport {
    client: reqwest::Client,
    send_url: String,
    credentials: Arc<PushCredentials>,
}

impl RelayTransport {
    pub fn new(
        relay_url: &str,
        credentials: Arc<PushCredentials>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("beacon-notifier/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            send_url: format!("{}/send", relay_url.trim_end_matches('/')),
            credentials,
        })
    }

    fn request_body(
        &self,
        subscription: &Subscription,
        payload: &str,
        options: &DeliveryOptions,
    ) -> serde_json::Value {
        json!({
            "subscription": PushSubscriptionJson::from(subscription),
            "payload": payload,
            "options": {
                "ttl": options.ttl_seconds,
                "urgency": options.urgency,
                "headers": options.headers,
                "vapid": {
                    "subject": self.credentials.vapid_subject,
                    "publicKey": self.credentials.vapid_public_key,
                },
            },
        })
    }
}

#[async_trait]
impl PushTransport for RelayTransport {
    async fn send(
        &self,
        subscription: &Subscription,
        payload: &str,
        options: &DeliveryOptions,
    ) -> Result<(), DeliveryError> {
        let mut request = self
            .client
            .post(&self.send_url)
            .timeout(options.timeout)
            .json(&self.request_body(subscription, payload, options));

        if let Some(token) = &self.credentials.relay_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DeliveryError::timeout(&subscription.endpoint, options.timeout)
            } else {
                DeliveryError::retryable(
                    &subscription.endpoint,
                    format!("relay unreachable: {}", e),
                )
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let detail = response.text().await.unwrap_or_default();
        let message = match detail.trim() {
            "" => status.to_string(),
            text => format!("{}: {}", status, text.chars().take(200).collect::<String>()),
        };

        Err(DeliveryError::from_status(
            &subscription.endpoint,
            status.as_u16(),
            message,
        ))
    }
}
