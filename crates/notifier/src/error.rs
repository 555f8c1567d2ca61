use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Call-level failures of a dispatch. Per-subscriber failures are never
/// reported through this type.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("No recipients to dispatch to")]
    NoRecipients,

    #[error("Failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// How the dispatcher reacts to a failed send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClassification {
    /// Network error, timeout, or a status that may succeed later
    Retryable,
    /// The push service no longer knows this subscriber
    Gone,
}

impl fmt::Display for FailureClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureClassification::Retryable => write!(f, "retryable"),
            FailureClassification::Gone => write!(f, "gone"),
        }
    }
}

/// A single failed send reported by a [`PushTransport`](crate::PushTransport).
#[derive(Debug, Clone, Error)]
#[error("{classification} delivery failure: {message}")]
pub struct DeliveryError {
    pub classification: FailureClassification,
    pub status_code: Option<u16>,
    pub endpoint: String,
    pub message: String,
}

impl DeliveryError {
    /// Classify an HTTP status from the push service. 404 and 410 mean the
    /// subscription expired or was unsubscribed.
    pub fn from_status(endpoint: &str, status: u16, message: impl Into<String>) -> Self {
        let classification = match status {
            404 | 410 => FailureClassification::Gone,
            _ => FailureClassification::Retryable,
        };
        Self {
            classification,
            status_code: Some(status),
            endpoint: endpoint.to_string(),
            message: message.into(),
        }
    }

    pub fn retryable(endpoint: &str, message: impl Into<String>) -> Self {
        Self {
            classification: FailureClassification::Retryable,
            status_code: None,
            endpoint: endpoint.to_string(),
            message: message.into(),
        }
    }

    pub fn gone(endpoint: &str) -> Self {
        Self::from_status(endpoint, 410, "subscription gone")
    }

    pub fn timeout(endpoint: &str, after: Duration) -> Self {
        Self::retryable(endpoint, format!("timed out after {}ms", after.as_millis()))
    }

    pub fn is_gone(&self) -> bool {
        self.classification == FailureClassification::Gone
    }
}
