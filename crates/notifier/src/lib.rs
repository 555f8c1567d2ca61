//! Web Push notification dispatch.
//!
//! Delivers one payload to every stored subscription through a [`PushTransport`]:
//! - Per-subscriber retry with exponential backoff
//! - Delivery profiles chosen from the endpoint's push service
//! - Pruning of subscriptions the push service reports as gone
//! - Single-shot validation probes

pub mod dispatcher;
pub mod error;
pub mod profile;
pub mod retry;
pub mod service;
pub mod transport;

pub use dispatcher::{DeliveryFailure, DispatchResult, Dispatcher, Validity};
pub use error::{DeliveryError, DispatchError, FailureClassification};
pub use profile::DeliveryProfile;
pub use retry::{DeliveryOutcome, TerminalFailure, TerminalReason, deliver_with_retry};
pub use service::{NotificationDefaults, NotificationService, SendOutcome};
pub use transport::{DeliveryOptions, PushCredentials, PushTransport, RelayTransport, Urgency};
