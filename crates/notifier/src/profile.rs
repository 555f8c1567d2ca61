//! Delivery profiles: per push service delivery parameters.
//!
//! Apple's web push service rejects aggressive retries and expects APNs hints
//! on every request, so endpoints hosted there get the `Restrictive` profile.
//! Every other push service (FCM, Mozilla autopush, WNS) gets `Standard`.

use std::fmt;
use std::time::Duration;

use reqwest::Url;

use crate::transport::{DeliveryOptions, Urgency};

/// Host suffix of Apple's web push service (`web.push.apple.com`).
const RESTRICTIVE_HOST_SUFFIX: &str = "push.apple.com";

/// Messages are held by the push service for up to a day.
const DEFAULT_TTL_SECONDS: u32 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryProfile {
    Standard,
    Restrictive,
}

impl DeliveryProfile {
    /// Pick the profile for a subscription endpoint from its host.
    /// Endpoints that fail to parse fall back to `Standard`.
    pub fn classify(endpoint: &str) -> Self {
        let Ok(url) = Url::parse(endpoint) else {
            return DeliveryProfile::Standard;
        };

        match url.host_str() {
            Some(host)
                if host == RESTRICTIVE_HOST_SUFFIX
                    || host.ends_with(&format!(".{}", RESTRICTIVE_HOST_SUFFIX)) =>
            {
                DeliveryProfile::Restrictive
            }
            _ => DeliveryProfile::Standard,
        }
    }

    fn base_delay_ms(self) -> u64 {
        match self {
            DeliveryProfile::Standard => 1_000,
            DeliveryProfile::Restrictive => 5_000,
        }
    }

    fn max_delay_ms(self) -> u64 {
        match self {
            DeliveryProfile::Standard => 10_000,
            DeliveryProfile::Restrictive => 30_000,
        }
    }

    /// Delay before the retry with 0-based index `retry_index`:
    /// `min(base * 2^retry_index, cap)`.
    pub fn backoff(self, retry_index: u32) -> Duration {
        let delay_ms = self
            .base_delay_ms()
            .saturating_mul(2u64.saturating_pow(retry_index))
            .min(self.max_delay_ms());
        Duration::from_millis(delay_ms)
    }

    /// Upper bound on a single send.
    pub fn timeout(self) -> Duration {
        match self {
            DeliveryProfile::Standard => Duration::from_secs(30),
            DeliveryProfile::Restrictive => Duration::from_secs(60),
        }
    }

    pub fn urgency(self) -> Urgency {
        match self {
            DeliveryProfile::Standard => Urgency::Normal,
            DeliveryProfile::Restrictive => Urgency::High,
        }
    }

    /// Extra headers the push service requires on top of the Web Push ones.
    pub fn extra_headers(self) -> &'static [(&'static str, &'static str)] {
        match self {
            DeliveryProfile::Standard => &[],
            DeliveryProfile::Restrictive => {
                &[("apns-push-type", "alert"), ("apns-priority", "10")]
            }
        }
    }

    /// Options for a regular notification send.
    pub fn delivery_options(self) -> DeliveryOptions {
        DeliveryOptions {
            timeout: self.timeout(),
            ttl_seconds: DEFAULT_TTL_SECONDS,
            urgency: self.urgency(),
            headers: self
                .extra_headers()
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        }
    }

    /// Options for a validation probe: dropped by the push service unless the
    /// subscriber is reachable right now.
    pub fn probe_options(self) -> DeliveryOptions {
        DeliveryOptions {
            ttl_seconds: 0,
            ..self.delivery_options()
        }
    }
}

impl fmt::Display for DeliveryProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryProfile::Standard => write!(f, "standard"),
            DeliveryProfile::Restrictive => write!(f, "restrictive"),
        }
    }
}
