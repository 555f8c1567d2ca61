use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored browser push subscription, keyed by its endpoint URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subscription {
    pub endpoint: String,
    /// Client P-256 ECDH public key (base64url)
    pub p256dh: String,
    /// Client auth secret (base64url)
    pub auth: String,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    pub fn new(
        endpoint: impl Into<String>,
        p256dh: impl Into<String>,
        auth: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            p256dh: p256dh.into(),
            auth: auth.into(),
            created_at: Utc::now(),
        }
    }

    /// Endpoint trimmed to scheme, host and the start of the path.
    ///
    /// The full path is a bearer capability for the subscriber, so logs only
    /// carry this prefix.
    pub fn log_label(&self) -> String {
        const KEEP: usize = 48;
        match self.endpoint.char_indices().nth(KEEP) {
            Some((idx, _)) => format!("{}…", &self.endpoint[..idx]),
            None => self.endpoint.clone(),
        }
    }
}

/// Key material of a browser `PushSubscription`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// `PushSubscription.toJSON()` as posted by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscriptionJson {
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<i64>,
    pub keys: PushSubscriptionKeys,
}

impl From<&Subscription> for PushSubscriptionJson {
    fn from(sub: &Subscription) -> Self {
        Self {
            endpoint: sub.endpoint.clone(),
            expiration_time: None,
            keys: PushSubscriptionKeys {
                p256dh: sub.p256dh.clone(),
                auth: sub.auth.clone(),
            },
        }
    }
}

/// Notification content delivered to the service worker.
///
/// Field names follow the service worker's `showNotification` options so the
/// JSON can be passed through without remapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    /// Application badge count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<u32>,
}

impl NotificationPayload {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            icon: None,
            image: None,
            sound: None,
            badge: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_sound(mut self, sound: impl Into<String>) -> Self {
        self.sound = Some(sound.into());
        self
    }

    pub fn with_badge(mut self, badge: u32) -> Self {
        self.badge = Some(badge);
        self
    }
}

/// Marker message the service worker drops without showing anything.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ValidationProbe {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl ValidationProbe {
    pub const KIND: &'static str = "validation";

    pub fn new() -> Self {
        Self { kind: Self::KIND }
    }
}

impl Default for ValidationProbe {
    fn default() -> Self {
        Self::new()
    }
}
