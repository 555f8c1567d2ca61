use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string. When absent the in-memory store is used.
    pub database_url: Option<String>,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,

    /// HTTP listen port (default: 3000)
    pub api_port: u16,

    /// Base URL of the push relay that encrypts and signs Web Push messages
    pub push_relay_url: String,

    /// Bearer token presented to the push relay
    pub push_relay_token: Option<String>,

    /// VAPID subject (`mailto:` or `https:` contact of the sender)
    pub vapid_subject: String,

    /// VAPID public key handed to browsers as `applicationServerKey`
    pub vapid_public_key: String,

    /// Delivery attempts per subscriber (default: 3)
    pub push_max_attempts: u32,

    /// Title used for messages sent through the admin action
    pub notification_title: String,

    /// Optional icon hint attached to every notification
    pub notification_icon: Option<String>,

    /// Optional image hint attached to every notification
    pub notification_image: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let push_max_attempts: u32 = std::env::var("PUSH_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "3".to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("PUSH_MAX_ATTEMPTS must be a valid u32"))?;
        if push_max_attempts == 0 {
            anyhow::bail!("PUSH_MAX_ATTEMPTS must be at least 1");
        }

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").ok(),
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid u32"))?,
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("API_PORT must be a valid u16"))?,
            push_relay_url: std::env::var("PUSH_RELAY_URL")
                .map_err(|_| anyhow::anyhow!("PUSH_RELAY_URL environment variable is required"))?,
            push_relay_token: std::env::var("PUSH_RELAY_TOKEN").ok(),
            vapid_subject: std::env::var("VAPID_SUBJECT")
                .unwrap_or_else(|_| "mailto:admin@localhost".to_string()),
            vapid_public_key: std::env::var("VAPID_PUBLIC_KEY").map_err(|_| {
                anyhow::anyhow!("VAPID_PUBLIC_KEY environment variable is required")
            })?,
            push_max_attempts,
            notification_title: std::env::var("NOTIFICATION_TITLE")
                .unwrap_or_else(|_| "Push Notification".to_string()),
            notification_icon: std::env::var("NOTIFICATION_ICON").ok(),
            notification_image: std::env::var("NOTIFICATION_IMAGE").ok(),
        })
    }
}
