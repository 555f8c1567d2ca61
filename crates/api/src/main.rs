//! Beacon API server binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use beacon_common::config::AppConfig;
use beacon_common::db::{create_pool, run_migrations};
use beacon_notifier::{
    Dispatcher, NotificationDefaults, NotificationService, PushCredentials, RelayTransport,
};
use beacon_store::{MemorySubscriptionStore, PgSubscriptionStore, SubscriptionStore};

use beacon_api::routes::create_router;
use beacon_api::state::AppState;

/// Browser `PushSubscription` JSON is well under this.
const MAX_BODY_BYTES: usize = 16 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "beacon_api=debug,beacon_notifier=debug,beacon_store=info,tower_http=debug",
            )
        }))
        .init();

    tracing::info!("Starting Beacon API server...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Subscription store
    let store: Arc<dyn SubscriptionStore> = match &config.database_url {
        Some(database_url) => {
            let pool = create_pool(database_url, config.db_max_connections).await?;
            run_migrations(&pool).await?;
            tracing::info!("Database pool created");
            Arc::new(PgSubscriptionStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, subscriptions are kept in memory only");
            Arc::new(MemorySubscriptionStore::new())
        }
    };

    // Sender identity, shared by every delivery for the life of the process
    let credentials = Arc::new(PushCredentials {
        vapid_subject: config.vapid_subject.clone(),
        vapid_public_key: config.vapid_public_key.clone(),
        relay_token: config.push_relay_token.clone(),
    });
    let transport = Arc::new(RelayTransport::new(&config.push_relay_url, credentials)?);
    tracing::info!(relay = %config.push_relay_url, "Push relay transport configured");

    let dispatcher =
        Dispatcher::new(transport, store.clone()).with_max_attempts(config.push_max_attempts);
    let notifier = NotificationService::new(
        dispatcher,
        store.clone(),
        NotificationDefaults {
            title: config.notification_title.clone(),
            icon: config.notification_icon.clone(),
            image: config.notification_image.clone(),
        },
    );

    // Build application state
    let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));
    let state = AppState::new(store, notifier, config);

    // Build router
    let app = create_router(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
