use std::sync::Arc;

use anyhow::{Context, Result};
use courier_config::{AppConfig, DeliveryConfig};
use courier_database::{initialize_database, SqliteStore};
use courier_messenger::SubscriptionRegistry;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::TRACE)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

/// Long-lived pieces shared by every transport: the pool, the store over it,
/// the subscription registry and the root token all stream sessions hang off.
#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub store: Arc<SqliteStore>,
    pub registry: Arc<SubscriptionRegistry>,
    pub shutdown: CancellationToken,
    pub delivery: DeliveryConfig,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        config
            .delivery
            .validate()
            .context("invalid delivery configuration")?;

        let db_pool = initialize_database(&config.database)
            .await
            .context("failed to initialise database")?;

        let store = Arc::new(SqliteStore::new(db_pool.clone()));
        let registry = Arc::new(SubscriptionRegistry::new(config.delivery.overflow_policy));

        info!(
            overflow_policy = ?config.delivery.overflow_policy,
            subscriber_buffer = config.delivery.subscriber_buffer,
            "delivery core ready"
        );

        Ok(Self {
            db_pool,
            store,
            registry,
            shutdown: CancellationToken::new(),
            delivery: config.delivery.clone(),
        })
    }

    /// End every live stream session. Persisted data is untouched.
    pub fn close_streams(&self) {
        if !self.shutdown.is_cancelled() {
            info!(
                conversations = self.registry.conversation_count(),
                "closing stream sessions"
            );
            self.shutdown.cancel();
        }
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
