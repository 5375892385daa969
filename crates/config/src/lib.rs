use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "courier.toml",
    "config/courier.toml",
    "crates/config/courier.toml",
    "../courier.toml",
    "../config/courier.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 7070,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://courier.db".to_string(),
            max_connections: 10,
        }
    }
}

/// What the subscription registry does when a subscriber's queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Remove the subscriber and cancel its stream.
    #[default]
    Disconnect,
    /// Skip the envelope for that subscriber only.
    Drop,
}

/// Tuning for the real-time delivery path.
///
/// ```
/// use courier_config::{DeliveryConfig, OverflowPolicy};
///
/// let delivery = DeliveryConfig::default();
/// assert_eq!(delivery.subscriber_buffer, 64);
/// assert_eq!(delivery.overflow_policy, OverflowPolicy::Disconnect);
/// assert_eq!(delivery.max_insert_attempts, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default = "DeliveryConfig::default_subscriber_buffer")]
    pub subscriber_buffer: usize,
    #[serde(default)]
    pub overflow_policy: OverflowPolicy,
    #[serde(default = "DeliveryConfig::default_max_insert_attempts")]
    pub max_insert_attempts: u32,
    #[serde(default = "DeliveryConfig::default_max_body_len")]
    pub max_body_len: usize,
    #[serde(default = "DeliveryConfig::default_history_limit")]
    pub history_limit: u32,
}

impl DeliveryConfig {
    const fn default_subscriber_buffer() -> usize {
        64
    }

    const fn default_max_insert_attempts() -> u32 {
        5
    }

    const fn default_max_body_len() -> usize {
        4096
    }

    const fn default_history_limit() -> u32 {
        100
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.subscriber_buffer > 0,
            "delivery.subscriber_buffer must be greater than zero"
        );
        ensure!(
            self.max_insert_attempts > 0,
            "delivery.max_insert_attempts must be greater than zero"
        );
        ensure!(
            self.max_body_len > 0,
            "delivery.max_body_len must be greater than zero"
        );
        ensure!(
            self.history_limit > 0,
            "delivery.history_limit must be greater than zero"
        );
        Ok(())
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: Self::default_subscriber_buffer(),
            overflow_policy: OverflowPolicy::default(),
            max_insert_attempts: Self::default_max_insert_attempts(),
            max_body_len: Self::default_max_body_len(),
            history_limit: Self::default_history_limit(),
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use courier_config::load;
///
/// std::env::remove_var("COURIER_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder()
        .set_default("http.address", defaults.http.address.clone())?
        .set_default("http.port", i64::from(defaults.http.port))?
        .set_default("database.url", defaults.database.url.clone())?
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )?
        .set_default(
            "delivery.subscriber_buffer",
            i64::try_from(defaults.delivery.subscriber_buffer).unwrap_or(i64::MAX),
        )?
        .set_default("delivery.overflow_policy", "disconnect")?
        .set_default(
            "delivery.max_insert_attempts",
            i64::from(defaults.delivery.max_insert_attempts),
        )?
        .set_default(
            "delivery.max_body_len",
            i64::try_from(defaults.delivery.max_body_len).unwrap_or(i64::MAX),
        )?
        .set_default(
            "delivery.history_limit",
            i64::from(defaults.delivery.history_limit),
        )?;

    let environment_overrides = config::Environment::with_prefix("COURIER").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("COURIER_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via COURIER_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    config
        .delivery
        .validate()
        .context("invalid delivery configuration")?;

    debug!(?config, "loaded backend configuration");
    Ok(config)
}
