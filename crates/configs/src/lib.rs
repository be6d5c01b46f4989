//! # configs
//!
//! Layered runtime settings for the forum binaries.
//!
//! Precedence, lowest first:
//! 1. built-in defaults
//! 2. `config/default.toml`, `config/local.toml` (both optional)
//! 3. `FORUM__SECTION__KEY` environment variables (e.g. `FORUM__SERVER__PORT`)
//! 4. the plain `PORT`, `DATABASE_URL` and `REDIS_URL` variables
//!
//! A `.env` file in the working directory is loaded into the environment first.

use std::env;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const MIN_JWT_SECRET_BYTES: usize = 32;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] ConfigError),

    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub store: StoreSettings,
    pub activity: ActivitySettings,
    pub auth: AuthSettings,
    pub log: LogSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub url: SecretString,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize)]
pub struct StoreSettings {
    /// Upper bound for a single store round trip.
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct ActivitySettings {
    /// Activity logging is disabled when unset.
    pub redis_url: Option<SecretString>,
    pub stream: String,
    /// Approximate cap on stream length.
    pub max_len: usize,
    pub queue_capacity: usize,
    pub probe_interval_secs: u64,
    /// Bounds connecting to Redis and each command.
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: SecretString,
    pub token_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub filter: String,
    pub format: LogFormat,
}

impl Settings {
    /// Loads `.env`, then every layer described in the module docs.
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }

        let builder = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("FORUM")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.port", env::var("PORT").ok())?
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .set_override_option("activity.redis_url", env::var("REDIS_URL").ok())?;

        Self::from_builder(builder)
    }

    /// Builder pre-populated with every default value.
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("database.max_connections", 10)?
            .set_default("database.acquire_timeout_secs", 5)?
            .set_default("database.run_migrations", true)?
            .set_default("store.timeout_ms", 5000)?
            .set_default("activity.stream", "activity_logs")?
            .set_default("activity.max_len", 100_000)?
            .set_default("activity.queue_capacity", 1024)?
            .set_default("activity.probe_interval_secs", 5)?
            .set_default("activity.timeout_ms", 2000)?
            .set_default("auth.token_ttl_secs", 3600)?
            .set_default("log.filter", "info,tower_http=info,sqlx=warn")?
            .set_default("log.format", "pretty")
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, SettingsError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.auth.jwt_secret.expose_secret().len() < MIN_JWT_SECRET_BYTES {
            return Err(SettingsError::Invalid {
                key: "auth.jwt_secret",
                reason: format!("must be at least {MIN_JWT_SECRET_BYTES} bytes"),
            });
        }
        if self.activity.queue_capacity == 0 {
            return Err(SettingsError::Invalid {
                key: "activity.queue_capacity",
                reason: "must be greater than zero".into(),
            });
        }
        if self.store.timeout_ms == 0 {
            return Err(SettingsError::Invalid {
                key: "store.timeout_ms",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store.timeout_ms)
    }
}

impl DatabaseSettings {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

impl ActivitySettings {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }
}

impl AuthSettings {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }
}
