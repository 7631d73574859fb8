//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod app;
pub mod auth;
pub mod database;
pub mod logging;
pub mod realtime;
pub mod turn;

use serde::{Deserialize, Serialize};

use self::app::ServerConfig;
use self::auth::{AuthConfig, MIN_JWT_SECRET_LEN};
use self::database::{DatabaseConfig, StorageProvider};
use self::logging::LoggingConfig;
use self::realtime::RealtimeConfig;
use self::turn::TurnConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Storage collaborator settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Bearer-token settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Real-time WebSocket settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// TURN/STUN broker settings.
    #[serde(default)]
    pub turn: TurnConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `{dir}/default.toml` with the `{dir}/{env}.toml` overlay and
    /// environment variables prefixed with `CHATHUB__` (`__` also separates
    /// nested keys, e.g. `CHATHUB__AUTH__JWT_SECRET`).
    pub fn load(dir: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(&format!("{dir}/default")).required(false))
            .add_source(config::File::with_name(&format!("{dir}/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("CHATHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the server cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.auth.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(AppError::configuration(format!(
                "auth.jwt_secret must be at least {MIN_JWT_SECRET_LEN} characters"
            )));
        }
        if self.database.provider == StorageProvider::Postgres && self.database.url.is_empty() {
            return Err(AppError::configuration(
                "database.url is required for the postgres provider",
            ));
        }
        if self.realtime.outbound_buffer_size == 0 {
            return Err(AppError::configuration(
                "realtime.outbound_buffer_size must be greater than zero",
            ));
        }
        if self.realtime.ring_timeout_seconds > 0 && self.realtime.watchdog_interval_seconds == 0 {
            return Err(AppError::configuration(
                "realtime.watchdog_interval_seconds must be greater than zero",
            ));
        }
        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            return Err(AppError::configuration(format!(
                "logging.format must be \"json\" or \"pretty\", got \"{}\"",
                self.logging.format
            )));
        }
        Ok(())
    }
}
