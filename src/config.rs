//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub graph: GraphConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Account store backend selector
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    /// Volatile store, lost on restart
    Memory,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Token signing configuration
///
/// Handed to the token issuer explicitly; nothing reads the secret from
/// ambient process state.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret key (32+ bytes)
    pub token_secret: String,
    /// Token lifetime in seconds (default: 2592000 = 30 days)
    pub token_max_age: i64,
}

/// Follow-graph tuning
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    /// Peer updates in flight at once during account deletion
    pub cascade_concurrency: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            cascade_concurrency: 8,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level for this crate: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    #[serde(default)]
    pub format: LogFormat,
}

impl LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub fn filter_directive(&self) -> String {
        format!("linkup={},tower_http=debug", self.level.to_ascii_lowercase())
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (LINKUP__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.backend", "sqlite")?
            .set_default("database.path", "data/linkup.db")?
            .set_default("auth.token_max_age", 2_592_000)?
            .set_default("graph.cascade_concurrency", 8)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("LINKUP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_TOKEN_SECRET_BYTES: usize = 32;

        if self.auth.token_secret.as_bytes().len() < MIN_TOKEN_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.token_secret must be at least {} bytes",
                MIN_TOKEN_SECRET_BYTES
            )));
        }

        if self.auth.token_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.token_max_age must be greater than 0".to_string(),
            ));
        }

        if self.graph.cascade_concurrency == 0 {
            return Err(crate::error::AppError::Config(
                "graph.cascade_concurrency must be at least 1".to_string(),
            ));
        }

        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(crate::error::AppError::Config(format!(
                "logging.level must be one of trace, debug, info, warn, error (got {:?})",
                self.logging.level
            )));
        }

        if self.database.backend == StoreBackend::Memory {
            tracing::warn!("Using the in-memory account store; data is lost on restart");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Sqlite,
                path: PathBuf::from("/tmp/linkup-test.db"),
            },
            auth: AuthConfig {
                token_secret: "x".repeat(32),
                token_max_age: 2_592_000,
            },
            graph: GraphConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Pretty,
            },
        }
    }

    #[test]
    fn validate_accepts_defaults() {
        let config = valid_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn validate_rejects_short_token_secret() {
        let mut config = valid_config();
        config.auth.token_secret = "short-secret".to_string();

        let error = config
            .validate()
            .expect_err("token secret shorter than 32 bytes must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("auth.token_secret")
        ));
    }

    #[test]
    fn validate_rejects_non_positive_token_age() {
        let mut config = valid_config();
        config.auth.token_max_age = 0;

        let error = config.validate().expect_err("zero max age must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("auth.token_max_age")
        ));
    }

    #[test]
    fn validate_rejects_zero_cascade_concurrency() {
        let mut config = valid_config();
        config.graph.cascade_concurrency = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_log_level() {
        let mut config = valid_config();
        config.logging.level = "loud".to_string();

        let error = config.validate().expect_err("unknown level must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message) if message.contains("logging.level")
        ));
    }

    #[test]
    fn logging_section_drives_filter_and_format() {
        let logging: LoggingConfig =
            serde_json::from_value(serde_json::json!({ "level": "DEBUG", "format": "json" }))
                .unwrap();

        assert_eq!(logging.format, LogFormat::Json);
        assert_eq!(logging.filter_directive(), "linkup=debug,tower_http=debug");

        let defaulted: LoggingConfig =
            serde_json::from_value(serde_json::json!({ "level": "info" })).unwrap();
        assert_eq!(defaulted.format, LogFormat::Pretty);
    }
}
