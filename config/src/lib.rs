//! # Configuration Management for SoftHaus
//!
//! This crate provides the configuration structures shared by the SoftHaus
//! workspace: database connection settings for the PostgreSQL storage backend
//! and limits for the model lifecycle event registry.
//!
//! ## Quick Start
//!
//! ### Programmatic Configuration
//! ```rust
//! use config::{DatabaseConfig, SignalConfig};
//!
//! let db_config = DatabaseConfig::new(
//!     "localhost".to_string(), 5432, "myapp".to_string(),
//!     "postgres".to_string(), "password".to_string(),
//!     1, 10, 30, 600, 3600,
//! );
//!
//! let signal_config = SignalConfig::new(64, false);
//! # let _ = (db_config, signal_config);
//! ```
//!
//! ### TOML File Configuration
//! ```toml
//! [database]
//! host = "localhost"
//! port = 5432
//! database = "myapp"
//! username = "postgres"
//! password = "password"
//! min_connections = 1
//! max_connections = 10
//! connection_timeout_seconds = 30
//! idle_timeout_seconds = 600
//! max_lifetime_seconds = 3600
//!
//! [signal]
//! max_listeners_per_event = 64
//! log_dispatch = false
//! ```
//!
//! Load configuration:
//! ```rust,no_run
//! use config::AppConfig;
//!
//! // Path from SOFTHAUS_CONFIG (environment or .env), else ./softhaus.toml
//! let config = AppConfig::load()?;
//!
//! // Or load from custom path
//! let config = AppConfig::from_file("config/production.toml")?;
//! # Ok::<(), config::ConfigError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::{env, path::Path};
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "./softhaus.toml";
const CONFIG_PATH_VAR: &str = "SOFTHAUS_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Environment variable error: {0}")]
    Env(#[from] env::VarError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub signal: SignalConfig,
}

/// PostgreSQL connection and pool settings
///
/// Only the connection fields are required in a file; pool sizing and
/// timeouts fall back to the defaults below. `max_lifetime_seconds = 0`
/// keeps connections open indefinitely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    #[serde(default = "defaults::port")]
    pub port: u16,
    pub database: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "defaults::min_connections")]
    pub min_connections: u32,
    #[serde(default = "defaults::max_connections")]
    pub max_connections: u32,
    #[serde(default = "defaults::connection_timeout")]
    pub connection_timeout_seconds: u64,
    #[serde(default = "defaults::idle_timeout")]
    pub idle_timeout_seconds: u64,
    #[serde(default = "defaults::max_lifetime")]
    pub max_lifetime_seconds: u64,
}

mod defaults {
    pub fn port() -> u16 {
        5432
    }

    pub fn min_connections() -> u32 {
        1
    }

    pub fn max_connections() -> u32 {
        10
    }

    pub fn connection_timeout() -> u64 {
        30
    }

    pub fn idle_timeout() -> u64 {
        600
    }

    pub fn max_lifetime() -> u64 {
        3600
    }
}

/// Lifecycle event registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Upper bound on listeners registered for a single event
    pub max_listeners_per_event: usize,
    /// Emit a trace event for every dispatched lifecycle event
    pub log_dispatch: bool,
}

impl AppConfig {
    /// Load configuration from the TOML file named by `SOFTHAUS_CONFIG`
    /// (process environment or `.env`), falling back to `./softhaus.toml`
    pub fn load() -> Result<Self, ConfigError> {
        // .env is optional
        dotenvy::dotenv().ok();

        match env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(path),
            Err(env::VarError::NotPresent) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(DEFAULT_CONFIG_PATH)
            }
            Err(env::VarError::NotPresent) => Err(ConfigError::Invalid(format!(
                "no configuration: set {} (environment or .env) or create {}",
                CONFIG_PATH_VAR, DEFAULT_CONFIG_PATH
            ))),
            Err(err) => Err(err.into()),
        }
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        self.signal.validate()?;
        Ok(())
    }
}

impl DatabaseConfig {
    /// Create a new database configuration
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        host: String,
        port: u16,
        database: String,
        username: String,
        password: String,
        min_connections: u32,
        max_connections: u32,
        connection_timeout_seconds: u64,
        idle_timeout_seconds: u64,
        max_lifetime_seconds: u64,
    ) -> Self {
        Self {
            host,
            port,
            database,
            username,
            password,
            min_connections,
            max_connections,
            connection_timeout_seconds,
            idle_timeout_seconds,
            max_lifetime_seconds,
        }
    }

    /// Build connection string
    pub fn connection_string(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let problems = [
            (self.host.is_empty(), "host cannot be empty"),
            (self.port == 0, "port cannot be zero"),
            (self.database.is_empty(), "database name cannot be empty"),
            (self.username.is_empty(), "username cannot be empty"),
            (self.max_connections == 0, "max_connections must be greater than 0"),
            (
                self.min_connections > self.max_connections,
                "min_connections cannot exceed max_connections",
            ),
            (
                self.connection_timeout_seconds == 0,
                "connection_timeout_seconds must be greater than 0",
            ),
        ];

        match problems.iter().find(|(failed, _)| *failed) {
            Some((_, problem)) => Err(ConfigError::Invalid(format!("database {}", problem))),
            None => Ok(()),
        }
    }
}

impl SignalConfig {
    /// Create a new signal configuration
    pub fn new(max_listeners_per_event: usize, log_dispatch: bool) -> Self {
        Self {
            max_listeners_per_event,
            log_dispatch,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_listeners_per_event == 0 {
            return Err(ConfigError::Invalid(
                "signal max_listeners_per_event must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self::new(64, false)
    }
}
