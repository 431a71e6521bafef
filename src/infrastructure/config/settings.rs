//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings. It is
//! loaded from a TOML file; every section has defaults, so an empty file is
//! a valid configuration. `LINESMAN_DATABASE` overrides the database path.
//!
//! # Example
//!
//! ```no_run
//! use linesman::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.logging.init();
//!     Ok(())
//! }
//! ```

use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

use super::logging::LoggingConfig;
use crate::adapter::outbound::venue::VenuesConfig;
use crate::application::arbitrage::ArbitrageConfig;
use crate::application::matcher::MatcherConfig;
use crate::error::{ConfigError, Result};

/// Environment variable that replaces `database.path`.
pub const DATABASE_ENV: &str = "LINESMAN_DATABASE";

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// Socket address to bind.
    ///
    /// # Errors
    /// `ConfigError::InvalidValue` when host and port do not form an address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| {
                ConfigError::InvalidValue {
                    field: "server.host",
                    reason: e.to_string(),
                }
                .into()
            })
    }
}

/// Which store implementation backs the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    #[default]
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// SQLite file path. Ignored by the memory backend.
    #[serde(default = "default_database_path")]
    pub path: String,
}

fn default_database_path() -> String {
    "linesman.db".into()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_database_path(),
        }
    }
}

/// Main application configuration.
///
/// Load from a TOML file using [`Config::load`] or parse directly with
/// [`Config::parse_toml`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    /// Event matching thresholds and scoring weights.
    #[serde(default)]
    pub matcher: MatcherConfig,

    /// Budget, rounding and quote selection for the solver.
    #[serde(default)]
    pub arbitrage: ArbitrageConfig,

    /// Venue endpoints and fee models.
    #[serde(default)]
    pub venues: VenuesConfig,
}

impl Config {
    /// Parse configuration from TOML content, apply environment overrides
    /// and validate.
    ///
    /// # Errors
    /// Returns an error if the TOML is malformed or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;

        if let Ok(path) = std::env::var(DATABASE_ENV) {
            if !path.trim().is_empty() {
                config.database.path = path;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, the TOML is malformed,
    /// or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Validate every section.
    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "server.host",
            }
            .into());
        }
        self.server.socket_addr()?;
        if self.database.backend == StoreBackend::Sqlite && self.database.path.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "database.path",
            }
            .into());
        }
        self.logging.validate()?;
        self.matcher.validate()?;
        self.arbitrage.validate()?;
        self.venues.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        config.validate().unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.backend, StoreBackend::Sqlite);
        assert_eq!(config.arbitrage.budget, dec!(100));
        assert!(config.venues.polymarket.enabled);
    }

    #[test]
    fn sections_override_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9000

            [database]
            backend = "memory"

            [arbitrage]
            budget = "250"

            [matcher]
            window_hours = 12
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.backend, StoreBackend::Memory);
        assert_eq!(config.arbitrage.budget, dec!(250));
        assert_eq!(config.matcher.window_hours, 12);
    }

    #[test]
    fn invalid_log_format_is_rejected() {
        let config: Config = toml::from_str("[logging]\nformat = \"xml\"\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.format"));
    }

    #[test]
    fn bad_host_is_rejected() {
        let config: Config = toml::from_str("[server]\nhost = \"not a host\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = toml::from_str::<Config>("[server\nport = 1").unwrap_err();
        assert!(!err.to_string().is_empty());
    }
}
