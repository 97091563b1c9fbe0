//! Configuration management for the things store
//!
//! Sources, highest priority first:
//! - Environment variables (`THINGS_DATABASE__URL=...`)
//! - The file named by `THINGS_CONFIG`
//! - `./config/things.{yaml,toml,json}`
//! - `/etc/things/things.{yaml,toml,json}`
//! - Built-in defaults

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ThingsConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl ThingsConfig {
    /// Load configuration from all sources and validate it.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Self::set_defaults(Config::builder())?;

        if let Ok(config_path) = std::env::var("THINGS_CONFIG") {
            builder = builder.add_source(File::with_name(&config_path).required(false));
        }

        builder = builder
            .add_source(File::with_name("./config/things").required(false))
            .add_source(File::with_name("/etc/things/things").required(false));

        // Example: THINGS_DATABASE__MAX_CONNECTIONS=16
        builder = builder.add_source(
            Environment::with_prefix("THINGS")
                .separator("__")
                .try_parsing(true),
        );

        let config: ThingsConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn set_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let database = DatabaseConfig::default();
        builder
            .set_default("database.url", database.url)?
            .set_default("database.max_connections", database.max_connections)?
            .set_default("database.busy_timeout_ms", database.busy_timeout_ms)?
            .set_default("database.operation_timeout_ms", database.operation_timeout_ms)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Message(
                "database.url must not be empty".to_string(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Message(
                "database.max_connections must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from a specific file path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: ThingsConfig = Self::set_defaults(Config::builder())?
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

/// Relational store connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Connection URL, e.g. `sqlite://things.db`
    pub url: String,

    pub max_connections: u32,

    /// How long a connection waits on a locked database
    pub busy_timeout_ms: u64,

    /// Upper bound for a single repository operation; 0 disables the deadline
    pub operation_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://things.db".to_string(),
            max_connections: 8,
            busy_timeout_ms: 5_000,
            operation_timeout_ms: 30_000,
        }
    }
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Operation deadline, `None` when disabled
    pub fn operation_timeout(&self) -> Option<Duration> {
        (self.operation_timeout_ms > 0).then(|| Duration::from_millis(self.operation_timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configuration() {
        let config = ThingsConfig::default();

        assert_eq!(config.database.url, "sqlite://things.db");
        assert_eq!(config.database.max_connections, 8);
        assert_eq!(config.database.busy_timeout().as_millis(), 5_000);
        assert_eq!(
            config.database.operation_timeout(),
            Some(Duration::from_secs(30))
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_operation_timeout_disables_deadline() {
        let database = DatabaseConfig {
            operation_timeout_ms: 0,
            ..DatabaseConfig::default()
        };
        assert_eq!(database.operation_timeout(), None);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = ThingsConfig::default();
        config.database.url = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = ThingsConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("things-config-{}.toml", uuid::Uuid::now_v7()));
        std::fs::write(
            &path,
            "[database]\nurl = \"sqlite::memory:\"\nmax_connections = 2\n",
        )
        .expect("write config");

        let config = ThingsConfig::from_file(&path).expect("load config");
        let _ = std::fs::remove_file(&path);

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.database.max_connections, 2);
        assert_eq!(config.database.busy_timeout_ms, 5_000);
    }
}
