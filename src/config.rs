//! Configuration management for Guerite server

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Which record store backend to open at startup
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    /// Path of the device-local SQLite file
    pub path: String,
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegistrationConfig {
    /// Minimum national ID length before duplicate detection runs
    pub duplicate_min_length: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LiveViewConfig {
    pub refresh_interval_ms: u64,
}

impl LiveViewConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(1))
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub registration: RegistrationConfig,
    #[serde(default)]
    pub live_view: LiveViewConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Environment variables with prefix GUERITE_, e.g. GUERITE_SERVER__PORT
            .add_source(
                Environment::with_prefix("GUERITE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.path", env::var("DATABASE_PATH").ok())?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            path: "data/guerite.db".to_string(),
            max_connections: 4,
            busy_timeout_ms: 5000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            duplicate_min_length: 8,
        }
    }
}

impl Default for LiveViewConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 2000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.database.backend, StoreBackend::Sqlite);
        assert_eq!(config.registration.duplicate_min_length, 8);
        assert_eq!(config.live_view.refresh_interval(), Duration::from_secs(2));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(
                "[database]\nbackend = \"memory\"\npath = \":memory:\"\nmax_connections = 1\nbusy_timeout_ms = 100\n",
                FileFormat::Toml,
            ))
            .build()
            .and_then(|c| c.try_deserialize())
            .unwrap();

        assert_eq!(config.database.backend, StoreBackend::Memory);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.live_view.refresh_interval_ms, 2000);
    }
}
