//! Dashwatch configuration
//!
//! Loaded from an optional TOML file, then overridden from the environment.
//! Every field has a default so an empty file (or no file) is a valid config.
//!
//! ## Environment Variables
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `DW_HOST` | `server.host` |
//! | `DW_PORT` | `server.port` |
//! | `DW_STORAGE_BACKEND` | `storage.backend` |
//! | `DW_DATA_DIR` | `storage.data_dir` |
//! | `DW_MONGO_URL` | `storage.mongo_url` |
//! | `DW_MONGO_DB` | `storage.mongo_db` |
//! | `DW_LOG_JSON` | `logging.json` |

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidOverride { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Which storage implementation the process runs with
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    File,
    Mongo,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "file" => Ok(StorageBackend::File),
            "mongo" | "mongodb" => Ok(StorageBackend::Mongo),
            other => Err(ConfigError::InvalidOverride {
                key: "storage.backend".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory holding the JSON files of the `file` backend
    pub data_dir: PathBuf,
    pub mongo_url: String,
    pub mongo_db: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: PathBuf::from("./data"),
            mongo_url: "mongodb://localhost:27017".to_string(),
            mongo_db: "dashwatch".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DispatchConfig {
    /// Upper bound on one delivery attempt
    pub delivery_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Deliveries in flight per dispatch. 1 delivers sequentially.
    pub max_concurrency: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            delivery_timeout_secs: 10,
            connect_timeout_secs: 5,
            max_concurrency: 8,
        }
    }
}

impl DispatchConfig {
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PolicyConfig {
    pub reserved_subscription_ids: Vec<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            reserved_subscription_ids: vec!["123123".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    pub countries_url: String,
    pub weather_url: String,
    pub currency_url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            countries_url: "https://restcountries.com/v3.1".to_string(),
            weather_url: "https://api.open-meteo.com/v1".to_string(),
            currency_url: "https://open.er-api.com/v6/latest".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
}

// ============================================================================
// Root
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub dispatch: DispatchConfig,
    pub policy: PolicyConfig,
    pub upstream: UpstreamConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load from an optional file, then apply process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                debug!("No config file given, starting from defaults");
                Self::default()
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `DW_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("DW_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("DW_PORT") {
            self.server.port = parse_override("DW_PORT", &port)?;
        }
        if let Some(backend) = lookup("DW_STORAGE_BACKEND") {
            self.storage.backend = backend.parse()?;
        }
        if let Some(dir) = lookup("DW_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup("DW_MONGO_URL") {
            self.storage.mongo_url = url;
        }
        if let Some(db) = lookup("DW_MONGO_DB") {
            self.storage.mongo_db = db;
        }
        if let Some(json) = lookup("DW_LOG_JSON") {
            self.logging.json = parse_override("DW_LOG_JSON", &json)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.dispatch.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "dispatch.max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.dispatch.delivery_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "dispatch.delivery_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.dispatch.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "dispatch.connect_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.policy.reserved_subscription_ids.is_empty() {
            warn!("No reserved subscription IDs configured");
        }
        Ok(())
    }
}

fn parse_override<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.dispatch.delivery_timeout(), Duration::from_secs(10));
        assert_eq!(config.policy.reserved_subscription_ids, vec!["123123"]);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [server]
            port = 9000

            [storage]
            backend = "file"
            data_dir = "/var/lib/dashwatch"

            [dispatch]
            max_concurrency = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/dashwatch"));
        assert_eq!(config.dispatch.max_concurrency, 1);
        assert_eq!(config.dispatch.delivery_timeout_secs, 10);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[policy]\nreserved_subscription_ids = [\"1\", \"2\"]\n[logging]\njson = true"
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.policy.reserved_subscription_ids, vec!["1", "2"]);
        assert!(config.logging.json);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = AppConfig::from_file(Path::new("/nonexistent/dashwatch.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("DW_PORT", "3000"),
            ("DW_STORAGE_BACKEND", "mongo"),
            ("DW_MONGO_DB", "dw_test"),
            ("DW_LOG_JSON", "true"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.storage.backend, StorageBackend::Mongo);
        assert_eq!(config.storage.mongo_db, "dw_test");
        assert!(config.logging.json);
    }

    #[test]
    fn test_bad_override_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(|key| (key == "DW_PORT").then(|| "not-a-port".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOverride { .. }));

        let err = config
            .apply_overrides(|key| (key == "DW_STORAGE_BACKEND").then(|| "redis".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOverride { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = AppConfig::default();
        config.dispatch.max_concurrency = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.dispatch.delivery_timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
