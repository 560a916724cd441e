//! Store configuration
//!
//! Priority (highest to lowest):
//! 1. Environment variables (`RULESTORE_DATABASE_PATH`, `RULESTORE_MAX_CONNECTIONS`, ...)
//! 2. Config file (YAML, TOML or JSON by extension)
//! 3. Default values

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, StoreError};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "RULESTORE_";

/// Default database location
pub const DEFAULT_DATABASE_PATH: &str = "data/rules.db";

/// Rule store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size. Keep at 1 unless callers serialize access themselves.
    pub max_connections: u32,

    /// Lock wait in milliseconds
    pub busy_timeout_ms: u64,

    /// `enable` values (case-insensitive) that count as enabled
    pub enable_values: Vec<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            max_connections: 1,
            busy_timeout_ms: 5000,
            enable_values: ["true", "on", "1", "yes", "enabled"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl StoreConfig {
    /// Defaults with a different database path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: path.into(),
            ..Default::default()
        }
    }

    /// Layered figment: defaults, optional file, then `RULESTORE_` env vars
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        Self::figment_with_env(file, ENV_PREFIX)
    }

    /// Same as [`StoreConfig::figment`] with a custom env prefix
    pub fn figment_with_env(file: Option<&Path>, env_prefix: &str) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(StoreConfig::default()));

        if let Some(path) = file {
            let extension = path
                .extension()
                .and_then(|s| s.to_str())
                .ok_or_else(|| StoreError::Config("Config file must have an extension".into()))?;

            figment = match extension {
                "toml" => figment.merge(Toml::file(path)),
                "yaml" | "yml" => figment.merge(Yaml::file(path)),
                "json" => figment.merge(Json::file(path)),
                _ => {
                    return Err(StoreError::Config(format!(
                        "Unsupported config file format: {}",
                        extension
                    )))
                },
            };
        }

        Ok(figment.merge(Env::prefixed(env_prefix)))
    }

    /// Extract and validate a configuration from a figment
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: StoreConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the standard layers
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::from_figment(&Self::figment(file)?)
    }

    /// Reject values the store cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(StoreError::Config("database_path must not be empty".into()));
        }
        if self.max_connections == 0 {
            return Err(StoreError::Config(
                "max_connections must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.database_path, PathBuf::from("data/rules.db"));
        assert_eq!(config.max_connections, 1);
        assert_eq!(config.busy_timeout(), Duration::from_secs(5));
        assert!(config.enable_values.iter().any(|v| v == "on"));
        config.validate().unwrap();
    }

    #[test]
    fn test_yaml_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "database_path: /tmp/custom.db\nenable_values: [\"True\"]\n"
        )
        .unwrap();

        let figment =
            StoreConfig::figment_with_env(Some(file.path()), "RULESTORE_TEST_YAML_").unwrap();
        let config = StoreConfig::from_figment(&figment).unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/custom.db"));
        assert_eq!(config.enable_values, vec!["True".to_string()]);
        assert_eq!(config.max_connections, 1);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "database_path = \"from-file.db\"").unwrap();

        std::env::set_var("RULESTORE_TEST_ENV_DATABASE_PATH", "from-env.db");
        let figment =
            StoreConfig::figment_with_env(Some(file.path()), "RULESTORE_TEST_ENV_").unwrap();
        let config = StoreConfig::from_figment(&figment).unwrap();
        std::env::remove_var("RULESTORE_TEST_ENV_DATABASE_PATH");

        assert_eq!(config.database_path, PathBuf::from("from-env.db"));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = StoreConfig::figment(Some(Path::new("config.ini"))).unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_zero_connections() {
        let config = StoreConfig {
            max_connections: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(StoreError::Config(_))));
    }
}
