use chorechart_shared::auth::Role;
use serde::Deserialize;
use std::{env, fs, path::Path};

use crate::storage::ledger::DEFAULT_LOG_RETENTION;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub jwt_secret: String,
    #[serde(default)]
    pub users: Vec<UserConfig>,
    pub dev_cors_origin: Option<String>,
    pub listen_port: Option<u16>,
    /// Number of audit log rows kept.
    #[serde(default = "default_log_retention")]
    pub log_retention: i64,
}

fn default_log_retention() -> i64 {
    DEFAULT_LOG_RETENTION
}

/// A user seeded into the database at startup (upserted by username).
#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    pub username: String,
    pub passcode_hash: String, // bcrypt hash
    pub role: Role,
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Yaml(e) => write!(f, "YAML error: {}", e),
            ConfigError::Invalid(m) => write!(f, "invalid config: {}", m),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(value: serde_yaml::Error) -> Self {
        ConfigError::Yaml(value)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
        Self::load_from_path(path)
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(&path)?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let cfg: AppConfig = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("jwt_secret must not be empty".into()));
        }
        if self.log_retention < 1 {
            return Err(ConfigError::Invalid("log_retention must be at least 1".into()));
        }
        Ok(())
    }
}
