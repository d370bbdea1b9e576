use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON5 parse error: {0}")]
    Json5(#[from] json5::Error),
    #[error("Home directory not found")]
    NoDirFound,
}

/// Top-level offtimer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfftimerConfig {
    /// Directory holding the task store file; defaults to the config
    /// directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Prefix for generated task names. Also the marker prefix used when
    /// purging cron entries in bulk.
    #[serde(default = "default_task_prefix")]
    pub task_prefix: String,
}

fn default_task_prefix() -> String {
    "OfftimerTask".to_string()
}

impl Default for OfftimerConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            task_prefix: default_task_prefix(),
        }
    }
}

impl OfftimerConfig {
    /// Path of the task store file for this configuration.
    pub fn store_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.join("tasks.json")),
            None => Ok(config_dir()?.join("tasks.json")),
        }
    }
}

/// Resolve the offtimer config directory (~/.offtimer/).
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|h| h.join(".offtimer"))
        .ok_or(ConfigError::NoDirFound)
}

/// Resolve the config file path (~/.offtimer/config.json5).
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.json5"))
}

/// Load configuration from the default path, falling back to defaults.
pub fn load_config() -> Result<OfftimerConfig, ConfigError> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let path = config_file_path()?;
    load_config_from(&path)
}

/// Load configuration from a specific path, falling back to defaults if not found.
pub fn load_config_from(path: &Path) -> Result<OfftimerConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("Config file not found at {}, using defaults", path.display());
        return Ok(OfftimerConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: OfftimerConfig = json5::from_str(&content)?;
    Ok(config)
}

/// Ensure the config directory exists.
pub fn ensure_config_dir() -> Result<PathBuf, ConfigError> {
    let dir = config_dir()?;
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OfftimerConfig::default();
        assert!(config.data_dir.is_none());
        assert_eq!(config.task_prefix, "OfftimerTask");
    }

    #[test]
    fn test_json5_parse() {
        let json5_str = r#"{
            data_dir: "/var/lib/offtimer",
            task_prefix: "MyShutdownTask",
        }"#;
        let config: OfftimerConfig = json5::from_str(json5_str).unwrap();
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/offtimer")));
        assert_eq!(config.task_prefix, "MyShutdownTask");
    }

    #[test]
    fn test_json5_parse_partial() {
        let config: OfftimerConfig = json5::from_str("{}").unwrap();
        assert!(config.data_dir.is_none());
        assert_eq!(config.task_prefix, "OfftimerTask");
    }

    #[test]
    fn test_store_path_uses_data_dir() {
        let config = OfftimerConfig {
            data_dir: Some(PathBuf::from("/tmp/offtimer-data")),
            ..OfftimerConfig::default()
        };
        assert_eq!(
            config.store_path().unwrap(),
            PathBuf::from("/tmp/offtimer-data/tasks.json")
        );
    }

    #[test]
    fn test_load_config_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("nope.json5")).unwrap();
        assert_eq!(config.task_prefix, "OfftimerTask");
    }
}
