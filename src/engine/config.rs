//! Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading or validating a [`TxManagerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid savepoint prefix '{0}': only ASCII letters, digits and '_' are allowed, and it must not start with a digit")]
    InvalidSavepointPrefix(String),
}

/// Engine configuration options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxManagerConfig {
    /// Prefix of generated savepoint names.
    pub savepoint_prefix: String,
    /// Release the savepoint after a NESTED unit of work succeeds.
    pub release_savepoints: bool,
}

impl Default for TxManagerConfig {
    fn default() -> Self {
        Self {
            savepoint_prefix: "sp".to_string(),
            release_savepoints: false,
        }
    }
}

impl TxManagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the savepoint name prefix.
    pub fn savepoint_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.savepoint_prefix = prefix.into();
        self
    }

    /// Set release_savepoints flag.
    pub fn release_savepoints(mut self, value: bool) -> Self {
        self.release_savepoints = value;
        self
    }

    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Savepoint names are spliced into SQL, so the prefix must be a plain
    /// identifier.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = &self.savepoint_prefix;
        let valid = !prefix.is_empty()
            && prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !prefix.starts_with(|c: char| c.is_ascii_digit());
        if valid {
            Ok(())
        } else {
            Err(ConfigError::InvalidSavepointPrefix(prefix.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = TxManagerConfig::default();
        assert_eq!(config.savepoint_prefix, "sp");
        assert!(!config.release_savepoints);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = TxManagerConfig::from_json_str(r#"{"release_savepoints": true}"#).unwrap();
        assert_eq!(config.savepoint_prefix, "sp");
        assert!(config.release_savepoints);
    }

    #[test]
    fn test_invalid_prefix_rejected() {
        for prefix in ["", "1sp", "sp-1", "sp\"; DROP"] {
            let config = TxManagerConfig::new().savepoint_prefix(prefix);
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidSavepointPrefix(_))
            ));
        }
        let json = r#"{"savepoint_prefix": "9lives"}"#;
        assert!(TxManagerConfig::from_json_str(json).is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"savepoint_prefix": "nested", "release_savepoints": true}}"#).unwrap();

        let config = TxManagerConfig::from_file(file.path()).unwrap();
        assert_eq!(
            config,
            TxManagerConfig::new()
                .savepoint_prefix("nested")
                .release_savepoints(true)
        );
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = TxManagerConfig::from_file(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
