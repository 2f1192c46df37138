//! Store configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::directory::DirectoryStore;
use crate::error::{Result, StoreError};

/// Configuration of a directory store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store directory.
    pub root: PathBuf,

    /// Create the store if the directory holds none.
    pub create_if_missing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./cdv-store"),
            create_if_missing: false,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("CDV_STORE_ROOT") {
            config.root = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("CDV_STORE_CREATE") {
            config.create_if_missing = val.to_lowercase() == "true" || val == "1";
        }

        config
    }

    /// Parse from YAML.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.root.as_os_str().is_empty() {
            return Err("store root must not be empty".to_string());
        }
        if self.root.is_file() {
            return Err(format!("store root {} is a file", self.root.display()));
        }
        Ok(())
    }

    /// Open (or create, if allowed) the configured store.
    pub fn open_store(&self) -> Result<DirectoryStore> {
        self.validate().map_err(StoreError::Config)?;
        if self.create_if_missing {
            DirectoryStore::open_or_create(&self.root)
        } else {
            DirectoryStore::open(&self.root)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(StoreConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_root_is_invalid() {
        let config = StoreConfig {
            root: PathBuf::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_yaml() {
        let config = StoreConfig::from_yaml_str("root: /data/fields\n").unwrap();
        assert_eq!(config.root, PathBuf::from("/data/fields"));
        assert!(!config.create_if_missing);

        assert!(StoreConfig::from_yaml_str("root: [1, 2]").is_err());
    }

    #[test]
    fn test_open_store_creates_when_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            root: dir.path().join("store"),
            create_if_missing: true,
        };
        let store = config.open_store().unwrap();
        assert!(store.is_empty());

        let strict = StoreConfig {
            root: dir.path().join("other"),
            create_if_missing: false,
        };
        assert!(strict.open_store().is_err());
    }
}
