//! Manager configuration: built-in defaults plus an optional TOML file layer.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Default name of the registry document inside the storage root.
pub const DEFAULT_REGISTRY_FILE: &str = "model_registry.json";

/// Default name of the optional config file inside the storage root.
pub const CONFIG_FILE_NAME: &str = "modelver.toml";

/// Errors from configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Settings for one storage root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Directory holding all model artifacts (and, by default, the registry
    /// document).
    pub storage_root: PathBuf,

    /// Registry document name, relative to the storage root.
    #[serde(default = "default_registry_file")]
    pub registry_file: String,
}

fn default_registry_file() -> String {
    DEFAULT_REGISTRY_FILE.to_string()
}

impl ManagerConfig {
    /// Built-in defaults for a storage root.
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            registry_file: default_registry_file(),
        }
    }

    /// Full path of the registry document.
    pub fn registry_path(&self) -> PathBuf {
        self.storage_root.join(&self.registry_file)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `modelver.toml` from the storage root if present, otherwise fall
    /// back to defaults for that root.
    pub fn for_storage_root(storage_root: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let storage_root = storage_root.into();
        let config_path = storage_root.join(CONFIG_FILE_NAME);

        if config_path.is_file() {
            Self::from_file(&config_path)
        } else {
            Ok(Self::new(storage_root))
        }
    }
}
