//! Collaborator seams: model descriptors and the loader boundary.
//!
//! The registry and migration tooling operate on a caller-owned model
//! descriptor and hand actual binary loading to a caller-supplied
//! [`ModelLoader`]. Nothing in this crate interprets model contents.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Options forwarded verbatim to a loader.
pub type LoadOptions = BTreeMap<String, Value>;

/// A caller-owned description of one model on disk.
///
/// The crate reads the identifier and storage path, and updates the recorded
/// version after a successful registration or migration; it never mutates the
/// descriptor otherwise.
pub trait ModelDescriptor {
    /// Identifier of the model.
    fn model_id(&self) -> &str;

    /// Path to the model's backing storage (a file or a directory).
    fn storage_path(&self) -> &Path;

    /// Record the version this descriptor now corresponds to.
    fn set_version(&mut self, version: &str);
}

/// Loads model binaries into runtime memory.
///
/// Implemented by the owning application; invoked by
/// [`crate::manager::VersionedModelManager::load_model_version`] after any
/// integrity drift has been logged.
pub trait ModelLoader {
    /// Opaque handle to a loaded model.
    type Handle;

    fn load(&self, model_id: &str, options: &LoadOptions) -> Result<Self::Handle, LoadError>;
}

/// Error from a loader implementation.
#[derive(Debug, thiserror::Error)]
#[error("failed to load model '{model_id}': {message}")]
pub struct LoadError {
    pub model_id: String,
    pub message: String,
}

impl LoadError {
    pub fn new(model_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            message: message.into(),
        }
    }
}

/// A plain on-disk model descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalModel {
    /// Identifier of the model.
    pub model_id: String,

    /// Path to the backing file or directory.
    pub path: PathBuf,

    /// Version this descriptor currently corresponds to, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl LocalModel {
    pub fn new(model_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            model_id: model_id.into(),
            path: path.into(),
            version: None,
        }
    }
}

impl ModelDescriptor for LocalModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn storage_path(&self) -> &Path {
        &self.path
    }

    fn set_version(&mut self, version: &str) {
        self.version = Some(version.to_string());
    }
}
