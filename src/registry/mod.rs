//! Persistent store of all known versions for all models.
//!
//! State is a `model_id -> version string -> ModelVersion` map, serialized to
//! a single JSON document after every mutation. A missing or corrupt document
//! is treated as an empty registry and rewritten; conflicting registrations
//! are rejected without touching state.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::hash::hash_path;
use crate::model::ModelDescriptor;
use crate::version::{ModelVersion, VersionError};

/// Errors from registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("version {version} of model '{model_id}' already exists with different content")]
    ContentConflict { model_id: String, version: String },

    #[error("version {version} of model '{model_id}' already exists with different features")]
    FeatureConflict { model_id: String, version: String },

    #[error("version {version} of model '{model_id}' already exists with different metadata")]
    MetadataConflict { model_id: String, version: String },

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Optional attributes for a version created from an artifact.
#[derive(Debug, Clone, Default)]
pub struct RegisterOptions {
    pub features: BTreeSet<String>,
    pub dependencies: BTreeMap<String, String>,
    pub compatible_with: Vec<String>,
    pub metadata: BTreeMap<String, Value>,
}

/// On-disk-backed store of model versions.
///
/// Not internally synchronized; a multi-threaded embedder must serialize
/// mutating calls, as each save is a full rewrite of the document.
#[derive(Debug)]
pub struct VersionRegistry {
    registry_path: PathBuf,
    versions: BTreeMap<String, BTreeMap<String, ModelVersion>>,
}

impl VersionRegistry {
    /// Open the registry backed by the JSON document at `registry_path`.
    ///
    /// The parent directory is created if absent. A missing or unparseable
    /// document starts the registry empty and rewrites the file.
    pub fn open(registry_path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let registry_path = registry_path.into();

        if let Some(parent) = registry_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let versions = match fs::read_to_string(&registry_path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(versions) => versions,
                Err(err) => {
                    warn!(
                        path = %registry_path.display(),
                        error = %err,
                        "registry document is corrupt; starting empty"
                    );
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };

        let registry = Self {
            registry_path,
            versions,
        };
        registry.save()?;
        Ok(registry)
    }

    /// Path of the backing JSON document.
    pub fn registry_path(&self) -> &Path {
        &self.registry_path
    }

    /// Register a version.
    ///
    /// Re-registering an identical record is an idempotent no-op. A record
    /// that differs in content hash, features, or metadata from the one
    /// already stored under the same `(model_id, version)` key is rejected
    /// and the stored entry is left intact.
    pub fn register_version(&mut self, version: ModelVersion) -> Result<(), RegistryError> {
        let version_str = version.version_str();

        if let Some(existing) = self
            .versions
            .get(&version.model_id)
            .and_then(|m| m.get(&version_str))
        {
            if existing.hash_value != version.hash_value {
                return Err(RegistryError::ContentConflict {
                    model_id: version.model_id,
                    version: version_str,
                });
            }
            if existing.features != version.features {
                return Err(RegistryError::FeatureConflict {
                    model_id: version.model_id,
                    version: version_str,
                });
            }
            if existing.metadata != version.metadata {
                return Err(RegistryError::MetadataConflict {
                    model_id: version.model_id,
                    version: version_str,
                });
            }

            debug!(
                model_id = %version.model_id,
                version = %version_str,
                "version already registered; nothing to do"
            );
            return Ok(());
        }

        info!(model_id = %version.model_id, version = %version_str, "registering version");
        self.versions
            .entry(version.model_id.clone())
            .or_default()
            .insert(version_str, version);
        self.save()
    }

    /// Look up one version of one model.
    pub fn get_version(&self, model_id: &str, version: &str) -> Option<&ModelVersion> {
        self.versions.get(model_id)?.get(version)
    }

    /// The highest registered version of a model, by semantic-version order.
    pub fn get_latest_version(&self, model_id: &str) -> Option<&ModelVersion> {
        self.versions
            .get(model_id)?
            .values()
            .max_by(|a, b| a.version.cmp(&b.version))
    }

    /// All versions of a model, newest first.
    pub fn get_all_versions(&self, model_id: &str) -> Vec<&ModelVersion> {
        let mut versions: Vec<&ModelVersion> = self
            .versions
            .get(model_id)
            .map(|m| m.values().collect())
            .unwrap_or_default();
        versions.sort_by(|a, b| b.version.cmp(&a.version));
        versions
    }

    /// Model ids with at least one registered version.
    pub fn model_ids(&self) -> Vec<&str> {
        self.versions.keys().map(String::as_str).collect()
    }

    /// Remove a version, pruning the model's entry when it becomes empty.
    ///
    /// Returns whether anything was removed.
    pub fn delete_version(&mut self, model_id: &str, version: &str) -> Result<bool, RegistryError> {
        let Some(model_versions) = self.versions.get_mut(model_id) else {
            return Ok(false);
        };

        if model_versions.remove(version).is_none() {
            return Ok(false);
        }
        if model_versions.is_empty() {
            self.versions.remove(model_id);
        }

        info!(model_id, version, "deleted version");
        self.save()?;
        Ok(true)
    }

    /// Whether `src` is compatible with `dst`.
    ///
    /// False when either side is not registered. Within one model this
    /// delegates to [`ModelVersion::is_compatible_with`]; across models it
    /// falls through to [`Self::cross_model_compatible`].
    pub fn check_compatibility(
        &self,
        src_model: &str,
        src_version: &str,
        dst_model: &str,
        dst_version: &str,
    ) -> bool {
        let (Some(src), Some(dst)) = (
            self.get_version(src_model, src_version),
            self.get_version(dst_model, dst_version),
        ) else {
            return false;
        };

        if src_model == dst_model {
            src.is_compatible_with(dst)
        } else {
            self.cross_model_compatible(src, dst)
        }
    }

    /// Extension hook for compatibility between versions of different models.
    ///
    /// No cross-model relation is defined today, so this always answers
    /// false. Override semantics would be decided by the embedding
    /// application before this is opened up.
    fn cross_model_compatible(&self, _src: &ModelVersion, _dst: &ModelVersion) -> bool {
        false
    }

    /// Hash a model's backing storage, build a version record, and register it.
    pub fn create_version_from_artifact(
        &mut self,
        info: &impl ModelDescriptor,
        version: &str,
        options: RegisterOptions,
    ) -> Result<ModelVersion, RegistryError> {
        let hash_value = hash_path(info.storage_path());

        let record = ModelVersion::new(info.model_id(), version)?
            .with_hash(hash_value)
            .with_features(options.features)
            .with_dependencies(options.dependencies)
            .with_compatible(options.compatible_with)
            .with_metadata(options.metadata);

        self.register_version(record.clone())?;
        Ok(record)
    }

    /// Rewrite the whole document, via a temp file so a crash cannot
    /// truncate it.
    fn save(&self) -> Result<(), RegistryError> {
        let json = serde_json::to_string_pretty(&self.versions)?;

        let temp_path = self.registry_path.with_extension("tmp");
        fs::write(&temp_path, &json)?;
        fs::rename(&temp_path, &self.registry_path)?;

        Ok(())
    }
}
