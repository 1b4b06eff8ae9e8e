//! Facade composing the registry and migration tooling over one storage root.
//!
//! An owning application constructs one [`VersionedModelManager`] per model
//! storage directory. Artifacts live at `<storage_root>/<model_id>`; loading
//! the binary itself is delegated to the caller's [`ModelLoader`].

use std::path::{Path, PathBuf};
use tracing::warn;

use crate::config::ManagerConfig;
use crate::hash::hash_path;
use crate::migration::{MigrationError, MigrationFn, MigrationOptions, MigrationTool};
use crate::model::{LoadError, LoadOptions, ModelDescriptor, ModelLoader};
use crate::registry::{RegisterOptions, RegistryError, VersionRegistry};
use crate::version::ModelVersion;

/// Errors from manager operations.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("model '{model_id}' has no registered versions")]
    UnknownModel { model_id: String },

    #[error("version {version} of model '{model_id}' is not registered")]
    UnknownVersion { model_id: String, version: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Registry plus migration tooling for the models under one storage root.
pub struct VersionedModelManager<D, L> {
    storage_root: PathBuf,
    registry: VersionRegistry,
    migrations: MigrationTool<D>,
    loader: L,
}

impl<D, L> VersionedModelManager<D, L>
where
    D: ModelDescriptor,
    L: ModelLoader,
{
    /// Create a manager over `config.storage_root`, opening (or creating) the
    /// registry document it names.
    pub fn new(config: &ManagerConfig, loader: L) -> Result<Self, ManagerError> {
        let registry = VersionRegistry::open(config.registry_path())?;

        Ok(Self {
            storage_root: config.storage_root.clone(),
            registry,
            migrations: MigrationTool::new(),
            loader,
        })
    }

    /// The registry backing this manager.
    pub fn registry(&self) -> &VersionRegistry {
        &self.registry
    }

    /// Where a model's artifact is stored.
    pub fn model_path(&self, model_id: &str) -> PathBuf {
        self.storage_root.join(model_id)
    }

    /// Root directory holding all model artifacts.
    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    /// Hash the descriptor's storage, register the version, and stamp the
    /// descriptor with it.
    pub fn register_model_version(
        &mut self,
        info: &mut D,
        version: &str,
        options: RegisterOptions,
    ) -> Result<ModelVersion, ManagerError> {
        let record = self
            .registry
            .create_version_from_artifact(info, version, options)?;
        info.set_version(&record.version_str());
        Ok(record)
    }

    /// Look up a specific version, or the latest when `version` is `None`.
    pub fn get_model_version(&self, model_id: &str, version: Option<&str>) -> Option<&ModelVersion> {
        match version {
            Some(version) => self.registry.get_version(model_id, version),
            None => self.registry.get_latest_version(model_id),
        }
    }

    /// Load a model at a specific (or the latest) version.
    ///
    /// When the resolved version carries a content hash and the artifact's
    /// current hash differs, a warning is logged; the load proceeds
    /// regardless. Drift detection is best-effort, not an enforcement gate.
    pub fn load_model_version(
        &self,
        model_id: &str,
        version: Option<&str>,
        options: &LoadOptions,
    ) -> Result<L::Handle, ManagerError> {
        let resolved =
            self.get_model_version(model_id, version)
                .ok_or_else(|| match version {
                    Some(version) => ManagerError::UnknownVersion {
                        model_id: model_id.to_string(),
                        version: version.to_string(),
                    },
                    None => ManagerError::UnknownModel {
                        model_id: model_id.to_string(),
                    },
                })?;

        if !resolved.hash_value.is_empty() {
            let current = hash_path(&self.model_path(model_id));
            if current != resolved.hash_value {
                warn!(
                    model_id,
                    version = %resolved.version,
                    "content hash differs from the recorded version; the model \
                     may have been modified since this version was recorded"
                );
            }
        }

        Ok(self.loader.load(model_id, options)?)
    }

    /// Register a migration function for one of this manager's models.
    pub fn register_migration(
        &mut self,
        model_id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        func: MigrationFn<D>,
    ) {
        self.migrations.register_migration(model_id, from, to, func);
    }

    /// Whether registered migrations connect the two versions.
    pub fn can_migrate(&self, model_id: &str, from: &str, to: &str) -> bool {
        self.migrations.can_migrate(model_id, from, to)
    }

    /// Migrate a model from its latest registered version to `target`.
    ///
    /// Returns the descriptor unchanged when the latest version already
    /// equals the target; otherwise runs the migration chain and stamps the
    /// descriptor with the target version.
    pub fn migrate_model(
        &self,
        info: D,
        target: &str,
        options: &MigrationOptions,
    ) -> Result<D, ManagerError> {
        let model_id = info.model_id().to_string();
        let latest = self
            .registry
            .get_latest_version(&model_id)
            .ok_or(ManagerError::UnknownModel {
                model_id: model_id.clone(),
            })?;
        let current = latest.version_str();

        if current == target {
            return Ok(info);
        }

        let mut migrated = self.migrations.migrate(info, &current, target, options)?;
        migrated.set_version(target);
        Ok(migrated)
    }

    /// Passthrough to [`VersionRegistry::check_compatibility`].
    pub fn check_compatibility(
        &self,
        src_model: &str,
        src_version: &str,
        dst_model: &str,
        dst_version: &str,
    ) -> bool {
        self.registry
            .check_compatibility(src_model, src_version, dst_model, dst_version)
    }
}
