//! Model version records and compatibility rules.
//!
//! A [`ModelVersion`] describes one release of one model: its semantic
//! version, content hash, feature set, dependencies, and declared
//! compatibility overrides. Records are immutable once registered.

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Errors from version construction.
#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    #[error("invalid semantic version '{input}': {source}")]
    InvalidSemver {
        input: String,
        #[source]
        source: semver::Error,
    },
}

/// One release of one model.
///
/// Identity is `(version, model_id)`; hash, features, and metadata describe
/// the release but do not participate in equality. Ordering follows semantic
/// version precedence so that a descending sort puts the latest release first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelVersion {
    /// Semantic version of this release.
    pub version: Version,

    /// Identifier of the model this release belongs to.
    pub model_id: String,

    /// When this version record was created.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    /// Hex SHA-256 of the model's on-disk content, or empty if not computed.
    #[serde(default)]
    pub hash_value: String,

    /// Feature names this release provides.
    #[serde(default)]
    pub features: BTreeSet<String>,

    /// Dependency name -> version requirement.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    /// Version strings this release declares itself compatible with,
    /// overriding the major-version rule.
    #[serde(default, rename = "is_compatible_with")]
    pub compatible_with: Vec<String>,

    /// Open key/value metadata attached by the caller.
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl ModelVersion {
    /// Create a version record for `model_id`, validating the version string.
    pub fn new(model_id: impl Into<String>, version: &str) -> Result<Self, VersionError> {
        let parsed = Version::parse(version).map_err(|source| VersionError::InvalidSemver {
            input: version.to_string(),
            source,
        })?;

        Ok(Self {
            version: parsed,
            model_id: model_id.into(),
            timestamp: Utc::now(),
            hash_value: String::new(),
            features: BTreeSet::new(),
            dependencies: BTreeMap::new(),
            compatible_with: Vec::new(),
            metadata: BTreeMap::new(),
        })
    }

    /// Set the content hash.
    pub fn with_hash(mut self, hash_value: impl Into<String>) -> Self {
        self.hash_value = hash_value.into();
        self
    }

    /// Set the feature set.
    pub fn with_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features = features.into_iter().map(Into::into).collect();
        self
    }

    /// Set the dependency map.
    pub fn with_dependencies(mut self, dependencies: BTreeMap<String, String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Set the explicit compatibility overrides.
    pub fn with_compatible<I, S>(mut self, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compatible_with = versions.into_iter().map(Into::into).collect();
        self
    }

    /// Set the metadata map.
    pub fn with_metadata(mut self, metadata: BTreeMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Major component of the semantic version.
    pub fn major(&self) -> u64 {
        self.version.major
    }

    /// Minor component of the semantic version.
    pub fn minor(&self) -> u64 {
        self.version.minor
    }

    /// Patch component of the semantic version.
    pub fn patch(&self) -> u64 {
        self.version.patch
    }

    /// The version as its canonical string form.
    pub fn version_str(&self) -> String {
        self.version.to_string()
    }

    /// Whether this release is compatible with `other`.
    ///
    /// An explicit entry in the override list wins unconditionally; otherwise
    /// two releases are compatible iff their major versions match. The
    /// relation is not symmetric: an override declared on one side does not
    /// imply the reverse direction.
    pub fn is_compatible_with(&self, other: &ModelVersion) -> bool {
        self.compatible_with_version(&other.version.to_string())
    }

    /// Compatibility check against a raw version string.
    ///
    /// The override list is matched literally before parsing, so an
    /// unparseable string can still be declared compatible; absent an
    /// override, an unparseable string is incompatible.
    pub fn compatible_with_version(&self, other: &str) -> bool {
        if self.compatible_with.iter().any(|v| v == other) {
            return true;
        }

        match Version::parse(other) {
            Ok(parsed) => self.version.major == parsed.major,
            Err(_) => false,
        }
    }
}

impl PartialEq for ModelVersion {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version && self.model_id == other.model_id
    }
}

impl Eq for ModelVersion {}

impl PartialOrd for ModelVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ModelVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // Semantic version precedence; model_id only breaks ties so the
        // order stays consistent with equality.
        self.version
            .cmp(&other.version)
            .then_with(|| self.model_id.cmp(&other.model_id))
    }
}
