//! Registry lifecycle tests
//!
//! End-to-end scenarios over the persisted registry document: registration
//! with compatibility overrides, conflict handling across process restarts,
//! and recovery from a corrupt document.

use std::fs;

use modelver::{LocalModel, ModelVersion, RegisterOptions, RegistryError, VersionRegistry};
use serde_json::json;
use tempfile::TempDir;

#[test]
fn test_compatibility_override_scenario() {
    let dir = TempDir::new().unwrap();
    let mut registry = VersionRegistry::open(dir.path().join("model_registry.json")).unwrap();

    registry
        .register_version(
            ModelVersion::new("m", "1.0.0")
                .unwrap()
                .with_features(["gen"]),
        )
        .unwrap();
    registry
        .register_version(
            ModelVersion::new("m", "2.0.0")
                .unwrap()
                .with_compatible(["1.0.0"]),
        )
        .unwrap();

    // The override points from 2.0.0 back to 1.0.0 only.
    assert!(registry.check_compatibility("m", "2.0.0", "m", "1.0.0"));
    assert!(!registry.check_compatibility("m", "1.0.0", "m", "2.0.0"));
}

#[test]
fn test_registry_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("model_registry.json");

    {
        let mut registry = VersionRegistry::open(&path).unwrap();
        let artifact = dir.path().join("bert-base");
        fs::write(&artifact, "weights-v1").unwrap();

        let info = LocalModel::new("bert-base", &artifact);
        registry
            .create_version_from_artifact(&info, "1.0.0", RegisterOptions::default())
            .unwrap();
        registry
            .register_version(ModelVersion::new("bert-base", "1.1.0").unwrap())
            .unwrap();
    }

    let mut reopened = VersionRegistry::open(&path).unwrap();

    assert_eq!(
        reopened
            .get_latest_version("bert-base")
            .unwrap()
            .version_str(),
        "1.1.0"
    );
    let recorded = reopened.get_version("bert-base", "1.0.0").unwrap();
    assert!(!recorded.hash_value.is_empty());

    // A conflicting re-registration after restart is still rejected.
    let conflicting = ModelVersion::new("bert-base", "1.0.0")
        .unwrap()
        .with_hash("0000");
    let err = reopened.register_version(conflicting).unwrap_err();
    assert!(matches!(err, RegistryError::ContentConflict { .. }));
}

#[test]
fn test_corrupt_document_recovery() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("model_registry.json");
    fs::write(&path, "{\"m\": {\"1.0.0\": {\"version\"").unwrap();

    let mut registry = VersionRegistry::open(&path).unwrap();
    assert!(registry.get_version("m", "1.0.0").is_none());

    // The rewritten document is valid JSON and usable again.
    let rewritten: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(rewritten, json!({}));

    registry
        .register_version(ModelVersion::new("m", "1.0.0").unwrap())
        .unwrap();
    let reopened = VersionRegistry::open(&path).unwrap();
    assert!(reopened.get_version("m", "1.0.0").is_some());
}

#[test]
fn test_directory_artifact_registration_and_drift() {
    let dir = TempDir::new().unwrap();
    let model_dir = dir.path().join("bundle");
    fs::create_dir(&model_dir).unwrap();
    fs::write(model_dir.join("weights.bin"), "weights").unwrap();
    fs::write(model_dir.join("config.json"), "{}").unwrap();

    let mut registry = VersionRegistry::open(dir.path().join("model_registry.json")).unwrap();
    let info = LocalModel::new("bundle", &model_dir);

    let recorded = registry
        .create_version_from_artifact(&info, "1.0.0", RegisterOptions::default())
        .unwrap();
    assert_eq!(recorded.hash_value, modelver::hash::hash_tree(&model_dir));

    // Editing a file inside the bundle changes the current hash but not the
    // recorded one.
    fs::write(model_dir.join("weights.bin"), "weights-v2").unwrap();
    assert_ne!(recorded.hash_value, modelver::hash::hash_tree(&model_dir));
    assert_eq!(
        registry.get_version("bundle", "1.0.0").unwrap().hash_value,
        recorded.hash_value
    );
}
