//! modelver CLI
//!
//! Entry point for the `modelver` command-line tool: registry inspection and
//! maintenance over a model storage root.

use clap::{Parser, Subcommand};
use modelver::hash::hash_path;
use modelver::{LocalModel, ManagerConfig, ModelVersion, RegisterOptions, VersionRegistry};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "modelver")]
#[command(about = "Model version registry and migration tool", version)]
struct Cli {
    /// Storage root holding model artifacts and the registry document
    #[arg(long, short = 's', default_value = ".", global = true)]
    storage_root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a version of a model from its artifact on disk
    Register {
        /// Model identifier
        model_id: String,

        /// Semantic version to register (e.g. 1.2.3)
        version: String,

        /// Path to the artifact (defaults to <storage_root>/<model_id>)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Feature provided by this version (repeatable)
        #[arg(long = "feature")]
        features: Vec<String>,

        /// Dependency as name=version (repeatable)
        #[arg(long = "depend")]
        dependencies: Vec<String>,

        /// Version this release is explicitly compatible with (repeatable)
        #[arg(long = "compatible-with")]
        compatible_with: Vec<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List registered models, or the versions of one model
    List {
        /// Model identifier (omit to list all models)
        model_id: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show one registered version
    Show {
        /// Model identifier
        model_id: String,

        /// Version string
        version: String,
    },

    /// Show the latest registered version of a model
    Latest {
        /// Model identifier
        model_id: String,
    },

    /// Delete a registered version
    Delete {
        /// Model identifier
        model_id: String,

        /// Version string
        version: String,
    },

    /// Check whether one registered version is compatible with another
    CheckCompat {
        src_model: String,
        src_version: String,
        dst_model: String,
        dst_version: String,
    },

    /// Print the content hash of a file or directory
    Hash {
        /// Path to hash
        path: PathBuf,
    },

    /// Re-hash registered artifacts and report content drift
    Verify {
        /// Model identifier (omit to verify every model)
        model_id: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match ManagerConfig::for_storage_root(&cli.storage_root) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Register {
            model_id,
            version,
            path,
            features,
            dependencies,
            compatible_with,
            json,
        } => run_register(
            &config,
            &model_id,
            &version,
            path,
            features,
            dependencies,
            compatible_with,
            json,
        ),
        Commands::List { model_id, json } => run_list(&config, model_id.as_deref(), json),
        Commands::Show { model_id, version } => run_show(&config, &model_id, &version),
        Commands::Latest { model_id } => run_latest(&config, &model_id),
        Commands::Delete { model_id, version } => run_delete(&config, &model_id, &version),
        Commands::CheckCompat {
            src_model,
            src_version,
            dst_model,
            dst_version,
        } => run_check_compat(&config, &src_model, &src_version, &dst_model, &dst_version),
        Commands::Hash { path } => {
            println!("{}", hash_path(&path));
        }
        Commands::Verify { model_id, json } => run_verify(&config, model_id.as_deref(), json),
    }
}

fn open_registry(config: &ManagerConfig) -> VersionRegistry {
    match VersionRegistry::open(config.registry_path()) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Error opening registry: {}", e);
            process::exit(1);
        }
    }
}

fn parse_pairs(pairs: &[String], flag: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for pair in pairs {
        match pair.split_once('=') {
            Some((key, value)) => {
                map.insert(key.to_string(), value.to_string());
            }
            None => {
                eprintln!("Invalid --{} value '{}', expected name=version", flag, pair);
                process::exit(1);
            }
        }
    }
    map
}

#[allow(clippy::too_many_arguments)]
fn run_register(
    config: &ManagerConfig,
    model_id: &str,
    version: &str,
    path: Option<PathBuf>,
    features: Vec<String>,
    dependencies: Vec<String>,
    compatible_with: Vec<String>,
    json: bool,
) {
    let mut registry = open_registry(config);
    let artifact_path = path.unwrap_or_else(|| config.storage_root.join(model_id));
    let info = LocalModel::new(model_id, artifact_path);

    let options = RegisterOptions {
        features: features.into_iter().collect(),
        dependencies: parse_pairs(&dependencies, "depend"),
        compatible_with,
        metadata: BTreeMap::new(),
    };

    match registry.create_version_from_artifact(&info, version, options) {
        Ok(record) => print_version(&record, json),
        Err(e) => {
            eprintln!("Error registering version: {}", e);
            process::exit(1);
        }
    }
}

fn run_list(config: &ManagerConfig, model_id: Option<&str>, json: bool) {
    let registry = open_registry(config);

    match model_id {
        Some(model_id) => {
            let versions = registry.get_all_versions(model_id);
            if json {
                print_json(&json!({
                    "model_id": model_id,
                    "versions": versions
                        .iter()
                        .map(|v| v.version_str())
                        .collect::<Vec<_>>(),
                }));
            } else if versions.is_empty() {
                eprintln!("No versions registered for '{}'", model_id);
                process::exit(1);
            } else {
                for v in versions {
                    println!("{}", v.version_str());
                }
            }
        }
        None => {
            let model_ids = registry.model_ids();
            if json {
                print_json(&json!({ "models": model_ids }));
            } else {
                for model_id in model_ids {
                    let count = registry.get_all_versions(model_id).len();
                    println!("{} ({} versions)", model_id, count);
                }
            }
        }
    }
}

fn run_show(config: &ManagerConfig, model_id: &str, version: &str) {
    let registry = open_registry(config);
    match registry.get_version(model_id, version) {
        Some(record) => print_version(record, true),
        None => {
            eprintln!("Version {} of model '{}' is not registered", version, model_id);
            process::exit(1);
        }
    }
}

fn run_latest(config: &ManagerConfig, model_id: &str) {
    let registry = open_registry(config);
    match registry.get_latest_version(model_id) {
        Some(record) => print_version(record, true),
        None => {
            eprintln!("No versions registered for '{}'", model_id);
            process::exit(1);
        }
    }
}

fn run_delete(config: &ManagerConfig, model_id: &str, version: &str) {
    let mut registry = open_registry(config);
    match registry.delete_version(model_id, version) {
        Ok(true) => println!("Deleted {} {}", model_id, version),
        Ok(false) => {
            eprintln!("Version {} of model '{}' is not registered", version, model_id);
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Error deleting version: {}", e);
            process::exit(1);
        }
    }
}

fn run_check_compat(
    config: &ManagerConfig,
    src_model: &str,
    src_version: &str,
    dst_model: &str,
    dst_version: &str,
) {
    let registry = open_registry(config);
    let compatible = registry.check_compatibility(src_model, src_version, dst_model, dst_version);
    println!("{}", if compatible { "compatible" } else { "incompatible" });
    if !compatible {
        process::exit(1);
    }
}

fn run_verify(config: &ManagerConfig, model_id: Option<&str>, json: bool) {
    let registry = open_registry(config);

    let model_ids: Vec<String> = match model_id {
        Some(model_id) => vec![model_id.to_string()],
        None => registry.model_ids().iter().map(|s| s.to_string()).collect(),
    };

    let mut drifted = 0usize;
    let mut report = Vec::new();

    for model_id in &model_ids {
        let current = hash_path(&config.storage_root.join(model_id));
        for record in registry.get_all_versions(model_id) {
            if record.hash_value.is_empty() {
                continue;
            }
            let matches = record.hash_value == current;
            if !matches {
                drifted += 1;
            }
            report.push(json!({
                "model_id": model_id,
                "version": record.version_str(),
                "recorded": record.hash_value,
                "current": current,
                "matches": matches,
            }));
            if !json {
                println!(
                    "{} {}: {}",
                    model_id,
                    record.version_str(),
                    if matches { "ok" } else { "content drift" }
                );
            }
        }
    }

    if json {
        print_json(&json!({ "checked": report.len(), "drifted": drifted, "report": report }));
    }
    if drifted > 0 {
        process::exit(1);
    }
}

fn print_version(record: &ModelVersion, json: bool) {
    if json {
        print_json(record);
    } else {
        println!("{} {}", record.model_id, record.version_str());
    }
}

fn print_json(value: &impl serde::Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}
