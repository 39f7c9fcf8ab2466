//! Configuration file loading.

use crate::package::{BundleSchema, PackageNode};
use crate::schema;
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Default scratch directory name, created under the source directory.
pub const DEFAULT_WORK_DIR_NAME: &str = ".bundlecheck";

/// Configuration error type.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    #[error("Configuration does not match schema: {}", .0.join("; "))]
    Schema(Vec<String>),

    #[error("No bundle source configured")]
    MissingBundleSource,
}

/// What to do when a nested archive fails to extract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NestedFailurePolicy {
    /// Stop the whole run, abandoning remaining packages.
    #[default]
    AbortRun,
    /// Abandon the rest of the affected root package's chain only.
    SkipPackage,
}

/// Top-level configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub application: ApplicationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// File name of the top-level bundle.
    pub bundles_source: String,
    #[serde(default)]
    pub source_directory: Option<PathBuf>,
    #[serde(default)]
    pub working_directory: Option<PathBuf>,
    #[serde(default = "default_enable_colors")]
    pub enable_colors: bool,
    /// Signature file suffixes that are accepted without comparing content.
    #[serde(default = "default_exempt_extensions")]
    pub exempt_extensions: Vec<String>,
    #[serde(default)]
    pub nested_failure: NestedFailurePolicy,
    #[serde(default)]
    pub packages: Vec<PackageNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Write log output to this file instead of stderr.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_enable_colors() -> bool {
    true
}
fn default_exempt_extensions() -> Vec<String> {
    vec!["p7s".to_string()]
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Read a configuration file into a JSON value, picking the parser by extension.
pub fn read_config_value(path: &Path) -> Result<Value, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "yaml" | "yml" => Ok(serde_yaml::from_str(&content)?),
        "json" => Ok(serde_json::from_str(&content)?),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

/// Check a raw configuration value against the embedded JSON schema.
///
/// Returns one message per violation, empty when the document conforms.
pub fn schema_violations(value: &Value) -> Vec<String> {
    let schema_value = schema::config_schema();
    let compiled = match JSONSchema::compile(&schema_value) {
        Ok(compiled) => compiled,
        Err(e) => return vec![e.to_string()],
    };

    let violations = match compiled.validate(value) {
        Ok(()) => Vec::new(),
        Err(errors) => errors
            .map(|error| format!("{} at {}", error, error.instance_path))
            .collect(),
    };
    violations
}

/// Load and schema-check a configuration file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let value = read_config_value(path)?;

    let violations = schema_violations(&value);
    if !violations.is_empty() {
        return Err(ConfigError::Schema(violations));
    }

    let mut config: AppConfig = serde_json::from_value(value)?;
    config.base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    debug!(
        "Loaded configuration from {:?} ({} root packages)",
        path,
        config.application.packages.len()
    );
    Ok(config)
}

impl AppConfig {
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Build the per-run schema.
    ///
    /// Command-line directories take precedence over configured ones.
    /// Relative configured paths, including authority sources, resolve
    /// against the configuration file's directory.
    pub fn bundle_schema(
        &self,
        bundle_dir: Option<&Path>,
        work_dir: Option<&Path>,
    ) -> Result<BundleSchema, ConfigError> {
        let app = &self.application;
        if app.bundles_source.trim().is_empty() {
            return Err(ConfigError::MissingBundleSource);
        }

        let source_directory = match (bundle_dir, &app.source_directory) {
            (Some(dir), _) => dir.to_path_buf(),
            (None, Some(dir)) => self.resolve(dir),
            (None, None) => self.base_dir.clone(),
        };

        let working_directory = match (work_dir, &app.working_directory) {
            (Some(dir), _) => dir.to_path_buf(),
            (None, Some(dir)) => self.resolve(dir),
            (None, None) => source_directory.join(DEFAULT_WORK_DIR_NAME),
        };

        let packages = app
            .packages
            .iter()
            .map(|node| self.resolve_authorities(node))
            .collect();

        Ok(BundleSchema {
            source_directory,
            working_directory,
            bundle_source: app.bundles_source.clone(),
            packages,
        })
    }

    /// Log file, resolved like the other configured paths.
    pub fn log_file(&self) -> Option<PathBuf> {
        self.logging.file.as_deref().map(|file| self.resolve(file))
    }

    fn resolve_authorities(&self, node: &PackageNode) -> PackageNode {
        let mut resolved = node.clone();
        resolved.authority_source = node.authority().map(|a| self.resolve(a));
        resolved.children_packages = node
            .children_packages
            .iter()
            .map(|child| self.resolve_authorities(child))
            .collect();
        resolved
    }
}
