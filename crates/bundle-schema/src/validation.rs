//! Configuration validation utilities.

use crate::config::{read_config_value, schema_violations, AppConfig, ConfigError};
use crate::package::PackageNode;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Validation error type.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Schema validation failed: {0}")]
    SchemaError(String),

    #[error("Missing bundle source")]
    MissingBundleSource,

    #[error("Empty package name at {0}")]
    EmptyName(String),

    #[error("Authority switch without authority source at {0}")]
    SwitchWithoutAuthority(String),

    #[error("Authority switch cannot be a root package: {0}")]
    SwitchAtRoot(String),

    #[error("Working directory {0} contains the source bundle")]
    WorkingDirectoryHoldsSource(String),
}

/// Result of configuration validation.
#[derive(Debug)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Structural checks the JSON schema cannot express.
pub fn validate_config(config: &AppConfig) -> ValidationResult {
    let mut result = ValidationResult::new();
    let app = &config.application;

    if app.bundles_source.trim().is_empty() {
        result.add_error(ValidationError::MissingBundleSource);
    }

    let mut seen = HashSet::new();
    for (i, package) in app.packages.iter().enumerate() {
        let location = format!("packages[{}]", i);

        if package.name.is_empty() {
            result.add_error(ValidationError::EmptyName(location.clone()));
        } else if package.is_authority_switch() {
            result.add_error(ValidationError::SwitchAtRoot(location.clone()));
        } else if !seen.insert(package.name.as_str()) {
            result.add_warning(format!("Duplicate root package: {}", package.name));
        }

        if !package.signature_files.is_empty() {
            result.add_warning(format!(
                "{}: signature files on a root package are only checked through its chain",
                location
            ));
        }

        for (j, child) in package.children_packages.iter().enumerate() {
            let child_location = format!("{}.children_packages[{}]", location, j);
            check_chain_entry(child, j, &child_location, &mut result);
        }
    }

    if app.packages.is_empty() {
        result.add_warning("No packages configured".to_string());
    }

    if let Ok(schema) = config.bundle_schema(None, None) {
        if schema.working_directory_holds_source() {
            result.add_error(ValidationError::WorkingDirectoryHoldsSource(
                schema.working_directory.display().to_string(),
            ));
        }
    }

    result
}

fn check_chain_entry(
    node: &PackageNode,
    position: usize,
    location: &str,
    result: &mut ValidationResult,
) {
    if node.name.is_empty() {
        result.add_error(ValidationError::EmptyName(location.to_string()));
        return;
    }

    if node.is_authority_switch() {
        if node.authority().is_none() {
            result.add_error(ValidationError::SwitchWithoutAuthority(
                location.to_string(),
            ));
        }
        if node.package_dir().is_some() {
            result.add_warning(format!(
                "{}: package_directory is ignored on an authority switch",
                location
            ));
        }
        if position == 0 {
            result.add_warning(format!(
                "{}: authority switch opens the chain; it compares at the root package depth",
                location
            ));
        }
    } else if !node.signature_files.is_empty() && node.authority().is_none() {
        result.add_warning(format!(
            "{}: signature files declared without an authority source are not checked",
            location
        ));
    }

    if !node.children_packages.is_empty() {
        result.add_warning(format!(
            "{}: children of chain entries are ignored; nesting is expressed by chain order",
            location
        ));
    }
}

/// Run schema and structural validation on a configuration file.
pub fn check_config_file(path: &Path) -> Result<ValidationResult, ConfigError> {
    let value = read_config_value(path)?;

    let violations = schema_violations(&value);
    if !violations.is_empty() {
        let mut result = ValidationResult::new();
        for violation in violations {
            result.add_error(ValidationError::SchemaError(violation));
        }
        return Ok(result);
    }

    let config: AppConfig = serde_json::from_value(value)?;
    Ok(validate_config(&config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::AUTHORITY_SWITCH_MARKER;
    use crate::config::{ApplicationConfig, LoggingConfig, NestedFailurePolicy};
    use std::path::PathBuf;

    fn config_with(packages: Vec<PackageNode>) -> AppConfig {
        AppConfig {
            application: ApplicationConfig {
                bundles_source: "release.tar".to_string(),
                source_directory: None,
                working_directory: None,
                enable_colors: false,
                exempt_extensions: vec!["p7s".to_string()],
                nested_failure: NestedFailurePolicy::AbortRun,
                packages,
            },
            logging: LoggingConfig::default(),
            base_dir: PathBuf::new(),
        }
    }

    #[test]
    fn test_valid_chain() {
        let config = config_with(vec![PackageNode::new("app.tgz").with_children(vec![
            PackageNode::new("app.tgz"),
            PackageNode::new("module.tar")
                .with_signature_files(["LICENSE.txt"])
                .with_authority("/trusted/module"),
        ])]);

        let result = validate_config(&config);
        assert!(result.valid, "Errors: {:?}", result.errors);
        assert!(result.warnings.is_empty(), "Warnings: {:?}", result.warnings);
    }

    #[test]
    fn test_switch_without_authority() {
        let config = config_with(vec![PackageNode::new("app.tgz").with_children(vec![
            PackageNode::new("app.tgz"),
            PackageNode::new(AUTHORITY_SWITCH_MARKER).with_signature_files(["NOTICE.txt"]),
        ])]);

        let result = validate_config(&config);
        assert!(!result.valid);
        assert_eq!(
            result.errors,
            vec![ValidationError::SwitchWithoutAuthority(
                "packages[0].children_packages[1]".to_string()
            )]
        );
    }

    #[test]
    fn test_switch_at_root_and_empty_name() {
        let config = config_with(vec![
            PackageNode::new(AUTHORITY_SWITCH_MARKER),
            PackageNode::new(""),
        ]);

        let result = validate_config(&config);
        assert_eq!(result.errors.len(), 2);
        assert!(matches!(result.errors[0], ValidationError::SwitchAtRoot(_)));
        assert!(matches!(result.errors[1], ValidationError::EmptyName(_)));
    }

    #[test]
    fn test_warnings_do_not_invalidate() {
        let config = config_with(vec![
            PackageNode::new("app.tgz").with_children(vec![
                PackageNode::new("app.tgz").with_signature_files(["README"])
            ]),
            PackageNode::new("app.tgz"),
        ]);

        let result = validate_config(&config);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_working_directory_must_not_hold_source() {
        let mut config = config_with(vec![PackageNode::new("app.tgz")]);
        config.application.source_directory = Some(PathBuf::from("/drop"));
        config.application.working_directory = Some(PathBuf::from("/drop"));

        let result = validate_config(&config);
        assert_eq!(
            result.errors,
            vec![ValidationError::WorkingDirectoryHoldsSource(
                "/drop".to_string()
            )]
        );

        config.application.working_directory = Some(PathBuf::from("/drop/work"));
        assert!(validate_config(&config).valid);
    }

    #[test]
    fn test_check_config_file_reports_schema_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "application:\n  bundles_source: 42\n").unwrap();

        let result = check_config_file(&path).unwrap();
        assert!(!result.valid);
        assert!(matches!(result.errors[0], ValidationError::SchemaError(_)));
    }
}
