//! Configuration model for bundlecheck.
//!
//! This crate defines the package chain that describes a nested bundle,
//! the per-run `BundleSchema`, and loading/validation of the configuration
//! file that produces them.

pub mod chain;
pub mod config;
pub mod package;
pub mod schema;
pub mod validation;

pub use chain::{AuthoritySwitch, ChainStep, ExtractionStep, AUTHORITY_SWITCH_MARKER};
pub use config::{
    load_config, AppConfig, ApplicationConfig, ConfigError, LoggingConfig, NestedFailurePolicy,
};
pub use package::{BundleSchema, PackageNode};
pub use validation::{check_config_file, validate_config, ValidationError, ValidationResult};
