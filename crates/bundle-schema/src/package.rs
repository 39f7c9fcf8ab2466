//! Package chain types.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One entry in a configured package chain.
///
/// The order of `children_packages` encodes nesting depth: every entry is an
/// archive found inside the extracted output of the entry before it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageNode {
    /// Archive or file name at this nesting level.
    pub name: String,
    /// Nested archives, outermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children_packages: Vec<PackageNode>,
    /// Files compared against the authority source at this level.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signature_files: Vec<String>,
    /// Subdirectory of the extracted output holding the signature files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_directory: Option<String>,
    /// Trusted root holding canonical copies of the signature files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority_source: Option<PathBuf>,
}

impl PackageNode {
    /// Create a node with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_children(mut self, children: Vec<PackageNode>) -> Self {
        self.children_packages = children;
        self
    }

    pub fn with_signature_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.signature_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_authority(mut self, authority: impl Into<PathBuf>) -> Self {
        self.authority_source = Some(authority.into());
        self
    }

    pub fn with_package_directory(mut self, directory: impl Into<String>) -> Self {
        self.package_directory = Some(directory.into());
        self
    }

    /// Authority source, treating an empty path as absent.
    pub fn authority(&self) -> Option<&Path> {
        self.authority_source
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// Package directory, treating an empty string as absent.
    pub fn package_dir(&self) -> Option<&str> {
        self.package_directory.as_deref().filter(|d| !d.is_empty())
    }

    /// A node takes part in verification only with both a name and an authority.
    pub fn is_verifiable(&self) -> bool {
        !self.name.is_empty() && self.authority().is_some()
    }

    /// Check if the node is the authority switch marker.
    pub fn is_authority_switch(&self) -> bool {
        self.name
            .eq_ignore_ascii_case(crate::chain::AUTHORITY_SWITCH_MARKER)
    }
}

/// Per-run context handed to the verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleSchema {
    /// Directory holding the top-level bundle.
    pub source_directory: PathBuf,
    /// Scratch root for progressive extraction.
    pub working_directory: PathBuf,
    /// File name of the top-level bundle.
    pub bundle_source: String,
    /// Root packages expected inside the top-level bundle.
    pub packages: Vec<PackageNode>,
}

impl BundleSchema {
    /// Full path of the top-level bundle.
    pub fn source_path(&self) -> PathBuf {
        self.source_directory.join(&self.bundle_source)
    }

    /// Whether the top-level bundle lives inside the working directory, so
    /// removing the working directory would delete the input.
    ///
    /// Existing paths are compared canonically, others as written.
    pub fn working_directory_holds_source(&self) -> bool {
        let working = canonical_or_raw(&self.working_directory);
        canonical_or_raw(&self.source_path()).starts_with(working)
    }
}

fn canonical_or_raw(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
