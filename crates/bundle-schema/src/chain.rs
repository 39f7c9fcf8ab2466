//! Typed chain steps.
//!
//! Configuration files mark an authority change with a reserved entry name.
//! That marker is turned into a dedicated variant here so nothing past the
//! configuration boundary compares names against it.

use crate::package::PackageNode;
use std::path::{Path, PathBuf};

/// Reserved chain entry name that switches the authority source.
pub const AUTHORITY_SWITCH_MARKER: &str = "AUTHORITY_SOURCE_CHANGED";

/// A chain entry after the authority marker has been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainStep {
    /// A nested archive, one level deeper than the previous step.
    Extraction(ExtractionStep),
    /// Compare more files at the current depth against another authority.
    AuthoritySwitch(AuthoritySwitch),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionStep {
    pub name: String,
    pub authority_source: Option<PathBuf>,
    pub signature_files: Vec<String>,
    pub package_directory: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthoritySwitch {
    pub authority_source: Option<PathBuf>,
    pub signature_files: Vec<String>,
}

impl From<&PackageNode> for ChainStep {
    fn from(node: &PackageNode) -> Self {
        if node.is_authority_switch() {
            ChainStep::AuthoritySwitch(AuthoritySwitch {
                authority_source: node.authority().map(Path::to_path_buf),
                signature_files: node.signature_files.clone(),
            })
        } else {
            ChainStep::Extraction(ExtractionStep {
                name: node.name.clone(),
                authority_source: node.authority().map(Path::to_path_buf),
                signature_files: node.signature_files.clone(),
                package_directory: node.package_dir().map(str::to_string),
            })
        }
    }
}

impl ChainStep {
    /// Convert a node's children into typed steps.
    pub fn chain_of(node: &PackageNode) -> Vec<ChainStep> {
        node.children_packages.iter().map(ChainStep::from).collect()
    }

    /// Label used in log output.
    pub fn label(&self) -> &str {
        match self {
            ChainStep::Extraction(step) => &step.name,
            ChainStep::AuthoritySwitch(_) => AUTHORITY_SWITCH_MARKER,
        }
    }

    /// Authority and signature files, when this step verifies anything.
    pub fn verification(&self) -> Option<(&Path, &[String])> {
        match self {
            ChainStep::Extraction(step) if !step.name.is_empty() => step
                .authority_source
                .as_deref()
                .map(|a| (a, step.signature_files.as_slice())),
            ChainStep::Extraction(_) => None,
            ChainStep::AuthoritySwitch(switch) => switch
                .authority_source
                .as_deref()
                .map(|a| (a, switch.signature_files.as_slice())),
        }
    }

    pub fn is_authority_switch(&self) -> bool {
        matches!(self, ChainStep::AuthoritySwitch(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_becomes_switch() {
        let node = PackageNode::new("Authority_Source_Changed")
            .with_authority("/trusted/other")
            .with_signature_files(["NOTICE.txt"])
            .with_package_directory("ignored");

        let step = ChainStep::from(&node);
        assert_eq!(
            step,
            ChainStep::AuthoritySwitch(AuthoritySwitch {
                authority_source: Some(PathBuf::from("/trusted/other")),
                signature_files: vec!["NOTICE.txt".to_string()],
            })
        );
        assert_eq!(step.label(), AUTHORITY_SWITCH_MARKER);
    }

    #[test]
    fn test_regular_node_becomes_extraction() {
        let node = PackageNode::new("module.tar").with_package_directory("lib");
        match ChainStep::from(&node) {
            ChainStep::Extraction(step) => {
                assert_eq!(step.name, "module.tar");
                assert_eq!(step.package_directory.as_deref(), Some("lib"));
            }
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn test_verification_needs_authority() {
        let plain = ChainStep::from(&PackageNode::new("a.tgz").with_signature_files(["x"]));
        assert!(plain.verification().is_none());

        let checked = ChainStep::from(
            &PackageNode::new("a.tgz")
                .with_authority("/trusted")
                .with_signature_files(["x"]),
        );
        let (authority, files) = checked.verification().unwrap();
        assert_eq!(authority, Path::new("/trusted"));
        assert_eq!(files, ["x".to_string()]);
    }

    #[test]
    fn test_chain_of_preserves_order() {
        let root = PackageNode::new("app.tgz").with_children(vec![
            PackageNode::new("app.tgz"),
            PackageNode::new("module.tar"),
            PackageNode::new(AUTHORITY_SWITCH_MARKER),
        ]);
        let labels: Vec<_> = ChainStep::chain_of(&root)
            .iter()
            .map(|s| s.label().to_string())
            .collect();
        assert_eq!(labels, ["app.tgz", "module.tar", AUTHORITY_SWITCH_MARKER]);
    }
}
