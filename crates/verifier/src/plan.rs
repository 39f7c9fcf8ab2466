//! Path resolution for package chains.
//!
//! A root package's chain is resolved up front into a list of steps with
//! concrete archive, destination and comparison paths. Resolution touches no
//! filesystem state, so the same package always yields the same plan.

use crate::archive::{destination_name, ArchiveFormat};
use bundlecheck_schema::{ChainStep, PackageNode};
use std::path::{Path, PathBuf};

/// One archive to extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub archive: PathBuf,
    pub destination: PathBuf,
    /// `None` lets the extractor infer the format from the archive name.
    pub format: Option<ArchiveFormat>,
}

/// Signature files to compare in one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub directory: PathBuf,
    pub authority: PathBuf,
    pub files: Vec<String>,
}

/// A chain entry with its paths resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStep {
    pub label: String,
    pub authority_switch: bool,
    pub extraction: Option<Extraction>,
    pub verification: Option<Verification>,
}

/// Resolved chain for one root package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainPlan {
    pub package: String,
    /// Extraction of the root package archive itself.
    pub root: Extraction,
    pub steps: Vec<ResolvedStep>,
}

/// Resolve a root package's chain relative to the working directory.
///
/// - The root package archive extracts into `<working>/<name>.dir`.
/// - The first chain entry verifies at that directory and extracts nothing.
/// - Each later extraction entry's archive lives in the previous level's
///   directory and extracts into a sibling `.dir` folder there.
/// - An authority switch verifies at the current level and leaves it unchanged.
/// - A `package_directory` is joined once onto the step's destination when the
///   step verifies files; the joined path is also the parent of the next level.
pub fn resolve_chain(working_directory: &Path, package: &PackageNode) -> ChainPlan {
    let root_destination = working_directory.join(destination_name(&package.name));
    let root = Extraction {
        archive: working_directory.join(&package.name),
        destination: root_destination.clone(),
        format: None,
    };

    let mut level = root_destination;
    let mut steps = Vec::with_capacity(package.children_packages.len());

    for (index, step) in ChainStep::chain_of(package).iter().enumerate() {
        let resolved = match step {
            ChainStep::Extraction(entry) => {
                let extraction = (index > 0).then(|| Extraction {
                    archive: level.join(&entry.name),
                    destination: level.join(destination_name(&entry.name)),
                    format: None,
                });
                let destination = extraction
                    .as_ref()
                    .map(|e| e.destination.clone())
                    .unwrap_or_else(|| level.clone());

                let verification =
                    verification_at(step, &destination, entry.package_directory.as_deref());
                level = verification
                    .as_ref()
                    .map(|v| v.directory.clone())
                    .unwrap_or(destination);

                ResolvedStep {
                    label: entry.name.clone(),
                    authority_switch: false,
                    extraction,
                    verification,
                }
            }
            ChainStep::AuthoritySwitch(_) => ResolvedStep {
                label: step.label().to_string(),
                authority_switch: true,
                extraction: None,
                verification: verification_at(step, &level, None),
            },
        };
        steps.push(resolved);
    }

    ChainPlan {
        package: package.name.clone(),
        root,
        steps,
    }
}

fn verification_at(
    step: &ChainStep,
    destination: &Path,
    package_directory: Option<&str>,
) -> Option<Verification> {
    let (authority, files) = step.verification()?;
    if files.is_empty() {
        return None;
    }

    let directory = match package_directory {
        Some(dir) => destination.join(dir),
        None => destination.to_path_buf(),
    };

    Some(Verification {
        directory,
        authority: authority.to_path_buf(),
        files: files.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundlecheck_schema::AUTHORITY_SWITCH_MARKER;
    use pretty_assertions::assert_eq;

    fn work() -> PathBuf {
        PathBuf::from("/work")
    }

    #[test]
    fn test_root_and_first_entry() {
        let package = PackageNode::new("app.tgz").with_children(vec![PackageNode::new("app.tgz")
            .with_signature_files(["README"])
            .with_authority("/trusted/app")]);

        let plan = resolve_chain(&work(), &package);
        assert_eq!(
            plan.root,
            Extraction {
                archive: PathBuf::from("/work/app.tgz"),
                destination: PathBuf::from("/work/app.dir"),
                format: None,
            }
        );
        assert_eq!(plan.steps[0].extraction, None);
        assert_eq!(
            plan.steps[0].verification.as_ref().unwrap().directory,
            PathBuf::from("/work/app.dir")
        );
    }

    #[test]
    fn test_nested_levels() {
        let package = PackageNode::new("app.tgz").with_children(vec![
            PackageNode::new("app.tgz"),
            PackageNode::new("module.tar")
                .with_signature_files(["LICENSE.txt"])
                .with_authority("/trusted/module"),
            PackageNode::new("inner.tgz"),
        ]);

        let plan = resolve_chain(&work(), &package);
        let module = &plan.steps[1];
        assert_eq!(
            module.extraction,
            Some(Extraction {
                archive: PathBuf::from("/work/app.dir/module.tar"),
                destination: PathBuf::from("/work/app.dir/module.dir"),
                format: None,
            })
        );
        assert_eq!(
            module.verification,
            Some(Verification {
                directory: PathBuf::from("/work/app.dir/module.dir"),
                authority: PathBuf::from("/trusted/module"),
                files: vec!["LICENSE.txt".to_string()],
            })
        );

        let inner = plan.steps[2].extraction.as_ref().unwrap();
        assert_eq!(inner.archive, PathBuf::from("/work/app.dir/module.dir/inner.tgz"));
        assert_eq!(
            inner.destination,
            PathBuf::from("/work/app.dir/module.dir/inner.dir")
        );
        assert_eq!(plan.steps[2].verification, None);
    }

    #[test]
    fn test_authority_switch_keeps_level() {
        let package = PackageNode::new("app.tgz").with_children(vec![
            PackageNode::new("app.tgz"),
            PackageNode::new("module.tar")
                .with_signature_files(["LICENSE.txt"])
                .with_authority("/trusted/module"),
            PackageNode::new(AUTHORITY_SWITCH_MARKER)
                .with_signature_files(["NOTICE.txt"])
                .with_authority("/trusted/legal"),
            PackageNode::new("inner.tgz"),
        ]);

        let plan = resolve_chain(&work(), &package);
        let switch = &plan.steps[2];
        assert!(switch.authority_switch);
        assert_eq!(switch.extraction, None);
        assert_eq!(
            switch.verification,
            Some(Verification {
                directory: PathBuf::from("/work/app.dir/module.dir"),
                authority: PathBuf::from("/trusted/legal"),
                files: vec!["NOTICE.txt".to_string()],
            })
        );

        let inner = plan.steps[3].extraction.as_ref().unwrap();
        assert_eq!(inner.archive, PathBuf::from("/work/app.dir/module.dir/inner.tgz"));
    }

    #[test]
    fn test_package_directory_carries_to_next_level() {
        let package = PackageNode::new("app.tgz").with_children(vec![
            PackageNode::new("app.tgz"),
            PackageNode::new("module.tar")
                .with_package_directory("payload")
                .with_signature_files(["LICENSE.txt", "NOTICE.txt"])
                .with_authority("/trusted/module"),
            PackageNode::new("inner.tgz"),
        ]);

        let plan = resolve_chain(&work(), &package);
        let verification = plan.steps[1].verification.as_ref().unwrap();
        assert_eq!(
            verification.directory,
            PathBuf::from("/work/app.dir/module.dir/payload")
        );
        assert_eq!(verification.files.len(), 2);

        let inner = plan.steps[2].extraction.as_ref().unwrap();
        assert_eq!(
            inner.archive,
            PathBuf::from("/work/app.dir/module.dir/payload/inner.tgz")
        );
    }

    #[test]
    fn test_package_directory_ignored_without_verification() {
        let package = PackageNode::new("app.tgz").with_children(vec![
            PackageNode::new("app.tgz"),
            PackageNode::new("module.tar").with_package_directory("payload"),
            PackageNode::new("inner.tgz"),
        ]);

        let plan = resolve_chain(&work(), &package);
        let inner = plan.steps[2].extraction.as_ref().unwrap();
        assert_eq!(inner.archive, PathBuf::from("/work/app.dir/module.dir/inner.tgz"));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let package = PackageNode::new("app.tgz").with_children(vec![
            PackageNode::new("app.tgz"),
            PackageNode::new("module.tar"),
        ]);
        assert_eq!(
            resolve_chain(&work(), &package),
            resolve_chain(&work(), &package)
        );
    }
}
