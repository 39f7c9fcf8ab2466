//! Line-based file comparison against authority copies.

use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

/// Classification of one signature file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationOutcome {
    /// The authority copy does not exist.
    NotFoundInAuthority,
    /// Accepted on its extension without reading content.
    ExemptByExtension,
    Match,
    /// Line sequences differ; lists candidate lines absent from the authority.
    Mismatch { offending_lines: Vec<String> },
    /// The authority copy exists but the extracted copy does not.
    MissingFromBundle,
    Unreadable { reason: String },
}

impl VerificationOutcome {
    /// Whether this outcome fails the run.
    pub fn is_failure(&self) -> bool {
        !matches!(
            self,
            VerificationOutcome::Match | VerificationOutcome::ExemptByExtension
        )
    }
}

/// Compares extracted files with their authority copies.
#[derive(Debug, Clone)]
pub struct FileComparer {
    exempt_extensions: Vec<String>,
}

impl Default for FileComparer {
    fn default() -> Self {
        Self::new(["p7s"])
    }
}

impl FileComparer {
    /// Create a comparer exempting names that end with any of `extensions`.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let exempt_extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self { exempt_extensions }
    }

    /// Suffix match, case-insensitive, without requiring a dot.
    pub fn is_exempt(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.exempt_extensions.iter().any(|ext| name.ends_with(ext))
    }

    /// Classify `candidate` against `authority`.
    ///
    /// Authority existence is checked before the extension exemption, so an
    /// exempt file with no authority copy still reports `NotFoundInAuthority`.
    /// A candidate path that exists but is not a readable file, such as a
    /// directory unpacked under the signature file's name, is `Unreadable`.
    pub fn compare(&self, authority: &Path, candidate: &Path, name: &str) -> VerificationOutcome {
        if !authority.is_file() {
            return VerificationOutcome::NotFoundInAuthority;
        }

        if self.is_exempt(name) {
            return VerificationOutcome::ExemptByExtension;
        }

        if !candidate.exists() {
            return VerificationOutcome::MissingFromBundle;
        }

        let expected = match read_lines(authority) {
            Ok(lines) => lines,
            Err(e) => {
                return VerificationOutcome::Unreadable {
                    reason: format!("{}: {}", authority.display(), e),
                }
            }
        };
        let actual = match read_lines(candidate) {
            Ok(lines) => lines,
            Err(e) => {
                return VerificationOutcome::Unreadable {
                    reason: format!("{}: {}", candidate.display(), e),
                }
            }
        };

        if expected == actual {
            VerificationOutcome::Match
        } else {
            VerificationOutcome::Mismatch {
                offending_lines: offending_lines(&expected, &actual),
            }
        }
    }
}

/// Read a file as text lines. Invalid UTF-8 is replaced rather than rejected.
pub fn read_lines(path: &Path) -> std::io::Result<Vec<String>> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .map(str::to_string)
        .collect())
}

/// Candidate lines that never appear in the authority copy.
///
/// Set difference, not a positional diff: reordered lines are not offenders.
/// Each offending line is listed once, in candidate order.
pub fn offending_lines(authority: &[String], candidate: &[String]) -> Vec<String> {
    let known: HashSet<&str> = authority.iter().map(String::as_str).collect();
    let mut reported = HashSet::new();

    candidate
        .iter()
        .filter(|line| !known.contains(line.as_str()))
        .filter(|line| reported.insert(line.as_str()))
        .cloned()
        .collect()
}
