//! Run report: the outcome of one verification run.

use crate::compare::VerificationOutcome;
use bundlecheck_common::{Result, Timestamp};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Failure categories folded into the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    SourceNotFound,
    ExtractionFailure,
    PackageNotFound,
    AuthorityFileNotFound,
    MissingFromBundle,
    Unreadable,
    ContentMismatch,
}

impl FailureKind {
    /// Failure kind for a file outcome, `None` when the outcome passes.
    pub fn for_outcome(outcome: &VerificationOutcome) -> Option<Self> {
        match outcome {
            VerificationOutcome::Match | VerificationOutcome::ExemptByExtension => None,
            VerificationOutcome::NotFoundInAuthority => Some(FailureKind::AuthorityFileNotFound),
            VerificationOutcome::Mismatch { .. } => Some(FailureKind::ContentMismatch),
            VerificationOutcome::MissingFromBundle => Some(FailureKind::MissingFromBundle),
            VerificationOutcome::Unreadable { .. } => Some(FailureKind::Unreadable),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PackageStatus {
    pub name: String,
    pub found: bool,
}

/// One compared signature file.
#[derive(Debug, Clone, Serialize)]
pub struct FileCheck {
    pub package: String,
    pub step: String,
    pub file: String,
    pub candidate: PathBuf,
    pub authority: PathBuf,
    pub outcome: VerificationOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authority_sha256: Option<String>,
}

/// Counts per outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub packages_found: usize,
    pub packages_missing: usize,
    pub matched: usize,
    pub exempt: usize,
    pub mismatched: usize,
    pub missing: usize,
    pub unreadable: usize,
    pub extractions: usize,
    pub extractions_reused: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "packages: {} found, {} missing | files: {} match, {} exempt, {} mismatch, {} missing, {} unreadable",
            self.packages_found,
            self.packages_missing,
            self.matched,
            self.exempt,
            self.mismatched,
            self.missing,
            self.unreadable
        )
    }
}

#[derive(Serialize)]
struct ReportDocument<'a> {
    summary: Summary,
    #[serde(flatten)]
    report: &'a RunReport,
}

/// Result of a verification run.
///
/// The failure flag only ever goes from clean to failed; callers read it once
/// at the end through [`RunReport::exit_code`].
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub source: PathBuf,
    pub working_directory: PathBuf,
    pub started_at: Timestamp,
    pub finished_at: Option<Timestamp>,
    pub duration_ms: u64,
    failed: bool,
    /// Reason the run stopped early, if it did.
    pub aborted: Option<String>,
    pub failures: Vec<FailureKind>,
    pub packages: Vec<PackageStatus>,
    pub files: Vec<FileCheck>,
    pub extractions: usize,
    pub extractions_reused: usize,
}

impl RunReport {
    pub fn new(source: &Path, working_directory: &Path) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            source: source.to_path_buf(),
            working_directory: working_directory.to_path_buf(),
            started_at: Timestamp::now(),
            finished_at: None,
            duration_ms: 0,
            failed: false,
            aborted: None,
            failures: Vec::new(),
            packages: Vec::new(),
            files: Vec::new(),
            extractions: 0,
            extractions_reused: 0,
        }
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Process exit status: 0 when clean, 1 when anything failed.
    pub fn exit_code(&self) -> i32 {
        if self.failed {
            1
        } else {
            0
        }
    }

    pub fn record_failure(&mut self, kind: FailureKind) {
        self.failed = true;
        self.failures.push(kind);
    }

    pub fn record_package(&mut self, name: &str, found: bool) {
        if !found {
            self.record_failure(FailureKind::PackageNotFound);
        }
        self.packages.push(PackageStatus {
            name: name.to_string(),
            found,
        });
    }

    pub fn record_file(&mut self, check: FileCheck) {
        if let Some(kind) = FailureKind::for_outcome(&check.outcome) {
            self.record_failure(kind);
        }
        self.files.push(check);
    }

    /// Mark the run as stopped early. Always fails the run.
    pub fn abort(&mut self, reason: impl Into<String>) {
        self.failed = true;
        self.aborted = Some(reason.into());
    }

    pub fn finish(&mut self) {
        let now = Timestamp::now();
        self.duration_ms = self.started_at.millis_until(now);
        self.finished_at = Some(now);
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            extractions: self.extractions,
            extractions_reused: self.extractions_reused,
            ..Default::default()
        };

        for package in &self.packages {
            if package.found {
                summary.packages_found += 1;
            } else {
                summary.packages_missing += 1;
            }
        }

        for check in &self.files {
            match check.outcome {
                VerificationOutcome::Match => summary.matched += 1,
                VerificationOutcome::ExemptByExtension => summary.exempt += 1,
                VerificationOutcome::Mismatch { .. } => summary.mismatched += 1,
                VerificationOutcome::NotFoundInAuthority | VerificationOutcome::MissingFromBundle => {
                    summary.missing += 1
                }
                VerificationOutcome::Unreadable { .. } => summary.unreadable += 1,
            }
        }

        summary
    }

    /// Write the report, with its summary, as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let document = ReportDocument {
            summary: self.summary(),
            report: self,
        };
        std::fs::write(path, serde_json::to_string_pretty(&document)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(outcome: VerificationOutcome) -> FileCheck {
        FileCheck {
            package: "app.tgz".to_string(),
            step: "module.tar".to_string(),
            file: "LICENSE.txt".to_string(),
            candidate: PathBuf::from("/work/app.dir/module.dir/LICENSE.txt"),
            authority: PathBuf::from("/trusted/module/LICENSE.txt"),
            outcome,
            candidate_sha256: None,
            authority_sha256: None,
        }
    }

    fn report() -> RunReport {
        RunReport::new(Path::new("/drop/release.tar"), Path::new("/work"))
    }

    #[test]
    fn test_clean_report_exits_zero() {
        let mut report = report();
        report.record_package("app.tgz", true);
        report.record_file(check(VerificationOutcome::Match));
        report.record_file(check(VerificationOutcome::ExemptByExtension));
        assert!(!report.failed());
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_failure_is_sticky() {
        let mut report = report();
        report.record_file(check(VerificationOutcome::NotFoundInAuthority));
        report.record_file(check(VerificationOutcome::Match));
        report.record_package("other.tgz", true);
        assert!(report.failed());
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.failures, vec![FailureKind::AuthorityFileNotFound]);
    }

    #[test]
    fn test_abort_fails_run() {
        let mut report = report();
        report.abort("Source bundle not found: /drop/release.tar");
        assert!(report.failed());
        assert!(report.aborted.is_some());
    }

    #[test]
    fn test_summary_counts() {
        let mut report = report();
        report.record_package("app.tgz", true);
        report.record_package("gone.tgz", false);
        report.record_file(check(VerificationOutcome::Match));
        report.record_file(check(VerificationOutcome::Mismatch {
            offending_lines: vec!["D".to_string()],
        }));
        report.record_file(check(VerificationOutcome::MissingFromBundle));

        let summary = report.summary();
        assert_eq!(summary.packages_found, 1);
        assert_eq!(summary.packages_missing, 1);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.mismatched, 1);
        assert_eq!(summary.missing, 1);
        assert_eq!(
            report.failures,
            vec![
                FailureKind::PackageNotFound,
                FailureKind::ContentMismatch,
                FailureKind::MissingFromBundle
            ]
        );
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        let mut report = report();
        report.record_file(check(VerificationOutcome::Mismatch {
            offending_lines: vec!["D".to_string()],
        }));
        report.finish();
        report.write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["failed"], true);
        assert_eq!(value["summary"]["mismatched"], 1);
        assert_eq!(value["files"][0]["outcome"]["status"], "mismatch");
        assert_eq!(value["files"][0]["outcome"]["offending_lines"][0], "D");
        assert!(value["finished_at"].is_string());
    }
}
