//! Chain traversal: extraction and comparison in configured order.

use crate::archive::{ArchiveFormat, Extractor, TarExtractor};
use crate::compare::{FileComparer, VerificationOutcome};
use crate::events::{Event, EventSink};
use crate::plan::{resolve_chain, ChainPlan, Extraction, ResolvedStep, Verification};
use crate::progress::ProgressIndicator;
use crate::report::{FailureKind, FileCheck, RunReport};
use bundlecheck_common::hash::sha256_file;
use bundlecheck_common::{Error, Result};
use bundlecheck_schema::{BundleSchema, NestedFailurePolicy};
use std::path::Path;
use tracing::{debug, info, warn};

/// Options for a verification run.
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// Delete the working directory when the run ends.
    pub cleanup: bool,
    pub nested_failure: NestedFailurePolicy,
    pub exempt_extensions: Vec<String>,
    pub show_progress: bool,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            cleanup: false,
            nested_failure: NestedFailurePolicy::AbortRun,
            exempt_extensions: vec!["p7s".to_string()],
            show_progress: true,
        }
    }
}

/// Walks a bundle schema, extracting nested archives and comparing signature files.
pub struct Verifier {
    extractor: Box<dyn Extractor>,
    comparer: FileComparer,
    options: VerifyOptions,
}

impl Verifier {
    /// Create a verifier using the tar extractor.
    pub fn new(options: VerifyOptions) -> Self {
        Self::with_extractor(Box::new(TarExtractor::new()), options)
    }

    pub fn with_extractor(extractor: Box<dyn Extractor>, options: VerifyOptions) -> Self {
        let comparer = FileComparer::new(&options.exempt_extensions);
        Self {
            extractor,
            comparer,
            options,
        }
    }

    /// Run verification for `schema`, recording every event into `sink`.
    ///
    /// Never fails: fatal conditions end the run early and are reflected in
    /// the returned report.
    pub fn run(&self, schema: &BundleSchema, sink: &mut dyn EventSink) -> RunReport {
        let mut report = RunReport::new(&schema.source_path(), &schema.working_directory);

        if let Err(e) = self.verify(schema, sink, &mut report) {
            warn!("Run aborted: {}", e);
            report.abort(e.to_string());
        }

        if self.options.cleanup {
            if schema.working_directory_holds_source() {
                warn!(
                    "Not removing working directory {:?}: it contains the source bundle {:?}",
                    schema.working_directory,
                    schema.source_path()
                );
            } else {
                remove_working_directory(&schema.working_directory);
            }
        }

        report.finish();
        info!("Verification finished: {}", report.summary());
        report
    }

    fn verify(
        &self,
        schema: &BundleSchema,
        sink: &mut dyn EventSink,
        report: &mut RunReport,
    ) -> Result<()> {
        info!("SOURCE: {}", schema.bundle_source);

        let source = schema.source_path();
        if !source.is_file() {
            sink.record(&Event::SourceNotFound {
                path: source.clone(),
            });
            report.record_failure(FailureKind::SourceNotFound);
            return Err(Error::SourceNotFound(source));
        }

        self.extract(
            &Extraction {
                archive: source,
                destination: schema.working_directory.clone(),
                format: Some(ArchiveFormat::Tar),
            },
            sink,
            report,
        )?;

        for package in &schema.packages {
            let found = schema.working_directory.join(&package.name).is_file();
            report.record_package(&package.name, found);

            if !found {
                sink.record(&Event::BundleNotFound {
                    name: package.name.clone(),
                });
                continue;
            }
            sink.record(&Event::BundleFound {
                name: package.name.clone(),
            });

            if package.children_packages.is_empty() {
                continue;
            }

            let plan = resolve_chain(&schema.working_directory, package);
            match self.verify_chain(&plan, sink, report) {
                Ok(()) => {}
                Err(e) if self.options.nested_failure == NestedFailurePolicy::SkipPackage => {
                    warn!("Skipping rest of {}: {}", plan.package, e);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    fn verify_chain(
        &self,
        plan: &ChainPlan,
        sink: &mut dyn EventSink,
        report: &mut RunReport,
    ) -> Result<()> {
        self.extract_once(&plan.root, sink, report)?;

        for step in &plan.steps {
            if let Some(extraction) = &step.extraction {
                self.extract_once(extraction, sink, report)?;
            }
            if let Some(verification) = &step.verification {
                if step.authority_switch {
                    debug!(
                        "Authority switched to {:?} at {:?}",
                        verification.authority, verification.directory
                    );
                }
                for file in &verification.files {
                    self.check_file(plan, step, verification, file, sink, report);
                }
            }
        }

        Ok(())
    }

    /// Extract unless the destination already exists; existing contents are trusted.
    fn extract_once(
        &self,
        extraction: &Extraction,
        sink: &mut dyn EventSink,
        report: &mut RunReport,
    ) -> Result<()> {
        if extraction.destination.is_dir() {
            debug!("Reusing {:?}", extraction.destination);
            report.extractions_reused += 1;
            return Ok(());
        }
        self.extract(extraction, sink, report)
    }

    fn extract(
        &self,
        extraction: &Extraction,
        sink: &mut dyn EventSink,
        report: &mut RunReport,
    ) -> Result<()> {
        info!(
            "Extracting {:?} into {:?}",
            extraction.archive, extraction.destination
        );

        let result = {
            let _progress = self
                .options
                .show_progress
                .then(|| ProgressIndicator::start(&archive_label(&extraction.archive)));
            self.extractor.extract(
                &extraction.archive,
                &extraction.destination,
                extraction.format,
            )
        };

        match result {
            Ok(()) => {
                report.extractions += 1;
                Ok(())
            }
            Err(e) => {
                let reason = e.to_string();
                sink.record(&Event::ExtractionFailed {
                    archive: extraction.archive.clone(),
                    reason: reason.clone(),
                });
                report.record_failure(FailureKind::ExtractionFailure);
                Err(Error::Extraction {
                    archive: extraction.archive.clone(),
                    reason,
                })
            }
        }
    }

    fn check_file(
        &self,
        plan: &ChainPlan,
        step: &ResolvedStep,
        verification: &Verification,
        file: &str,
        sink: &mut dyn EventSink,
        report: &mut RunReport,
    ) {
        let candidate = verification.directory.join(file);
        let authority = verification.authority.join(file);
        let outcome = self.comparer.compare(&authority, &candidate, file);

        sink.record(&Event::FileChecked {
            name: file.to_string(),
            authority: authority.clone(),
            outcome: outcome.clone(),
        });

        let (candidate_sha256, authority_sha256) = match &outcome {
            VerificationOutcome::Mismatch { offending_lines } => {
                for line in offending_lines {
                    sink.record(&Event::Offender { line: line.clone() });
                }
                (sha256_file(&candidate).ok(), sha256_file(&authority).ok())
            }
            _ => (None, None),
        };

        report.record_file(FileCheck {
            package: plan.package.clone(),
            step: step.label.clone(),
            file: file.to_string(),
            candidate,
            authority,
            outcome,
            candidate_sha256,
            authority_sha256,
        });
    }
}

fn archive_label(archive: &Path) -> String {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    format!("extracting {}", name)
}

fn remove_working_directory(path: &Path) {
    if !path.exists() {
        return;
    }
    match std::fs::remove_dir_all(path) {
        Ok(()) => debug!("Removed working directory {:?}", path),
        Err(e) => warn!("Failed to remove working directory {:?}: {}", path, e),
    }
}
