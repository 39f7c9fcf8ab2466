//! Bundlecheck verifier - nested bundle extraction and signature file comparison.
//!
//! A run extracts the top-level bundle into a working directory, walks each
//! configured package chain one nesting level at a time, and compares the
//! declared signature files with their authority copies.

pub mod archive;
pub mod compare;
pub mod events;
pub mod plan;
pub mod progress;
pub mod report;
pub mod verifier;

pub use archive::{ArchiveFormat, ExtractError, Extractor, TarExtractor};
pub use compare::{FileComparer, VerificationOutcome};
pub use events::{ConsoleSink, Event, EventSink, MemorySink, Severity};
pub use plan::{resolve_chain, ChainPlan, ResolvedStep};
pub use progress::{ProgressGuard, ProgressIndicator};
pub use report::{FailureKind, FileCheck, RunReport, Summary};
pub use verifier::{Verifier, VerifyOptions};
