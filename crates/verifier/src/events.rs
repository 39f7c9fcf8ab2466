//! Verification events and the sinks that record them.

use crate::compare::VerificationOutcome;
use std::fmt;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

/// A classified event produced during a run. `Display` renders the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    SourceNotFound { path: PathBuf },
    BundleFound { name: String },
    BundleNotFound { name: String },
    ExtractionFailed { archive: PathBuf, reason: String },
    FileChecked {
        name: String,
        authority: PathBuf,
        outcome: VerificationOutcome,
    },
    Offender { line: String },
}

impl Event {
    pub fn severity(&self) -> Severity {
        match self {
            Event::BundleFound { .. } => Severity::Info,
            Event::FileChecked { outcome, .. } if !outcome.is_failure() => Severity::Info,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::SourceNotFound { path } => write!(f, "SOURCE: {} - NOT FOUND", path.display()),
            Event::BundleFound { name } => write!(f, "BUNDLE: {} - FOUND", name),
            Event::BundleNotFound { name } => write!(f, "BUNDLE: {} - NOT FOUND", name),
            Event::ExtractionFailed { archive, reason } => {
                write!(f, "EXTRACT: {} - FAILED [{}]", archive.display(), reason)
            }
            Event::FileChecked {
                name,
                authority,
                outcome,
            } => match outcome {
                VerificationOutcome::NotFoundInAuthority => {
                    write!(f, "  FILE: {} - NOT FOUND", authority.display())
                }
                VerificationOutcome::ExemptByExtension => write!(f, "  FILE: {} - FOUND", name),
                VerificationOutcome::Match => write!(f, "  FILE: {} - MATCH", name),
                VerificationOutcome::Mismatch { .. } => {
                    write!(f, "  FILE: {} - DOES NOT MATCH", name)
                }
                VerificationOutcome::MissingFromBundle => {
                    write!(f, "  FILE: {} - NOT FOUND IN BUNDLE", name)
                }
                VerificationOutcome::Unreadable { reason } => {
                    write!(f, "  FILE: {} - UNREADABLE [{}]", name, reason)
                }
            },
            Event::Offender { line } => write!(f, "    OFFENDER: \"{}\"", line),
        }
    }
}

/// Receives every classified event of a run.
pub trait EventSink {
    fn record(&mut self, event: &Event);
}

/// Prints status lines to stdout, optionally mirroring them into the log.
pub struct ConsoleSink {
    log_events: bool,
}

impl ConsoleSink {
    pub fn new(log_events: bool) -> Self {
        Self { log_events }
    }
}

impl EventSink for ConsoleSink {
    fn record(&mut self, event: &Event) {
        println!("{}", event);
        if self.log_events {
            match event.severity() {
                Severity::Info => info!("{}", event),
                Severity::Error => error!("{}", event),
            }
        }
    }
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub events: Vec<Event>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered status lines, in order.
    pub fn lines(&self) -> Vec<String> {
        self.events.iter().map(ToString::to_string).collect()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Event> {
        self.events
            .iter()
            .filter(|e| e.severity() == Severity::Error)
    }
}

impl EventSink for MemorySink {
    fn record(&mut self, event: &Event) {
        self.events.push(event.clone());
    }
}
