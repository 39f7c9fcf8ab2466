//! Common error types for bundlecheck.

use std::path::PathBuf;
use thiserror::Error;

/// Common error type for bundlecheck operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Source bundle not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Extraction failed for {}: {reason}", archive.display())]
    Extraction { archive: PathBuf, reason: String },
}

/// Result type alias using common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_error_display() {
        let err = Error::Extraction {
            archive: PathBuf::from("/work/app.tgz"),
            reason: "invalid gzip header".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Extraction failed for /work/app.tgz: invalid gzip header"
        );
    }
}
