//! Archive extraction.

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tar::Archive;
use thiserror::Error;
use tracing::{debug, warn};

/// Suffix given to the directory an archive is extracted into.
pub const DIR_SUFFIX: &str = ".dir";

const ARCHIVE_SUFFIXES: [&str; 3] = [".tar.gz", ".tgz", ".tar"];

/// On-disk archive encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Tar,
    TarGz,
}

impl ArchiveFormat {
    /// Infer the format from a file name: `.tar` is plain, anything else gzip.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if name.ends_with(".tar") {
            ArchiveFormat::Tar
        } else {
            ArchiveFormat::TarGz
        }
    }
}

/// Extraction error type.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create {}: {source}", path.display())]
    Destination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to unpack {}: {source}", path.display())]
    Unpack {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Trait for archive extraction.
///
/// Callers decide whether extraction is needed; implementations always
/// extract when asked.
pub trait Extractor: Send + Sync {
    /// Extract `archive` into `destination`, inferring the format when `format` is `None`.
    fn extract(
        &self,
        archive: &Path,
        destination: &Path,
        format: Option<ArchiveFormat>,
    ) -> Result<(), ExtractError>;
}

/// Extractor backed by the `tar` and `flate2` crates.
pub struct TarExtractor;

impl TarExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TarExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for TarExtractor {
    fn extract(
        &self,
        archive: &Path,
        destination: &Path,
        format: Option<ArchiveFormat>,
    ) -> Result<(), ExtractError> {
        let format = format.unwrap_or_else(|| ArchiveFormat::from_path(archive));
        debug!("Extracting {:?} ({:?}) into {:?}", archive, format, destination);

        let file = File::open(archive).map_err(|source| ExtractError::Open {
            path: archive.to_path_buf(),
            source,
        })?;

        let created = !destination.exists();
        std::fs::create_dir_all(destination).map_err(|source| ExtractError::Destination {
            path: destination.to_path_buf(),
            source,
        })?;

        let reader = BufReader::new(file);
        let result = match format {
            ArchiveFormat::Tar => unpack(reader, destination),
            ArchiveFormat::TarGz => unpack(GzDecoder::new(reader), destination),
        };

        if let Err(source) = result {
            // Only a fully unpacked tree may exist at a created destination.
            if created {
                discard_partial(destination);
            }
            return Err(ExtractError::Unpack {
                path: archive.to_path_buf(),
                source,
            });
        }
        Ok(())
    }
}

fn discard_partial(destination: &Path) {
    match std::fs::remove_dir_all(destination) {
        Ok(()) => debug!("Removed partial extraction {:?}", destination),
        Err(e) => warn!("Failed to remove partial extraction {:?}: {}", destination, e),
    }
}

fn unpack<R: Read>(reader: R, destination: &Path) -> std::io::Result<()> {
    let mut archive = Archive::new(reader);
    archive.unpack(destination)
}

/// Directory name an archive is extracted into.
///
/// `app.tgz` becomes `app.dir`, `module.tar` becomes `module.dir`; names
/// without a recognised archive suffix get `.dir` appended.
pub fn destination_name(archive_name: &str) -> String {
    let lower = archive_name.to_ascii_lowercase();
    for suffix in ARCHIVE_SUFFIXES {
        if lower.ends_with(suffix) {
            let stem = &archive_name[..archive_name.len() - suffix.len()];
            return format!("{}{}", stem, DIR_SUFFIX);
        }
    }
    format!("{}{}", archive_name, DIR_SUFFIX)
}
