//! Archive extraction with merge semantics.
//!
//! Each supported format is an [`Extractor`] selected by [`ArchiveFormat`].
//! Extraction writes the archive's own paths under the destination
//! (overwriting files that already exist there) and leaves every other entry
//! of the destination alone. Entry paths are validated for the whole archive
//! before the first byte is written; an entry that would land outside the
//! destination aborts extraction with [`ExtractError::PathTraversal`].

mod entry;
mod tar_gz;
mod zip_archive;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

pub use entry::relative_entry_path;
pub use tar_gz::TarGzExtractor;
pub use zip_archive::ZipExtractor;

/// Archive container formats a dataset may be published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchiveFormat {
    #[serde(rename = "zip")]
    Zip,
    #[serde(rename = "tar.gz", alias = "tgz")]
    TarGz,
}

static ZIP: ZipExtractor = ZipExtractor;
static TAR_GZ: TarGzExtractor = TarGzExtractor;

impl ArchiveFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::TarGz => "tar.gz",
        }
    }

    /// The extractor implementing this format.
    pub fn extractor(&self) -> &'static dyn Extractor {
        match self {
            ArchiveFormat::Zip => &ZIP,
            ArchiveFormat::TarGz => &TAR_GZ,
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure while extracting an archive.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// An entry path is absolute or climbs out of the destination with `..`.
    #[error("security: archive entry '{entry}' escapes the destination directory; refusing to extract")]
    PathTraversal { entry: String },
    /// The archive is unreadable, truncated, or not in the declared format.
    #[error("cannot read {format} archive {}", path.display())]
    Archive {
        path: PathBuf,
        format: ArchiveFormat,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
    /// Writing into the destination failed (permissions, disk full, type conflict).
    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ExtractError {
    pub(crate) fn archive<E>(path: &Path, format: ArchiveFormat, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        ExtractError::Archive {
            path: path.to_path_buf(),
            format,
            source: source.into(),
        }
    }

    pub(crate) fn write(path: &Path, source: io::Error) -> Self {
        ExtractError::Write {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn is_security_rejection(&self) -> bool {
        matches!(self, ExtractError::PathTraversal { .. })
    }
}

/// What an extraction wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractReport {
    pub files: usize,
    pub dirs: usize,
    pub skipped: usize,
    pub bytes: u64,
    /// First path component of every entry written, e.g. `nerf_synthetic`.
    pub top_level: BTreeSet<String>,
}

/// One archive format's extraction routine.
pub trait Extractor: Sync {
    /// Extract `archive` into `destination`, which must already exist.
    ///
    /// Entries whose first path component is in `skip_entries` are ignored.
    fn extract(
        &self,
        archive: &Path,
        destination: &Path,
        skip_entries: &[String],
    ) -> Result<ExtractReport, ExtractError>;
}

/// Extract `archive_path` into `destination_dir` using the format's extractor.
/// Creates `destination_dir` if needed.
pub fn extract(
    archive_path: &Path,
    format: ArchiveFormat,
    destination_dir: &Path,
    skip_entries: &[String],
) -> Result<ExtractReport, ExtractError> {
    std::fs::create_dir_all(destination_dir)
        .map_err(|e| ExtractError::write(destination_dir, e))?;
    tracing::debug!(
        archive = %archive_path.display(),
        destination = %destination_dir.display(),
        %format,
        "extracting"
    );
    let report = format
        .extractor()
        .extract(archive_path, destination_dir, skip_entries)?;
    tracing::info!(
        files = report.files,
        dirs = report.dirs,
        skipped = report.skipped,
        bytes = report.bytes,
        "extracted {}",
        archive_path.display()
    );
    Ok(report)
}
