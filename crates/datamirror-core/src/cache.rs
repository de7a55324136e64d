//! Local extraction cache.
//!
//! One entry per dataset under the cache root:
//!
//! ```text
//! <cache_root>/<dataset>/
//!     <archive file>      verified download, e.g. nerf_synthetic.zip
//!     <archive file>.part in-flight download
//!     extracted/          full archive contents
//!     checksum            "<algorithm>:<hex>" of the archive that produced extracted/
//! ```
//!
//! The `checksum` record is written last and removed first, so an entry whose
//! store was interrupted never reads as valid.

use crate::archive::{self, ExtractError, ExtractReport};
use crate::checksum;
use crate::registry::DatasetSpec;
use crate::storage::{self, copy_tree, CopyError, CopyReport};
use crate::url_model::archive_file_name;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const EXTRACTED_DIR: &str = "extracted";
const CHECKSUM_RECORD: &str = "checksum";
/// Scratch names `store` creates inside an entry. Sanitized archive names
/// never start with a dot, so these cannot shadow the archive.
const STAGING_PREFIX: &str = ".extract-";
const RECORD_STAGING_PREFIX: &str = ".checksum-";

/// State of a dataset's cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// No archive in the cache.
    Missing,
    /// Something is there but cannot be trusted: wrong digest, missing or
    /// mismatched record, or no extracted tree. Must be re-fetched.
    Stale,
    /// Archive verifies, record matches, extracted tree present.
    Valid,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Missing => "missing",
            CacheStatus::Stale => "stale",
            CacheStatus::Valid => "valid",
        }
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cannot write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Copy(#[from] CopyError),
}

fn write_error(path: &Path) -> impl FnOnce(io::Error) -> CacheError + '_ {
    move |source| CacheError::Write {
        path: path.to_path_buf(),
        source,
    }
}

/// Cache rooted at a directory; holds no state beyond the root path.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Use `root` as the cache directory. Nothing is created until a store.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Open the cache, creating `root` if needed. Fails when `root` exists but
    /// is not a directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(write_error(&root))?;
        Ok(Self { root })
    }

    pub fn entry_dir(&self, spec: &DatasetSpec) -> PathBuf {
        self.root.join(&spec.name)
    }

    /// Where the verified archive lives.
    pub fn archive_path(&self, spec: &DatasetSpec) -> PathBuf {
        let mut name = archive_file_name(&spec.source_url, &spec.name, spec.archive_format);
        if name == EXTRACTED_DIR || name == CHECKSUM_RECORD {
            name = format!("archive-{}", name);
        }
        self.entry_dir(spec).join(name)
    }

    /// Where a download in progress is written before it is verified.
    pub fn partial_download_path(&self, spec: &DatasetSpec) -> PathBuf {
        storage::temp_path(&self.archive_path(spec))
    }

    pub fn extracted_dir(&self, spec: &DatasetSpec) -> PathBuf {
        self.entry_dir(spec).join(EXTRACTED_DIR)
    }

    fn record_path(&self, spec: &DatasetSpec) -> PathBuf {
        self.entry_dir(spec).join(CHECKSUM_RECORD)
    }

    /// Inspect the entry for `spec`. Hashes the archive, so this reads the whole file.
    pub fn resolve(&self, spec: &DatasetSpec) -> CacheStatus {
        let archive = self.archive_path(spec);
        if !archive.is_file() {
            tracing::debug!(dataset = %spec.name, path = %archive.display(), "cache miss");
            return CacheStatus::Missing;
        }
        let expected = spec.expected_checksum.to_string();
        match fs::read_to_string(self.record_path(spec)) {
            Ok(record) if record.trim() == expected => {}
            Ok(record) => {
                tracing::info!(dataset = %spec.name, record = record.trim(), %expected, "cache record does not match dataset checksum");
                return CacheStatus::Stale;
            }
            Err(e) => {
                tracing::info!(dataset = %spec.name, "cache record unreadable: {}", e);
                return CacheStatus::Stale;
            }
        }
        if !self.extracted_dir(spec).is_dir() {
            tracing::info!(dataset = %spec.name, "cache entry has no extracted tree");
            return CacheStatus::Stale;
        }
        if !checksum::verify(&archive, &spec.expected_checksum) {
            tracing::warn!(dataset = %spec.name, path = %archive.display(), "cached archive fails checksum");
            return CacheStatus::Stale;
        }
        tracing::debug!(dataset = %spec.name, "cache hit");
        CacheStatus::Valid
    }

    /// Move a verified download into the entry and extract it.
    ///
    /// `downloaded` is normally [`partial_download_path`](Self::partial_download_path).
    /// The new tree is unpacked next to the old one and swapped in, then the
    /// record is written. On error the entry is left without a record, so it
    /// resolves as [`CacheStatus::Stale`].
    pub fn store(&self, spec: &DatasetSpec, downloaded: &Path) -> Result<ExtractReport, CacheError> {
        let entry = self.entry_dir(spec);
        fs::create_dir_all(&entry).map_err(write_error(&entry))?;

        let record = self.record_path(spec);
        match fs::remove_file(&record) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(write_error(&record)(e)),
        }

        let archive_path = self.archive_path(spec);
        if downloaded != archive_path {
            place_archive(downloaded, &archive_path)?;
        }

        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&entry)
            .map_err(write_error(&entry))?;
        let report = archive::extract(
            &archive_path,
            spec.archive_format,
            staging.path(),
            &spec.skip_entries,
        )?;

        let extracted = self.extracted_dir(spec);
        if fs::symlink_metadata(&extracted).is_ok() {
            let old = tempfile::Builder::new()
                .prefix(".extract-old-")
                .tempdir_in(&entry)
                .map_err(write_error(&entry))?;
            let parked = old.path().join(EXTRACTED_DIR);
            fs::rename(&extracted, &parked).map_err(write_error(&extracted))?;
            // `old` removes the previous tree when dropped.
            fs::rename(staging.path(), &extracted).map_err(write_error(&extracted))?;
        } else {
            fs::rename(staging.path(), &extracted).map_err(write_error(&extracted))?;
        }

        let mut pending = tempfile::Builder::new()
            .prefix(RECORD_STAGING_PREFIX)
            .tempfile_in(&entry)
            .map_err(write_error(&entry))?;
        writeln!(pending, "{}", spec.expected_checksum).map_err(write_error(&record))?;
        pending
            .persist(&record)
            .map_err(|e| write_error(&record)(e.error))?;

        tracing::info!(
            dataset = %spec.name,
            files = report.files,
            bytes = report.bytes,
            path = %extracted.display(),
            "cache entry stored"
        );
        Ok(report)
    }

    /// Copy the extracted tree into `destination`, merging with what is there.
    pub fn materialize(&self, spec: &DatasetSpec, destination: &Path) -> Result<CopyReport, CacheError> {
        let extracted = self.extracted_dir(spec);
        let report = copy_tree(&extracted, destination)?;
        tracing::info!(
            dataset = %spec.name,
            files = report.files,
            dest = %destination.display(),
            "materialized from cache"
        );
        Ok(report)
    }

    /// Top-level names inside the extracted tree, sorted.
    pub fn extracted_top_level(&self, spec: &DatasetSpec) -> Result<Vec<String>, CacheError> {
        let extracted = self.extracted_dir(spec);
        let mut names = Vec::new();
        for entry in fs::read_dir(&extracted).map_err(write_error(&extracted))? {
            let entry = entry.map_err(write_error(&extracted))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}

/// Rename `from` onto `to`; copy and remove when they are on different filesystems.
fn place_archive(from: &Path, to: &Path) -> Result<(), CacheError> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            tracing::debug!(from = %from.display(), to = %to.display(), "rename failed ({}), copying", rename_err);
            let part = storage::temp_path(to);
            fs::copy(from, &part).map_err(write_error(&part))?;
            fs::rename(&part, to).map_err(write_error(to))?;
            storage::discard(from);
            Ok(())
        }
    }
}
