//! Sequential writer for `.part` download files.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Appends a response body to a temp download file and counts what it wrote.
pub struct PartFileWriter {
    file: File,
    temp_path: PathBuf,
    written: u64,
}

impl PartFileWriter {
    /// Create a new temp file at `temp_path` (e.g. `nerf_llff_data.zip.part`).
    /// Truncates whatever a previous interrupted run left there.
    pub fn create(temp_path: &Path) -> Result<Self> {
        if let Some(parent) = temp_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir: {}", parent.display()))?;
        }
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(temp_path)
            .with_context(|| format!("failed to create temp file: {}", temp_path.display()))?;
        Ok(Self {
            file,
            temp_path: temp_path.to_path_buf(),
            written: 0,
        })
    }

    /// Append `data` at the current end of the file.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.file
            .write_all(data)
            .with_context(|| format!("write at offset {} in {}", self.written, self.temp_path.display()))?;
        self.written += data.len() as u64;
        Ok(())
    }

    /// Bytes written since [`create`](Self::create).
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Sync file data to disk before the file is verified and renamed.
    pub fn sync(&self) -> Result<()> {
        self.file
            .sync_all()
            .with_context(|| format!("sync {}", self.temp_path.display()))?;
        Ok(())
    }
}

/// Remove a temp file, ignoring "not found".
pub fn discard(temp_path: &Path) {
    match std::fs::remove_file(temp_path) {
        Ok(()) => tracing::debug!(path = %temp_path.display(), "discarded temp file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %temp_path.display(), "could not remove temp file: {}", e),
    }
}
