//! Merging directory copy used to materialize cached datasets.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Counts of what a tree copy wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyReport {
    pub files: usize,
    pub dirs: usize,
    pub bytes: u64,
}

/// Error from [`copy_tree`]: the path that failed and why.
#[derive(Debug, thiserror::Error)]
#[error("copy {} -> {}", from.display(), to.display())]
pub struct CopyError {
    pub from: PathBuf,
    pub to: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Copy everything under `src` into `dst`, merging with what is already there.
///
/// Files in `dst` that also exist in `src` are overwritten; everything else in
/// `dst` is left alone. A file in `src` that collides with a directory in
/// `dst` (or the reverse) is an error; nothing is deleted to resolve it.
/// Symlinks in `src` are not followed.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<CopyReport, CopyError> {
    let mut report = CopyReport::default();
    let wrap = |from: &Path, to: &Path| {
        let (from, to) = (from.to_path_buf(), to.to_path_buf());
        move |source| CopyError { from, to, source }
    };
    fs::create_dir_all(dst).map_err(wrap(src, dst))?;

    let walk = WalkDir::new(src)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();
    for entry in walk {
        let entry = entry.map_err(|e| {
            let from = e.path().unwrap_or(src).to_path_buf();
            wrap(&from, dst)(io::Error::from(e))
        })?;
        let from = entry.path();
        let Ok(rel) = from.strip_prefix(src) else {
            continue;
        };
        let to = dst.join(rel);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&to).map_err(wrap(from, &to))?;
            report.dirs += 1;
        } else if file_type.is_file() {
            if fs::symlink_metadata(&to).map(|m| m.file_type().is_symlink()).unwrap_or(false) {
                fs::remove_file(&to).map_err(wrap(from, &to))?;
            }
            report.bytes += fs::copy(from, &to).map_err(wrap(from, &to))?;
            report.files += 1;
        } else {
            tracing::debug!(path = %from.display(), "skipping non-regular entry");
        }
    }
    Ok(report)
}
