//! Entry path validation and the write helpers shared by every format.

use super::{ExtractError, ExtractReport};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};

const COPY_BUF: usize = 64 * 1024;

/// Turn an archive entry name into a path relative to the destination.
///
/// Returns `Ok(None)` for entries that name the destination itself (`./`).
/// Absolute paths, drive prefixes and any `..` segment are rejected, even
/// when the `..` would resolve back inside the destination.
pub fn relative_entry_path(raw: &str) -> Result<Option<PathBuf>, ExtractError> {
    let normalized = raw.replace('\\', "/");
    let mut out = PathBuf::new();
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ExtractError::PathTraversal {
                    entry: raw.to_string(),
                });
            }
        }
    }
    if out.as_os_str().is_empty() {
        Ok(None)
    } else {
        Ok(Some(out))
    }
}

/// True when the first component of `rel` is one of `skip_entries`.
pub(super) fn is_skipped(rel: &Path, skip_entries: &[String]) -> bool {
    match rel.components().next() {
        Some(Component::Normal(first)) => skip_entries
            .iter()
            .any(|s| first.to_str() == Some(s.as_str())),
        _ => false,
    }
}

fn note_top_level(rel: &Path, report: &mut ExtractReport) {
    if let Some(Component::Normal(first)) = rel.components().next() {
        report.top_level.insert(first.to_string_lossy().into_owned());
    }
}

pub(super) fn create_dir(destination: &Path, rel: &Path, report: &mut ExtractReport) -> Result<(), ExtractError> {
    let path = destination.join(rel);
    fs::create_dir_all(&path).map_err(|e| ExtractError::write(&path, e))?;
    report.dirs += 1;
    note_top_level(rel, report);
    Ok(())
}

/// Write one file entry. Read failures come from the archive, write failures
/// from the destination, and are reported as such.
pub(super) fn write_file<R: Read>(
    destination: &Path,
    rel: &Path,
    mut reader: R,
    mode: Option<u32>,
    on_read_error: impl Fn(std::io::Error) -> ExtractError,
    report: &mut ExtractReport,
) -> Result<(), ExtractError> {
    let path = destination.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ExtractError::write(parent, e))?;
    }
    // The archive owns this path; replace a symlink rather than write through it.
    if let Ok(meta) = fs::symlink_metadata(&path) {
        if meta.file_type().is_symlink() {
            fs::remove_file(&path).map_err(|e| ExtractError::write(&path, e))?;
        }
    }
    let mut out = File::create(&path).map_err(|e| ExtractError::write(&path, e))?;
    let mut buf = vec![0u8; COPY_BUF];
    let mut written = 0u64;
    loop {
        let n = reader.read(&mut buf).map_err(&on_read_error)?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n])
            .map_err(|e| ExtractError::write(&path, e))?;
        written += n as u64;
    }
    out.flush().map_err(|e| ExtractError::write(&path, e))?;
    drop(out);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Some(mode) = mode {
            // Keep the owner able to overwrite the file on the next run.
            let mode = (mode & 0o777) | 0o600;
            fs::set_permissions(&path, fs::Permissions::from_mode(mode))
                .map_err(|e| ExtractError::write(&path, e))?;
        }
    }
    #[cfg(not(unix))]
    let _ = mode;

    report.files += 1;
    report.bytes += written;
    note_top_level(rel, report);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_and_dotted_paths() {
        assert_eq!(
            relative_entry_path("nerf_synthetic/chair/r_0.png").unwrap(),
            Some(PathBuf::from("nerf_synthetic/chair/r_0.png"))
        );
        assert_eq!(
            relative_entry_path("./nerf_synthetic/README.txt").unwrap(),
            Some(PathBuf::from("nerf_synthetic/README.txt"))
        );
        assert_eq!(relative_entry_path("./").unwrap(), None);
        assert_eq!(
            relative_entry_path("dir\\file.txt").unwrap(),
            Some(PathBuf::from("dir/file.txt"))
        );
    }

    #[test]
    fn escaping_paths_rejected() {
        for raw in ["../x", "a/../../x", "a/../b", "/etc/passwd", "\\abs\\path", "..\\x"] {
            let err = relative_entry_path(raw).unwrap_err();
            assert!(err.is_security_rejection(), "{raw} should be rejected");
        }
    }

    #[test]
    fn skip_matches_first_component_only() {
        let skip = vec!["__MACOSX".to_string()];
        assert!(is_skipped(Path::new("__MACOSX/x/._a"), &skip));
        assert!(!is_skipped(Path::new("data/__MACOSX/a"), &skip));
        assert!(!is_skipped(Path::new("data"), &[]));
    }
}
