//! Archive file names derived from mirror URLs.
//!
//! The cache stores each archive under the last path segment of its source
//! URL, sanitized for Linux filesystems.

mod path;
mod sanitize;

pub use path::filename_from_url_path;
pub use sanitize::sanitize_filename_for_linux;

use crate::archive::ArchiveFormat;

/// Derives the local file name for a dataset archive.
///
/// Uses the last path segment of `url`; when that yields nothing usable, falls
/// back to `<dataset>.<format extension>`.
///
/// # Examples
///
/// - `archive_file_name("https://host/r/nerf_synthetic.zip", "nerf_synthetic", Zip)` → `"nerf_synthetic.zip"`
/// - `archive_file_name("https://host/", "lego", TarGz)` → `"lego.tar.gz"`
pub fn archive_file_name(url: &str, dataset: &str, format: ArchiveFormat) -> String {
    let fallback = || {
        let name = sanitize_filename_for_linux(dataset);
        let name = if name.is_empty() { "dataset".to_string() } else { name };
        format!("{}.{}", name, format.as_str())
    };
    match filename_from_url_path(url) {
        Some(raw) => {
            let sanitized = sanitize_filename_for_linux(&raw);
            if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
                fallback()
            } else {
                sanitized
            }
        }
        None => fallback(),
    }
}
