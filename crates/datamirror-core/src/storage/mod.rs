//! Disk I/O and file lifecycle.
//!
//! Downloads land in `.part` files that are renamed into place only once
//! complete, so a crash never leaves something that looks finished. The
//! merging tree copy used to materialize cached datasets lives here too.

mod tree;
mod writer;

pub use tree::{copy_tree, CopyError, CopyReport};
pub use writer::{discard, PartFileWriter};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `file.zip` → `file.zip.part`).
pub fn temp_path(final_path: &std::path::Path) -> std::path::PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    std::path::PathBuf::from(o)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn temp_path_appends_part() {
        let p = temp_path(Path::new("nerf_synthetic.zip"));
        assert_eq!(p.to_string_lossy(), "nerf_synthetic.zip.part");
        let p2 = temp_path(Path::new("/tmp/cache/nerf_llff/nerf_llff_data.zip"));
        assert_eq!(p2.to_string_lossy(), "/tmp/cache/nerf_llff/nerf_llff_data.zip.part");
    }

    #[test]
    fn writes_chunks_in_order_and_counts_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let tp = temp_path(&dir.path().join("sub/output.zip"));

        let mut writer = PartFileWriter::create(&tp).unwrap();
        writer.write(b"hello").unwrap();
        writer.write(b" world").unwrap();
        writer.sync().unwrap();
        assert_eq!(writer.written(), 11);
        drop(writer);

        assert_eq!(std::fs::read(&tp).unwrap(), b"hello world");
    }

    #[test]
    fn create_truncates_leftover_part_file() {
        let dir = tempfile::tempdir().unwrap();
        let tp = dir.path().join("x.zip.part");
        std::fs::write(&tp, b"stale bytes from an interrupted run").unwrap();
        let mut writer = PartFileWriter::create(&tp).unwrap();
        writer.write(b"ok").unwrap();
        drop(writer);
        assert_eq!(std::fs::read(&tp).unwrap(), b"ok");
        discard(&tp);
        assert!(!tp.exists());
        discard(&tp);
    }
}
