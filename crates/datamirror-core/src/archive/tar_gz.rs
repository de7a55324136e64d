//! Gzip-compressed tar extraction.
//!
//! A tar stream cannot be revisited, so the archive is read twice: once to
//! validate every entry path and once to write.

use super::entry::{create_dir, is_skipped, relative_entry_path, write_file};
use super::{ArchiveFormat, ExtractError, ExtractReport, Extractor};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io;
use std::path::Path;
use tar::{Archive, EntryType};

pub struct TarGzExtractor;

fn open(archive: &Path) -> Result<Archive<GzDecoder<File>>, ExtractError> {
    let file = File::open(archive).map_err(|e| ExtractError::archive(archive, ArchiveFormat::TarGz, e))?;
    Ok(Archive::new(GzDecoder::new(file)))
}

fn entry_name(entry: &tar::Entry<'_, GzDecoder<File>>) -> io::Result<String> {
    Ok(entry.path()?.to_string_lossy().into_owned())
}

impl Extractor for TarGzExtractor {
    fn extract(
        &self,
        archive: &Path,
        destination: &Path,
        skip_entries: &[String],
    ) -> Result<ExtractReport, ExtractError> {
        let fail = |e: io::Error| ExtractError::archive(archive, ArchiveFormat::TarGz, e);

        let mut validate = open(archive)?;
        for entry in validate.entries().map_err(fail)? {
            let entry = entry.map_err(fail)?;
            relative_entry_path(&entry_name(&entry).map_err(fail)?)?;
        }

        let mut report = ExtractReport::default();
        let mut tar = open(archive)?;
        for entry in tar.entries().map_err(fail)? {
            let entry = entry.map_err(fail)?;
            let name = entry_name(&entry).map_err(fail)?;
            let Some(rel) = relative_entry_path(&name)? else { continue };
            if is_skipped(&rel, skip_entries) {
                report.skipped += 1;
                continue;
            }
            match entry.header().entry_type() {
                EntryType::Directory => create_dir(destination, &rel, &mut report)?,
                EntryType::Regular | EntryType::Continuous => {
                    let mode = entry.header().mode().ok();
                    write_file(destination, &rel, entry, mode, fail, &mut report)?;
                }
                EntryType::XGlobalHeader | EntryType::XHeader | EntryType::GNULongName => {}
                other => {
                    tracing::warn!(entry = %name, kind = ?other, "skipping unsupported tar entry");
                    report.skipped += 1;
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::test_support::write_tar_gz;

    #[test]
    fn truncated_archive_is_archive_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("ds.tar.gz");
        let payload = "7".repeat(200_000);
        write_tar_gz(&archive, &[("ds/big.bin", payload.as_str())]);
        let bytes = std::fs::read(&archive).unwrap();
        std::fs::write(&archive, &bytes[..bytes.len() / 2]).unwrap();

        let dest = dir.path().join("out");
        std::fs::create_dir_all(&dest).unwrap();
        let err = TarGzExtractor.extract(&archive, &dest, &[]).unwrap_err();
        assert!(matches!(err, ExtractError::Archive { .. }), "got {err:?}");
    }

    #[test]
    fn extracts_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("ds.tar.gz");
        write_tar_gz(&archive, &[("./ds/a/b.txt", "b"), ("ds/c.txt", "c")]);
        let dest = dir.path().join("out");
        std::fs::create_dir_all(&dest).unwrap();

        let report = TarGzExtractor.extract(&archive, &dest, &[]).unwrap();
        assert_eq!(report.files, 2);
        assert_eq!(report.bytes, 2);
        assert_eq!(std::fs::read(dest.join("ds/a/b.txt")).unwrap(), b"b");
    }
}
