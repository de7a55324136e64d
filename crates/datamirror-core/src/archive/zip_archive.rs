//! Zip extraction.

use super::entry::{create_dir, is_skipped, relative_entry_path, write_file};
use super::{ArchiveFormat, ExtractError, ExtractReport, Extractor};
use std::fs::File;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

pub struct ZipExtractor;

impl Extractor for ZipExtractor {
    fn extract(
        &self,
        archive: &Path,
        destination: &Path,
        skip_entries: &[String],
    ) -> Result<ExtractReport, ExtractError> {
        let fail = |e: zip::result::ZipError| ExtractError::archive(archive, ArchiveFormat::Zip, e);
        let file = File::open(archive).map_err(|e| ExtractError::archive(archive, ArchiveFormat::Zip, e))?;
        let mut zip = ZipArchive::new(file).map_err(fail)?;

        // Validate every name from the central directory before writing anything.
        let mut plan: Vec<Option<PathBuf>> = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let entry = zip.by_index_raw(i).map_err(fail)?;
            plan.push(relative_entry_path(entry.name())?);
        }

        let mut report = ExtractReport::default();
        for (i, rel) in plan.into_iter().enumerate() {
            let Some(rel) = rel else { continue };
            if is_skipped(&rel, skip_entries) {
                report.skipped += 1;
                continue;
            }
            let entry = zip.by_index(i).map_err(fail)?;
            if entry.is_dir() {
                create_dir(destination, &rel, &mut report)?;
            } else {
                let mode = entry.unix_mode();
                write_file(
                    destination,
                    &rel,
                    entry,
                    mode,
                    |e| ExtractError::archive(archive, ArchiveFormat::Zip, e),
                    &mut report,
                )?;
            }
        }
        Ok(report)
    }
}
