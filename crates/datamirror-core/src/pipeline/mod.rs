//! Dataset fetch pipeline.
//!
//! Drives one dataset from its registry entry to a directory under the
//! requested download dir:
//!
//! ```text
//! Start ─┬─ cache configured ──> ResolvingCache ─┬─ valid ──────────────> Materializing ─> Done
//!        │                                       └─ missing / stale ─┐
//!        └─ no cache ──> Downloading <───────────────────────────────┘
//!                        Downloading ─> Verifying ─> Extracting ─┬─ into cache ─> Materializing ─> Done
//!                                                                └─ direct ─────────────────────> Done
//! ```
//!
//! Stage transitions are decided by [`Event::next_stage`]; this module only
//! performs the side effects of each stage.

mod error;
mod stage;

pub use error::{FetchError, FetchErrorKind};
pub use stage::{Event, Stage};

use crate::archive::{self, ExtractReport};
use crate::cache::{CacheStatus, CacheStore};
use crate::checksum::{self, Verdict};
use crate::registry::{DatasetRegistry, DatasetSpec};
use crate::storage::{self, CopyReport};
use crate::transport::Transport;
use crate::url_model::archive_file_name;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// One fetch invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub dataset: String,
    /// Directory the dataset's top-level folder ends up in.
    pub download_dir: PathBuf,
    /// Shared extraction cache; `None` downloads to a scratch dir and
    /// extracts straight into `download_dir`.
    pub cache_dir: Option<PathBuf>,
}

impl FetchRequest {
    pub fn new(dataset: impl Into<String>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            dataset: dataset.into(),
            download_dir: download_dir.into(),
            cache_dir: None,
        }
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(cache_dir.into());
        self
    }
}

/// What a successful fetch did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub dataset: String,
    /// `<download_dir>/<extracted_subdir_name>`; guaranteed to exist.
    pub dataset_dir: PathBuf,
    /// Top-level paths written under the download dir.
    pub written: Vec<PathBuf>,
    /// Cache state found at the start; `None` when no cache was used.
    pub cache_status: Option<CacheStatus>,
    /// Bytes downloaded; `None` when the archive came from the cache.
    pub downloaded_bytes: Option<u64>,
    /// Set when an archive was extracted during this run.
    pub extracted: Option<ExtractReport>,
    /// Set when the dataset was copied out of the cache.
    pub materialized: Option<CopyReport>,
    /// Every stage visited, ending with [`Stage::Done`].
    pub stages: Vec<Stage>,
}

/// Find `name` in `registry`, failing at [`Stage::Start`] with
/// [`FetchErrorKind::UnknownDataset`] when it is not registered.
pub fn lookup<'r>(registry: &'r DatasetRegistry, name: &str) -> Result<&'r DatasetSpec, FetchError> {
    registry.get(name).ok_or_else(|| {
        FetchError::new(
            name,
            Stage::Start,
            FetchErrorKind::UnknownDataset {
                name: name.to_string(),
                available: registry.names().collect::<Vec<_>>().join(", "),
            },
        )
    })
}

/// Fetches datasets from an injected registry through an injected transport.
pub struct FetchPipeline<T> {
    registry: DatasetRegistry,
    transport: T,
}

impl<T: Transport> FetchPipeline<T> {
    pub fn new(registry: DatasetRegistry, transport: T) -> Self {
        Self { registry, transport }
    }

    /// Run the pipeline for `request`. An unknown dataset fails before
    /// anything is written or fetched.
    pub fn fetch(&self, request: &FetchRequest) -> Result<FetchOutcome, FetchError> {
        let spec = lookup(&self.registry, &request.dataset)?;

        let span = tracing::info_span!("fetch", dataset = %spec.name);
        let _guard = span.enter();

        let mut run = Run::new(spec, request, &self.transport);
        let mut stage = Stage::Start;
        let mut stages = Vec::new();
        while !stage.is_terminal() {
            stages.push(stage);
            tracing::debug!(%stage, "entering stage");
            let event = run.step(stage).map_err(|kind| {
                tracing::warn!(%stage, "fetch failed: {}", kind);
                FetchError::new(&spec.name, stage, kind)
            })?;
            stage = event.next_stage();
        }
        stages.push(stage);

        let outcome = run.finish(stages);
        tracing::info!(path = %outcome.dataset_dir.display(), "dataset ready");
        Ok(outcome)
    }
}

enum Mode {
    /// Download into a scratch dir that is removed when the run ends.
    Direct { scratch: Option<TempDir> },
    Cached(CacheStore),
}

/// Mutable state of one pipeline run.
struct Run<'a, T> {
    spec: &'a DatasetSpec,
    request: &'a FetchRequest,
    transport: &'a T,
    mode: Mode,
    archive: Option<PathBuf>,
    cache_status: Option<CacheStatus>,
    downloaded_bytes: Option<u64>,
    extracted: Option<ExtractReport>,
    materialized: Option<CopyReport>,
    written: Vec<PathBuf>,
}

impl<'a, T: Transport> Run<'a, T> {
    fn new(spec: &'a DatasetSpec, request: &'a FetchRequest, transport: &'a T) -> Self {
        Self {
            spec,
            request,
            transport,
            mode: Mode::Direct { scratch: None },
            archive: None,
            cache_status: None,
            downloaded_bytes: None,
            extracted: None,
            materialized: None,
            written: Vec::new(),
        }
    }

    fn step(&mut self, stage: Stage) -> Result<Event, FetchErrorKind> {
        match stage {
            Stage::Start => self.start(),
            Stage::ResolvingCache => Ok(self.resolve_cache()),
            Stage::Downloading => self.download(),
            Stage::Verifying => self.verify(),
            Stage::Extracting => self.extract(),
            Stage::Materializing => self.materialize(),
            Stage::Done => Ok(Event::Materialized),
        }
    }

    fn start(&mut self) -> Result<Event, FetchErrorKind> {
        if let Some(dir) = &self.request.cache_dir {
            self.mode = Mode::Cached(CacheStore::open(dir)?);
        }
        Ok(Event::Started {
            cache_configured: matches!(self.mode, Mode::Cached(_)),
        })
    }

    fn resolve_cache(&mut self) -> Event {
        let status = match &self.mode {
            Mode::Cached(cache) => cache.resolve(self.spec),
            Mode::Direct { .. } => CacheStatus::Missing,
        };
        tracing::info!(%status, "cache resolved");
        self.cache_status = Some(status);
        Event::CacheResolved(status)
    }

    fn download(&mut self) -> Result<Event, FetchErrorKind> {
        let dest = match &mut self.mode {
            Mode::Cached(cache) => cache.partial_download_path(self.spec),
            Mode::Direct { scratch } => {
                let dir = tempfile::Builder::new()
                    .prefix("datamirror-")
                    .tempdir()
                    .map_err(|source| FetchErrorKind::Write {
                        path: std::env::temp_dir(),
                        source,
                    })?;
                let file_name = archive_file_name(
                    &self.spec.source_url,
                    &self.spec.name,
                    self.spec.archive_format,
                );
                let dest = dir.path().join(file_name);
                *scratch = Some(dir);
                dest
            }
        };
        let url = self.spec.source_url.as_str();
        match self.transport.fetch(url, &dest) {
            Ok(bytes) => {
                self.downloaded_bytes = Some(bytes);
                self.archive = Some(dest);
                Ok(Event::Downloaded)
            }
            Err(source) => {
                storage::discard(&dest);
                Err(FetchErrorKind::Download {
                    url: url.to_string(),
                    source,
                })
            }
        }
    }

    fn downloaded_archive(&self) -> Result<&Path, FetchErrorKind> {
        self.archive
            .as_deref()
            .ok_or_else(|| FetchErrorKind::MissingContent {
                path: PathBuf::from(&self.spec.source_url),
            })
    }

    fn verify(&mut self) -> Result<Event, FetchErrorKind> {
        let path = self.downloaded_archive()?.to_path_buf();
        let expected = &self.spec.expected_checksum;
        let actual = match checksum::check(&path, expected) {
            Verdict::Match => {
                tracing::info!(%expected, "checksum verified");
                return Ok(Event::Verified);
            }
            Verdict::Mismatch { actual } => actual,
            Verdict::Unreadable { reason } => format!("unreadable ({})", reason),
        };
        storage::discard(&path);
        self.archive = None;
        Err(FetchErrorKind::Checksum {
            path,
            expected: expected.clone(),
            actual,
        })
    }

    fn extract(&mut self) -> Result<Event, FetchErrorKind> {
        let archive_path = self.downloaded_archive()?.to_path_buf();
        match &self.mode {
            Mode::Cached(cache) => {
                let report = cache.store(self.spec, &archive_path)?;
                ensure_subdir(&cache.extracted_dir(self.spec), self.spec)?;
                self.extracted = Some(report);
                Ok(Event::Extracted { into_cache: true })
            }
            Mode::Direct { .. } => {
                let download_dir = &self.request.download_dir;
                let report = archive::extract(
                    &archive_path,
                    self.spec.archive_format,
                    download_dir,
                    &self.spec.skip_entries,
                )?;
                self.written = report.top_level.iter().map(|n| download_dir.join(n)).collect();
                self.extracted = Some(report);
                ensure_subdir(download_dir, self.spec)?;
                // Drop the scratch dir and the archive inside it.
                self.mode = Mode::Direct { scratch: None };
                self.archive = None;
                Ok(Event::Extracted { into_cache: false })
            }
        }
    }

    fn materialize(&mut self) -> Result<Event, FetchErrorKind> {
        let Mode::Cached(cache) = &self.mode else {
            return Ok(Event::Materialized);
        };
        let download_dir = &self.request.download_dir;
        let report = cache.materialize(self.spec, download_dir)?;
        self.written = cache
            .extracted_top_level(self.spec)?
            .into_iter()
            .map(|n| download_dir.join(n))
            .collect();
        self.materialized = Some(report);
        ensure_subdir(download_dir, self.spec)?;
        Ok(Event::Materialized)
    }

    fn finish(self, stages: Vec<Stage>) -> FetchOutcome {
        FetchOutcome {
            dataset: self.spec.name.clone(),
            dataset_dir: self.request.download_dir.join(&self.spec.extracted_subdir_name),
            written: self.written,
            cache_status: self.cache_status,
            downloaded_bytes: self.downloaded_bytes,
            extracted: self.extracted,
            materialized: self.materialized,
            stages,
        }
    }
}

fn ensure_subdir(root: &Path, spec: &DatasetSpec) -> Result<(), FetchErrorKind> {
    let path = root.join(&spec.extracted_subdir_name);
    if path.is_dir() {
        Ok(())
    } else {
        Err(FetchErrorKind::MissingContent { path })
    }
}
