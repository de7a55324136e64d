use super::Stage;
use crate::archive::ExtractError;
use crate::cache::CacheError;
use crate::checksum::Checksum;
use crate::transport::TransportError;
use std::io;
use std::path::PathBuf;

/// A fetch that ended before [`Stage::Done`].
#[derive(Debug, thiserror::Error)]
#[error("fetch '{dataset}' failed at stage '{stage}'")]
pub struct FetchError {
    pub dataset: String,
    /// Stage the run was in when it failed.
    pub stage: Stage,
    #[source]
    pub kind: FetchErrorKind,
}

impl FetchError {
    pub(crate) fn new(dataset: &str, stage: Stage, kind: FetchErrorKind) -> Self {
        Self {
            dataset: dataset.to_string(),
            stage,
            kind,
        }
    }

    /// True when extraction was refused because an entry escapes the destination.
    pub fn is_security_rejection(&self) -> bool {
        matches!(&self.kind, FetchErrorKind::Extract(e) if e.is_security_rejection())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchErrorKind {
    #[error("unknown dataset '{name}'; available: {available}")]
    UnknownDataset { name: String, available: String },
    #[error("download of {url} failed")]
    Download {
        url: String,
        #[source]
        source: TransportError,
    },
    #[error("checksum mismatch for {}: expected {expected}, got {actual}", path.display())]
    Checksum {
        path: PathBuf,
        expected: Checksum,
        actual: String,
    },
    #[error(transparent)]
    Extract(ExtractError),
    #[error("cannot write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("expected directory {} is missing after extraction", path.display())]
    MissingContent { path: PathBuf },
}

impl From<ExtractError> for FetchErrorKind {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::Write { path, source } => FetchErrorKind::Write { path, source },
            other => FetchErrorKind::Extract(other),
        }
    }
}

impl From<CacheError> for FetchErrorKind {
    fn from(e: CacheError) -> Self {
        match e {
            CacheError::Write { path, source } => FetchErrorKind::Write { path, source },
            CacheError::Extract(e) => e.into(),
            CacheError::Copy(e) => FetchErrorKind::Write {
                path: e.to,
                source: e.source,
            },
        }
    }
}
