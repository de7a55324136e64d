//! Pipeline stages and the transition function between them.

use crate::cache::CacheStatus;
use std::fmt;

/// Where a fetch is. Failure is not a stage: any stage may end the run with a
/// [`FetchError`](super::FetchError) that records the stage it happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Start,
    ResolvingCache,
    Downloading,
    Verifying,
    Extracting,
    Materializing,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::ResolvingCache => "resolving cache",
            Stage::Downloading => "downloading",
            Stage::Verifying => "verifying",
            Stage::Extracting => "extracting",
            Stage::Materializing => "materializing",
            Stage::Done => "done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a stage finished with. Each stage produces exactly one kind of event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Started { cache_configured: bool },
    CacheResolved(CacheStatus),
    Downloaded,
    Verified,
    Extracted { into_cache: bool },
    Materialized,
}

impl Event {
    /// The stage that follows this event.
    pub fn next_stage(&self) -> Stage {
        match *self {
            Event::Started { cache_configured: true } => Stage::ResolvingCache,
            Event::Started { cache_configured: false } => Stage::Downloading,
            Event::CacheResolved(CacheStatus::Valid) => Stage::Materializing,
            Event::CacheResolved(CacheStatus::Missing | CacheStatus::Stale) => Stage::Downloading,
            Event::Downloaded => Stage::Verifying,
            Event::Verified => Stage::Extracting,
            Event::Extracted { into_cache: true } => Stage::Materializing,
            Event::Extracted { into_cache: false } => Stage::Done,
            Event::Materialized => Stage::Done,
        }
    }
}
