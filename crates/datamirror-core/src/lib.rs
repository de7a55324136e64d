//! Fetch named datasets from their mirrors, verify them, and unpack them into
//! a local directory, optionally through a shared extraction cache.

pub mod archive;
pub mod cache;
pub mod checksum;
pub mod config;
pub mod logging;
pub mod pipeline;
pub mod registry;
pub mod retry;
pub mod storage;
pub mod transport;
pub mod url_model;

pub use pipeline::{FetchError, FetchErrorKind, FetchOutcome, FetchPipeline, FetchRequest};
pub use registry::{DatasetRegistry, DatasetSpec};
