//! Byte-stream fetch of a dataset archive from its mirror.
//!
//! The pipeline only needs "put the body of this URL into that file";
//! [`Transport`] is that seam, and [`CurlTransport`] is the libcurl-backed
//! implementation used outside tests.

mod http;
mod progress;

pub use http::{CurlOptions, CurlTransport};
pub use progress::ProgressStats;

use std::io;
use std::path::{Path, PathBuf};

/// Failure fetching a URL.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Curl reported an error (timeout, connection, DNS, unsupported scheme...).
    #[error(transparent)]
    Curl(#[from] curl::Error),
    /// The server answered with a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// The body ended before the advertised `Content-Length`.
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },
    /// Writing the body to disk failed.
    #[error("storage: cannot write {}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Blocking fetch of `url` into the file at `dest`.
pub trait Transport {
    /// Write the full body of `url` to `dest` (created or truncated) and
    /// return the number of bytes written. On error `dest` may hold a partial
    /// body; the caller owns cleanup.
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64, TransportError> {
        (**self).fetch(url, dest)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64, TransportError> {
        (**self).fetch(url, dest)
    }
}
