//! Single-stream GET via libcurl, written sequentially to a `.part` file.

use super::{ProgressStats, Transport, TransportError};
use crate::config::DatamirrorConfig;
use crate::retry::{run_with_retry, RetryPolicy};
use crate::storage::PartFileWriter;
use std::path::Path;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

/// Curl settings shared by every transfer.
#[derive(Debug, Clone)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    /// Abort when throughput stays below `low_speed_limit` bytes/s for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    /// Hard wall-clock cap for one attempt.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
            timeout: Duration::from_secs(6 * 3600),
            user_agent: format!("datamirror/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Minimum gap between two progress snapshots sent for one attempt.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(200);

/// libcurl-backed [`Transport`] with optional retry/backoff.
#[derive(Debug, Clone, Default)]
pub struct CurlTransport {
    options: CurlOptions,
    retry: Option<RetryPolicy>,
    progress: Option<Sender<ProgressStats>>,
}

impl CurlTransport {
    pub fn new(options: CurlOptions, retry: Option<RetryPolicy>) -> Self {
        Self {
            options,
            retry,
            progress: None,
        }
    }

    /// Build from the loaded config (timeouts and `[retry]` section).
    pub fn from_config(cfg: &DatamirrorConfig) -> Self {
        let options = CurlOptions {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            low_speed_time: Duration::from_secs(cfg.low_speed_time_secs),
            ..CurlOptions::default()
        };
        Self::new(options, cfg.retry.as_ref().map(RetryPolicy::from))
    }

    /// Send [`ProgressStats`] to `tx` while downloading. The last snapshot of
    /// a successful attempt always has `bytes_done == total_bytes`.
    pub fn with_progress(mut self, tx: Sender<ProgressStats>) -> Self {
        self.progress = Some(tx);
        self
    }

    fn fetch_once(&self, url: &str, dest: &Path) -> Result<u64, TransportError> {
        let mut storage = PartFileWriter::create(dest).map_err(|e| storage_error(dest, e))?;
        let mut write_error: Option<anyhow::Error> = None;
        let started = Instant::now();
        let mut last_report: Option<Instant> = None;

        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.useragent(&self.options.user_agent)?;
        easy.connect_timeout(self.options.connect_timeout)?;
        easy.low_speed_limit(self.options.low_speed_limit)?;
        easy.low_speed_time(self.options.low_speed_time)?;
        easy.timeout(self.options.timeout)?;
        easy.progress(self.progress.is_some())?;

        let performed = {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| match storage.write(data) {
                Ok(()) => Ok(data.len()),
                Err(e) => {
                    write_error = Some(e);
                    // Returning a short count makes curl abort with a write error.
                    Ok(0)
                }
            })?;
            if let Some(tx) = &self.progress {
                transfer.progress_function(|total, now, _, _| {
                    let due = last_report.map_or(true, |t| t.elapsed() >= PROGRESS_INTERVAL);
                    if due && now > 0.0 {
                        last_report = Some(Instant::now());
                        let _ = tx.send(ProgressStats {
                            bytes_done: now as u64,
                            total_bytes: (total > 0.0).then(|| total as u64),
                            elapsed_secs: started.elapsed().as_secs_f64(),
                        });
                    }
                    true
                })?;
            }
            transfer.perform()
        };
        if let Err(e) = performed {
            if e.is_write_error() {
                if let Some(err) = write_error.take() {
                    return Err(storage_error(dest, err));
                }
            }
            return Err(TransportError::Curl(e));
        }

        // file:// and similar report 0; only HTTP statuses are checked.
        let code = easy.response_code()?;
        if code != 0 && !(200..300).contains(&code) {
            return Err(TransportError::Http(code));
        }

        let received = storage.written();
        let advertised = easy.content_length_download()?;
        if advertised >= 0.0 && received != advertised as u64 {
            return Err(TransportError::PartialTransfer {
                expected: advertised as u64,
                received,
            });
        }
        storage.sync().map_err(|e| storage_error(dest, e))?;
        if let Some(tx) = &self.progress {
            let _ = tx.send(ProgressStats {
                bytes_done: received,
                total_bytes: Some(received),
                elapsed_secs: started.elapsed().as_secs_f64(),
            });
        }
        Ok(received)
    }
}

fn storage_error(dest: &Path, e: anyhow::Error) -> TransportError {
    let source = e
        .downcast::<std::io::Error>()
        .unwrap_or_else(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("{:#}", e)));
    TransportError::Storage {
        path: dest.to_path_buf(),
        source,
    }
}

impl Transport for CurlTransport {
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64, TransportError> {
        tracing::info!(url, dest = %dest.display(), "downloading");
        let bytes = match &self.retry {
            Some(policy) => run_with_retry(policy, || self.fetch_once(url, dest))?,
            None => self.fetch_once(url, dest)?,
        };
        tracing::info!(url, bytes, "download finished");
        Ok(bytes)
    }
}
