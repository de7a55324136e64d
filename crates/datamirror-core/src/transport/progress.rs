//! Progress snapshots for a download in flight (bytes done, rate, ETA).
//!
//! [`CurlTransport`](super::CurlTransport) sends these over a channel when one
//! is attached; the CLI turns them into a throttled status line.

/// Snapshot of one download attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressStats {
    /// Bytes received so far in this attempt.
    pub bytes_done: u64,
    /// From `Content-Length`; `None` while unknown.
    pub total_bytes: Option<u64>,
    /// Seconds since the attempt started.
    pub elapsed_secs: f64,
}

impl ProgressStats {
    /// Download rate in bytes per second (0 if elapsed is 0).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining (None without a total or a rate).
    pub fn eta_secs(&self) -> Option<f64> {
        let remaining = self.total_bytes?.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Fraction complete in [0.0, 1.0], when the total is known.
    pub fn fraction(&self) -> Option<f64> {
        match self.total_bytes? {
            0 => Some(1.0),
            total => Some((self.bytes_done as f64 / total as f64).min(1.0)),
        }
    }

    /// True once every advertised byte has arrived.
    pub fn is_complete(&self) -> bool {
        self.total_bytes.is_some_and(|total| self.bytes_done >= total)
    }
}
