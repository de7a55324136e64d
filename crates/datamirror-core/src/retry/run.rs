//! Retry loop: run a closure until success or policy says stop.

use super::classify;
use super::policy::{RetryDecision, RetryPolicy};
use crate::transport::TransportError;

/// Runs `f` until it succeeds or the retry policy says to stop.
/// On a retryable failure, sleeps for the backoff duration then tries again.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, mut f: F) -> Result<T, TransportError>
where
    F: FnMut() -> Result<T, TransportError>,
{
    let mut attempt = 1u32;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) => {
                let kind = classify::classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        tracing::warn!(attempt, ?kind, delay_ms = d.as_millis() as u64, "transfer failed, retrying: {}", e);
                        std::thread::sleep(d);
                        attempt += 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[test]
    fn retries_transient_then_succeeds() {
        let mut calls = 0;
        let out = run_with_retry(&fast_policy(5), || {
            calls += 1;
            if calls < 3 {
                Err(TransportError::Http(503))
            } else {
                Ok(42u64)
            }
        })
        .unwrap();
        assert_eq!(out, 42);
        assert_eq!(calls, 3);
    }

    #[test]
    fn permanent_error_not_retried() {
        let mut calls = 0;
        let err = run_with_retry(&fast_policy(5), || -> Result<(), _> {
            calls += 1;
            Err(TransportError::Http(404))
        })
        .unwrap_err();
        assert!(matches!(err, TransportError::Http(404)));
        assert_eq!(calls, 1);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let mut calls = 0;
        let err = run_with_retry(&fast_policy(3), || -> Result<(), _> {
            calls += 1;
            Err(TransportError::Http(500))
        })
        .unwrap_err();
        assert!(matches!(err, TransportError::Http(500)));
        assert_eq!(calls, 3);
    }
}
