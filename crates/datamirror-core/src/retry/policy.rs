use crate::config::RetryConfig;
use std::time::Duration;

/// Why a transfer failed, as far as retrying is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connect or transfer timed out, including the low-speed abort.
    Timeout,
    /// Mirror asked us to back off (429, 503).
    Throttled,
    /// Connection refused or reset, DNS failure, body cut short.
    Connection,
    /// Other 5xx from the mirror.
    Http5xx(u16),
    /// Not worth retrying: 4xx, local disk errors, bad URLs.
    Other,
}

impl ErrorKind {
    pub fn is_transient(&self) -> bool {
        !matches!(self, ErrorKind::Other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    NoRetry,
    RetryAfter(Duration),
}

/// Capped exponential backoff, built from the `[retry]` config section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Attempts per download, counting the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each further failure.
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            base_delay: Duration::from_secs_f64(cfg.base_delay_secs.max(0.0).min(3600.0)),
            max_delay: Duration::from_secs(cfg.max_delay_secs),
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`, or `NoRetry`.
    ///
    /// `attempt` is 1-based: the number of attempts made so far.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts || !kind.is_transient() {
            return RetryDecision::NoRetry;
        }
        let doublings = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1u32 << doublings);
        RetryDecision::RetryAfter(delay.min(self.max_delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delay(p: &RetryPolicy, attempt: u32) -> Duration {
        match p.decide(attempt, ErrorKind::Timeout) {
            RetryDecision::RetryAfter(d) => d,
            RetryDecision::NoRetry => panic!("expected retry at attempt {attempt}"),
        }
    }

    #[test]
    fn default_matches_config_defaults() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, 5);
        assert_eq!(p.base_delay, Duration::from_millis(250));
        assert_eq!(p.max_delay, Duration::from_secs(30));
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let p = RetryPolicy::default();
        assert_eq!(p.decide(1, ErrorKind::Other), RetryDecision::NoRetry);
        assert!(matches!(p.decide(1, ErrorKind::Http5xx(502)), RetryDecision::RetryAfter(_)));
    }

    #[test]
    fn backoff_doubles_until_capped() {
        let p = RetryPolicy {
            max_attempts: 40,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(2),
        };
        assert_eq!(delay(&p, 1), Duration::from_millis(250));
        assert_eq!(delay(&p, 2), Duration::from_millis(500));
        assert_eq!(delay(&p, 3), Duration::from_secs(1));
        assert_eq!(delay(&p, 4), Duration::from_secs(2));
        assert_eq!(delay(&p, 30), Duration::from_secs(2));
    }

    #[test]
    fn from_config_clamps_values() {
        let cfg = RetryConfig {
            max_attempts: 0,
            base_delay_secs: 0.5,
            max_delay_secs: 4,
        };
        let p = RetryPolicy::from(&cfg);
        assert_eq!(p.max_attempts, 1);
        assert_eq!(p.base_delay, Duration::from_millis(500));
        assert_eq!(p.max_delay, Duration::from_secs(4));
        assert_eq!(p.decide(1, ErrorKind::Timeout), RetryDecision::NoRetry);

        let negative = RetryPolicy::from(&RetryConfig {
            base_delay_secs: -3.0,
            ..RetryConfig::default()
        });
        assert_eq!(negative.base_delay, Duration::ZERO);
    }

    #[test]
    fn stops_at_max_attempts() {
        let p = RetryPolicy {
            max_attempts: 3,
            ..RetryPolicy::default()
        };
        assert!(matches!(p.decide(1, ErrorKind::Throttled), RetryDecision::RetryAfter(_)));
        assert!(matches!(p.decide(2, ErrorKind::Throttled), RetryDecision::RetryAfter(_)));
        assert_eq!(p.decide(3, ErrorKind::Throttled), RetryDecision::NoRetry);
    }
}
