//! Retry and backoff policy for the HTTP transport.
//!
//! The fetch pipeline treats a failed download as final; retrying transient
//! network failures is the transport's business, and this module is how
//! `CurlTransport` decides whether and when to try again.

mod classify;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
