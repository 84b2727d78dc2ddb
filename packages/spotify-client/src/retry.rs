//! Bounded retry policy for transient Spotify failures

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};

use crate::error::SpotifyError;

/// Default number of attempts per request (first try included)
const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Base delay for exponential backoff (milliseconds)
const DEFAULT_BASE_DELAY_MS: u64 = 500;

/// Upper bound for an exponential backoff wait
const DEFAULT_MAX_DELAY_SECS: u64 = 30;

/// Upper bound for a server-provided `Retry-After` wait
const DEFAULT_MAX_RETRY_AFTER_SECS: u64 = 3600;

/// How often and how long to wait before re-issuing a failed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each following one
    pub base_delay: Duration,
    /// Cap applied to backoff delays
    pub max_delay: Duration,
    /// Ceiling for `Retry-After` hints; anything below it is honored as sent
    pub max_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_secs(DEFAULT_MAX_DELAY_SECS),
            max_retry_after: Duration::from_secs(DEFAULT_MAX_RETRY_AFTER_SECS),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given attempt budget and base delay
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            ..Self::default()
        }
    }

    /// Policy that retries without waiting
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_retry_after: Duration::ZERO,
        }
    }

    /// Exponential backoff delay after the given failed attempt (1-based)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(2u32.pow(exponent))
            .min(self.max_delay)
    }

    /// Delay to apply before retrying after `error`
    ///
    /// A `Retry-After` hint replaces the exponential delay and is not
    /// subject to `max_delay`.
    pub fn delay_for(&self, error: &SpotifyError, attempt: u32) -> Duration {
        match error {
            SpotifyError::RateLimited {
                retry_after: Some(hint),
            } => (*hint).min(self.max_retry_after),
            _ => self.backoff_delay(attempt),
        }
    }
}

/// Parse a `Retry-After` header given in seconds
pub(crate) fn retry_after_hint(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
