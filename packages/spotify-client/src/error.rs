//! Spotify API error types

use std::time::Duration;

use thiserror::Error;

/// Spotify API client errors
#[derive(Error, Debug)]
pub enum SpotifyError {
    /// Refresh-token or authorization-code exchange failed
    ///
    /// Retrying with the same grant cannot succeed, so this is never retried.
    #[error("token exchange failed: {0}")]
    Auth(String),

    /// Access token was rejected by the Web API
    #[error("access token rejected: {0}")]
    Unauthorized(String),

    /// Non-retryable rejection (4xx other than 401 and 429)
    #[error("Spotify API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Rate limited by Spotify
    #[error("rate limited by Spotify API")]
    RateLimited { retry_after: Option<Duration> },

    /// Spotify returned a 5xx response
    #[error("Spotify server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Request timeout
    #[error("request to Spotify timed out")]
    Timeout,

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("failed to parse Spotify response: {0}")]
    Parse(#[from] serde_json::Error),

    /// All retry attempts for a transient failure were used up
    #[error("all {attempts} attempts failed, last error: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        status: Option<u16>,
        last_error: String,
    },

    /// More than one owned playlist carries the same name
    #[error("{count} playlists named '{name}' are owned by this user")]
    AmbiguousPlaylist { name: String, count: usize },

    /// Invalid input provided to a client method
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl SpotifyError {
    /// Check if this error is retryable (transient failure)
    ///
    /// Retries on rate limiting, timeouts, transport errors and 5xx.
    /// Does NOT retry on other client errors.
    pub fn is_retryable(&self) -> bool {
        match self {
            SpotifyError::RateLimited { .. } | SpotifyError::Server { .. } | SpotifyError::Timeout => {
                true
            }
            SpotifyError::Http(e) => {
                if e.is_timeout() || e.is_connect() {
                    return true;
                }
                matches!(e.status(), Some(status) if status.is_server_error())
            }
            _ => false,
        }
    }

    /// HTTP status associated with this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            SpotifyError::Unauthorized(_) => Some(401),
            SpotifyError::Api { status, .. } | SpotifyError::Server { status, .. } => Some(*status),
            SpotifyError::RateLimited { .. } => Some(429),
            SpotifyError::RetriesExhausted { status, .. } => *status,
            SpotifyError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if this error means the run can no longer authenticate
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, SpotifyError::Auth(_))
    }
}

/// Result type for Spotify operations
pub type SpotifyResult<T> = Result<T, SpotifyError>;
