//! Error handling for the triage job
//!
//! Job-level errors abort the run; everything else is confined to the
//! tracks it affects and recorded as a failed decision.

use junk_mover_shared_config::ConfigError;
use junk_mover_spotify_client::SpotifyError;
use thiserror::Error;

/// Main job error type
#[derive(Error, Debug)]
pub enum JobError {
    /// Invalid or missing configuration, or an ambiguous playlist name
    #[error("configuration error: {0}")]
    Config(String),

    /// Token exchange failed or the access token kept being rejected
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Source playlist does not exist for this user
    #[error("not found: {0}")]
    NotFound(String),

    /// Spotify rejected a request, or kept failing until the retry budget ran out
    #[error("Spotify API error{}: {message}", status_suffix(.status))]
    Api { status: Option<u16>, message: String },

    /// Rate limit, server error or network failure that was not retried
    #[error("transient Spotify failure: {0}")]
    Transient(String),

    /// The audit log could not be written
    #[error("audit log error: {0}")]
    AuditLog(#[from] std::io::Error),
}

impl JobError {
    /// Check whether this error must end the run
    ///
    /// `Api` and `Transient` errors only fail the tracks they touch.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Auth(_) | Self::NotFound(_) | Self::AuditLog(_)
        )
    }

    /// Get a severity level for logging
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Config(_) | Self::Auth(_) | Self::NotFound(_) => ErrorSeverity::Critical,
            Self::Api { .. } | Self::AuditLog(_) => ErrorSeverity::Error,
            Self::Transient(_) => ErrorSeverity::Warning,
        }
    }

    /// Log the error with appropriate severity
    pub fn log(&self) {
        match self.severity() {
            ErrorSeverity::Critical => {
                tracing::error!(error = %self, fatal = self.is_fatal(), "Critical job error");
            }
            ErrorSeverity::Error => {
                tracing::error!(error = %self, fatal = self.is_fatal(), "Job error");
            }
            ErrorSeverity::Warning => {
                tracing::warn!(error = %self, fatal = self.is_fatal(), "Job warning");
            }
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" {}", s)).unwrap_or_default()
}

/// Error severity levels for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Errors that stop the run and need operator attention
    Critical,
    /// Standard errors
    Error,
    /// Expected, recoverable failures
    Warning,
}

/// Result type alias for job operations
pub type JobResult<T> = Result<T, JobError>;

// ========== Conversion Implementations ==========

impl From<ConfigError> for JobError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<SpotifyError> for JobError {
    fn from(err: SpotifyError) -> Self {
        match err {
            SpotifyError::Auth(message) | SpotifyError::Unauthorized(message) => Self::Auth(message),
            SpotifyError::AmbiguousPlaylist { .. } | SpotifyError::InvalidInput(_) => {
                Self::Config(err.to_string())
            }
            SpotifyError::Api { status, message } => Self::Api {
                status: Some(status),
                message,
            },
            SpotifyError::RetriesExhausted { status, .. } => Self::Api {
                status,
                message: err.to_string(),
            },
            SpotifyError::Parse(_) => Self::Api {
                status: None,
                message: err.to_string(),
            },
            SpotifyError::RateLimited { .. }
            | SpotifyError::Server { .. }
            | SpotifyError::Timeout
            | SpotifyError::Http(_) => Self::Transient(err.to_string()),
        }
    }
}
