//! Triage job configuration types

use std::path::PathBuf;

use crate::{get_env_or_default, get_required_env, parse_env, ConfigError, ConfigResult};

const DEFAULT_BUCKET_SUFFIX: &str = "Junk Drawer";
const DEFAULT_LOG_DIR: &str = "logs";

/// Settings for one triage run
#[derive(Debug, Clone)]
pub struct TriageConfig {
    /// Exact name of the holding playlist to triage
    pub source_playlist: String,

    /// Age threshold in days
    ///
    /// Kept signed so a negative value survives parsing and is rejected by
    /// [`TriageConfig::validate`] rather than by a parse error.
    pub duration_days: i64,

    /// Suffix appended to the two-digit year in destination playlist names
    pub bucket_suffix: String,

    /// Directory holding the daily audit log files
    pub log_dir: PathBuf,

    /// Whether playlist descriptions are annotated after each run
    pub update_descriptions: bool,
}

impl TriageConfig {
    /// Load triage configuration from environment variables
    pub fn from_env() -> ConfigResult<Self> {
        let duration = get_required_env("JUNK_MOVER_DURATION_DAYS")?;
        let duration_days = duration.trim().parse::<i64>().map_err(|_| {
            ConfigError::InvalidValue(
                "JUNK_MOVER_DURATION_DAYS".to_string(),
                "must be an integer".to_string(),
            )
        })?;

        Ok(Self {
            source_playlist: get_required_env("JUNK_MOVER_SOURCE_PLAYLIST")?,
            duration_days,
            bucket_suffix: get_env_or_default("JUNK_MOVER_BUCKET_SUFFIX", DEFAULT_BUCKET_SUFFIX),
            log_dir: PathBuf::from(get_env_or_default("JUNK_MOVER_LOG_DIR", DEFAULT_LOG_DIR)),
            update_descriptions: parse_env("JUNK_MOVER_UPDATE_DESCRIPTIONS", true)?,
        })
    }

    /// Create a configuration for the given source playlist and threshold
    pub fn new(source_playlist: impl Into<String>, duration_days: i64) -> Self {
        Self {
            source_playlist: source_playlist.into(),
            duration_days,
            bucket_suffix: DEFAULT_BUCKET_SUFFIX.to_string(),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            update_descriptions: true,
        }
    }

    /// Set the audit log directory
    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = log_dir.into();
        self
    }

    /// Enable or disable playlist description annotations
    pub fn with_descriptions(mut self, enabled: bool) -> Self {
        self.update_descriptions = enabled;
        self
    }

    /// Check the invariants a run depends on
    ///
    /// Must be called before any remote call is made.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.duration_days < 0 {
            return Err(ConfigError::ValidationError(format!(
                "JUNK_MOVER_DURATION_DAYS cannot be negative (got {}); use 0 for 'today'",
                self.duration_days
            )));
        }

        if self.source_playlist.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "JUNK_MOVER_SOURCE_PLAYLIST cannot be empty".to_string(),
            ));
        }

        if self.bucket_suffix.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "JUNK_MOVER_BUCKET_SUFFIX cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
