//! Shared configuration types for Junk Mover binaries
//!
//! This crate provides the configuration consumed by the triage job, the
//! profile check and the one-time authorization utility, so every binary
//! reads the same environment variables the same way.

mod env_file;
mod error;
mod spotify;
mod triage;

pub use env_file::{load_dotenv, upsert_env_var};
pub use error::{ConfigError, ConfigResult};
pub use spotify::SpotifyConfig;
pub use triage::TriageConfig;

use std::env;

/// Configuration for a complete triage run
#[derive(Debug, Clone)]
pub struct JunkMoverConfig {
    /// Spotify credentials and endpoints
    pub spotify: SpotifyConfig,

    /// Source playlist, age threshold and audit settings
    pub triage: TriageConfig,
}

impl JunkMoverConfig {
    /// Load the full configuration from environment variables
    ///
    /// The log filter is not part of it; binaries read `RUST_LOG` through
    /// `tracing_subscriber::EnvFilter` before loading anything else.
    ///
    /// Values are parsed here but not validated; call
    /// [`TriageConfig::validate`] before contacting Spotify.
    pub fn from_env() -> ConfigResult<Self> {
        Ok(Self {
            spotify: SpotifyConfig::from_env()?,
            triage: TriageConfig::from_env()?,
        })
    }
}

/// Helper function to get a required, non-empty environment variable
pub fn get_required_env(name: &str) -> ConfigResult<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnvVar(name.to_string())),
    }
}

/// Helper function to get an optional environment variable with a default
pub fn get_env_or_default(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Helper function to parse an environment variable into a specific type
pub fn parse_env<T>(name: &str, default: T) -> ConfigResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e))),
        Err(_) => Ok(default),
    }
}
