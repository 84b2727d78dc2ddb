//! Spotify credential and endpoint configuration

use std::fmt;

use crate::{get_env_or_default, get_required_env, parse_env, ConfigResult};

const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
const DEFAULT_REDIRECT_URI: &str = "https://example.com/callback";

/// Spotify Web API configuration
#[derive(Clone)]
pub struct SpotifyConfig {
    /// Application client ID
    pub client_id: String,

    /// Application client secret
    pub client_secret: String,

    /// Long-lived refresh token minted by the authorize utility
    ///
    /// Empty only while the authorize utility is running.
    pub refresh_token: String,

    /// Redirect URI registered with the Spotify application
    pub redirect_uri: String,

    /// Web API base URL
    pub api_url: String,

    /// Accounts service base URL (token and authorize endpoints)
    pub accounts_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum attempts for rate-limited or failing requests
    pub max_retries: u32,

    /// Base delay for exponential backoff (milliseconds)
    pub retry_base_delay_ms: u64,
}

impl fmt::Debug for SpotifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("api_url", &self.api_url)
            .field("accounts_url", &self.accounts_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .finish()
    }
}

impl SpotifyConfig {
    /// Load Spotify configuration from environment variables
    ///
    /// Requires `JUNK_MOVER_CLIENT_ID`, `JUNK_MOVER_CLIENT_SECRET` and
    /// `JUNK_MOVER_REFRESH_TOKEN`.
    pub fn from_env() -> ConfigResult<Self> {
        let mut config = Self::from_env_without_refresh_token()?;
        config.refresh_token = get_required_env("JUNK_MOVER_REFRESH_TOKEN")?;
        Ok(config)
    }

    /// Load configuration for the authorize utility, which runs before a
    /// refresh token exists
    pub fn from_env_without_refresh_token() -> ConfigResult<Self> {
        Ok(Self {
            client_id: get_required_env("JUNK_MOVER_CLIENT_ID")?,
            client_secret: get_required_env("JUNK_MOVER_CLIENT_SECRET")?,
            refresh_token: String::new(),
            redirect_uri: get_env_or_default("JUNK_MOVER_REDIRECT_URI", DEFAULT_REDIRECT_URI),
            api_url: get_env_or_default("SPOTIFY_API_URL", DEFAULT_API_URL),
            accounts_url: get_env_or_default("SPOTIFY_ACCOUNTS_URL", DEFAULT_ACCOUNTS_URL),
            timeout_secs: parse_env("SPOTIFY_TIMEOUT", 30)?,
            max_retries: parse_env("JUNK_MOVER_MAX_RETRIES", 5)?,
            retry_base_delay_ms: parse_env("JUNK_MOVER_RETRY_BASE_DELAY_MS", 500)?,
        })
    }

    /// Create a configuration with explicit credentials (useful for testing)
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            accounts_url: DEFAULT_ACCOUNTS_URL.to_string(),
            timeout_secs: 30,
            max_retries: 5,
            retry_base_delay_ms: 500,
        }
    }

    /// Point both the Web API and the accounts service at one base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.api_url = format!("{}/v1", base_url.trim_end_matches('/'));
        self.accounts_url = base_url;
        self
    }

    /// Get the full URL for a Web API path
    pub fn api_endpoint(&self, path: &str) -> String {
        let base = self.api_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    /// Get the token endpoint URL
    pub fn token_url(&self) -> String {
        format!("{}/api/token", self.accounts_url.trim_end_matches('/'))
    }

    /// Get the authorize endpoint URL
    pub fn authorize_url(&self) -> String {
        format!("{}/authorize", self.accounts_url.trim_end_matches('/'))
    }
}
