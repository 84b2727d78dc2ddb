//! Access-token lifecycle for the Spotify accounts service

use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use junk_mover_shared_config::SpotifyConfig;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::error::{SpotifyError, SpotifyResult};
use crate::models::{TokenErrorResponse, TokenResponse};
use crate::retry::{retry_after_hint, RetryPolicy};

/// Tokens are renewed this long before Spotify says they expire
const EXPIRY_SAFETY_MARGIN: Duration = Duration::from_secs(60);

/// Scopes needed to read the profile and move tracks between playlists
pub const REQUIRED_SCOPES: &str =
    "user-read-email user-read-private playlist-modify-public playlist-modify-private";

/// Source of bearer tokens for Web API calls
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Return a token believed to be valid, exchanging for a new one if needed
    async fn access_token(&self) -> SpotifyResult<String>;

    /// Forget the cached token so the next call exchanges again
    fn invalidate(&self);
}

/// A short-lived bearer token
#[derive(Clone)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: Instant,
}

impl AccessToken {
    /// Check whether the token is still usable at `now`, keeping a safety margin
    pub fn is_fresh(&self, now: Instant) -> bool {
        now + EXPIRY_SAFETY_MARGIN < self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Default)]
struct TokenState {
    current: Option<AccessToken>,
    rotated_refresh_token: Option<String>,
    exchanges: u32,
}

/// Exchanges the stored refresh token for access tokens and caches them
pub struct TokenBroker {
    http_client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    retry_policy: RetryPolicy,
    state: Mutex<TokenState>,
}

impl fmt::Debug for TokenBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenBroker")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

impl TokenBroker {
    /// Create a broker for the credentials in `config`
    ///
    /// # Errors
    /// Returns `SpotifyError::InvalidInput` if the refresh token is empty
    pub fn new(config: &SpotifyConfig) -> SpotifyResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("JunkMover/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_client(config, http_client)
    }

    /// Create a broker with custom HTTP client (for testing)
    pub fn with_client(config: &SpotifyConfig, http_client: Client) -> SpotifyResult<Self> {
        if config.refresh_token.trim().is_empty() {
            return Err(SpotifyError::InvalidInput(
                "refresh token cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            http_client,
            token_url: config.token_url(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            refresh_token: config.refresh_token.clone(),
            retry_policy: RetryPolicy::new(
                config.max_retries,
                Duration::from_millis(config.retry_base_delay_ms),
            ),
            state: Mutex::new(TokenState::default()),
        })
    }

    /// Replace the retry policy used for the token endpoint
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Refresh token returned by Spotify during this run, if it rotated one
    ///
    /// Persisting it is up to the caller.
    pub fn rotated_refresh_token(&self) -> Option<String> {
        self.lock_state().rotated_refresh_token.clone()
    }

    /// Number of refresh-token exchanges performed so far
    pub fn exchange_count(&self) -> u32 {
        self.lock_state().exchanges
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, TokenState> {
        // A poisoned lock only means another caller panicked mid-update;
        // the cached token is still a plain value.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Exchange the refresh token, retrying rate limits and outages
    ///
    /// A rejected grant is returned at once as `SpotifyError::Auth`.
    async fn exchange(&self) -> SpotifyResult<TokenResponse> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", self.refresh_token.as_str()),
        ];
        let mut attempt = 1;

        loop {
            debug!(url = %self.token_url, attempt = attempt, "Exchanging refresh token");
            let result = request_token(
                &self.http_client,
                &self.token_url,
                &self.client_id,
                &self.client_secret,
                &form,
            )
            .await;

            match result {
                Err(e) if e.is_retryable() => {
                    if attempt >= self.retry_policy.max_attempts {
                        return Err(SpotifyError::RetriesExhausted {
                            attempts: attempt,
                            status: e.status(),
                            last_error: e.to_string(),
                        });
                    }
                    let delay = self.retry_policy.delay_for(&e, attempt);
                    warn!(
                        attempt = attempt,
                        max_attempts = self.retry_policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Token endpoint unavailable, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

#[async_trait]
impl AccessTokenProvider for TokenBroker {
    async fn access_token(&self) -> SpotifyResult<String> {
        let cached = {
            let state = self.lock_state();
            state
                .current
                .as_ref()
                .filter(|token| token.is_fresh(Instant::now()))
                .map(|token| token.value.clone())
        };
        if let Some(value) = cached {
            return Ok(value);
        }

        let response = self.exchange().await?;
        let expires_at = Instant::now() + Duration::from_secs(response.expires_in);

        let mut state = self.lock_state();
        state.exchanges += 1;
        if let Some(rotated) = response.refresh_token.filter(|t| *t != self.refresh_token) {
            warn!("Spotify rotated the refresh token; it must be persisted for the next run");
            state.rotated_refresh_token = Some(rotated);
        }
        state.current = Some(AccessToken {
            value: response.access_token.clone(),
            expires_at,
        });

        info!(expires_in = response.expires_in, "Obtained access token");
        Ok(response.access_token)
    }

    fn invalidate(&self) {
        debug!("Invalidating cached access token");
        self.lock_state().current = None;
    }
}

/// POST a grant to the token endpoint and decode the response
///
/// Rate limits, 5xx responses and transport failures come back as their
/// retryable variants; any other rejection is `SpotifyError::Auth`.
async fn request_token(
    http_client: &Client,
    token_url: &str,
    client_id: &str,
    client_secret: &str,
    form: &[(&str, &str)],
) -> SpotifyResult<TokenResponse> {
    let response = http_client
        .post(token_url)
        .basic_auth(client_id, Some(client_secret))
        .form(form)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                SpotifyError::Timeout
            } else {
                SpotifyError::Http(e)
            }
        })?;

    let status = response.status();
    let retry_after = retry_after_hint(response.headers());
    let body = response.text().await?;

    if !status.is_success() {
        let detail = match serde_json::from_str::<TokenErrorResponse>(&body) {
            Ok(err) => match err.error_description {
                Some(description) => format!("{} ({})", err.error, description),
                None => err.error,
            },
            Err(_) => body,
        };

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SpotifyError::RateLimited { retry_after });
        }
        if status.is_server_error() {
            return Err(SpotifyError::Server {
                status: status.as_u16(),
                message: detail,
            });
        }

        warn!(status = status.as_u16(), error = %detail, "Token exchange rejected");
        return Err(SpotifyError::Auth(format!("{}: {}", status.as_u16(), detail)));
    }

    serde_json::from_str(&body)
        .map_err(|e| SpotifyError::Auth(format!("malformed token response: {}", e)))
}

/// Build the consent URL for the authorization-code flow
pub fn authorize_url(config: &SpotifyConfig, scopes: &str) -> SpotifyResult<String> {
    let url = url::Url::parse_with_params(
        &config.authorize_url(),
        &[
            ("client_id", config.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("scope", scopes),
        ],
    )
    .map_err(|e| SpotifyError::InvalidInput(format!("invalid accounts URL: {}", e)))?;
    Ok(url.into())
}

/// Pull the `code` query parameter out of the redirected URL
pub fn extract_authorization_code(redirected_url: &str) -> SpotifyResult<String> {
    let url = url::Url::parse(redirected_url.trim())
        .map_err(|e| SpotifyError::InvalidInput(format!("not a URL: {}", e)))?;

    if let Some((_, error)) = url.query_pairs().find(|(key, _)| key == "error") {
        return Err(SpotifyError::Auth(format!("authorization denied: {}", error)));
    }

    url.query_pairs()
        .find(|(key, value)| key == "code" && !value.is_empty())
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| SpotifyError::InvalidInput("no code found in the URL".to_string()))
}

/// Exchange an authorization code for access and refresh tokens
pub async fn exchange_authorization_code(
    config: &SpotifyConfig,
    code: &str,
) -> SpotifyResult<TokenResponse> {
    let http_client = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let form = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", config.redirect_uri.as_str()),
    ];
    request_token(
        &http_client,
        &config.token_url(),
        &config.client_id,
        &config.client_secret,
        &form,
    )
    .await
}
