//! Spotify Web API client implementation

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future;
use futures_util::stream::{self, Stream, TryStreamExt};
use junk_mover_shared_config::SpotifyConfig;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::auth::AccessTokenProvider;
use crate::error::{SpotifyError, SpotifyResult};
use crate::models::{
    BatchOutcome, ErrorResponse, FailedUri, Page, Playlist, PlaylistItem, UserProfile,
};
use crate::retry::{retry_after_hint, RetryPolicy};

/// Default connection timeout in seconds
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Page size for `/me/playlists` (Spotify maximum)
const PLAYLISTS_PAGE_SIZE: u32 = 50;

/// Page size for playlist items (Spotify maximum)
const TRACKS_PAGE_SIZE: u32 = 100;

/// Maximum URIs per add or remove call
pub const MAX_BATCH_SIZE: usize = 100;

/// Maximum error body size kept in error messages
const MAX_ERROR_BODY_SIZE: usize = 1000;

/// Spotify Web API client
///
/// Every request carries a bearer token from the shared
/// [`AccessTokenProvider`]; rate limits and server errors are retried per
/// the configured [`RetryPolicy`].
#[derive(Clone)]
pub struct SpotifyClient {
    http_client: Client,
    api_url: String,
    tokens: Arc<dyn AccessTokenProvider>,
    retry_policy: RetryPolicy,
}

impl fmt::Debug for SpotifyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyClient")
            .field("api_url", &self.api_url)
            .field("retry_policy", &self.retry_policy)
            .finish()
    }
}

impl SpotifyClient {
    /// Create a new client for the API in `config`, authenticating through `tokens`
    pub fn new(config: &SpotifyConfig, tokens: Arc<dyn AccessTokenProvider>) -> SpotifyResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .pool_max_idle_per_host(5)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("JunkMover/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_client(config, tokens, http_client))
    }

    /// Create a client with custom HTTP client (for testing)
    pub fn with_client(
        config: &SpotifyConfig,
        tokens: Arc<dyn AccessTokenProvider>,
        http_client: Client,
    ) -> Self {
        Self {
            http_client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            tokens,
            retry_policy: RetryPolicy::new(
                config.max_retries,
                Duration::from_millis(config.retry_base_delay_ms),
            ),
        }
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Get the retry policy
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }

    /// Run a request with token handling and bounded retries
    ///
    /// A 401 invalidates the token and retries once without using the
    /// attempt budget; 429 and 5xx are retried until the budget is spent.
    async fn execute<F>(&self, build: F) -> SpotifyResult<String>
    where
        F: Fn(&str) -> RequestBuilder,
    {
        let mut attempt = 1;
        let mut reauthorized = false;

        loop {
            let token = self.tokens.access_token().await?;

            match Self::send_once(build(&token)).await {
                Ok(body) => return Ok(body),
                Err(SpotifyError::Unauthorized(message)) => {
                    if reauthorized {
                        return Err(SpotifyError::Api {
                            status: 401,
                            message,
                        });
                    }
                    warn!(error = %message, "Access token rejected, exchanging for a new one");
                    self.tokens.invalidate();
                    reauthorized = true;
                }
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
                        "Spotify request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Send one request and map the response status onto an error
    async fn send_once(request: RequestBuilder) -> SpotifyResult<String> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SpotifyError::Timeout
            } else {
                SpotifyError::Http(e)
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return response.text().await.map_err(SpotifyError::Http);
        }

        let retry_after = retry_after_hint(response.headers());
        let body = truncate_error_body(response.text().await.unwrap_or_default());
        let message = error_message(body);

        Err(match status {
            StatusCode::UNAUTHORIZED => SpotifyError::Unauthorized(message),
            StatusCode::TOO_MANY_REQUESTS => {
                warn!(retry_after_secs = ?retry_after.map(|d| d.as_secs()), "Spotify API rate limited");
                SpotifyError::RateLimited { retry_after }
            }
            s if s.is_server_error() => SpotifyError::Server {
                status: s.as_u16(),
                message,
            },
            s => SpotifyError::Api {
                status: s.as_u16(),
                message,
            },
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> SpotifyResult<T> {
        let body = self
            .execute(|token| self.http_client.get(url).bearer_auth(token).query(query))
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn send_json(
        &self,
        method: Method,
        url: &str,
        payload: &serde_json::Value,
    ) -> SpotifyResult<String> {
        self.execute(|token| {
            self.http_client
                .request(method.clone(), url)
                .bearer_auth(token)
                .json(payload)
        })
        .await
    }

    async fn fetch_page<T: DeserializeOwned>(
        &self,
        url: &str,
        offset: u32,
        page_size: u32,
    ) -> SpotifyResult<(Vec<T>, Option<u32>)> {
        let query = [
            ("limit", page_size.to_string()),
            ("offset", offset.to_string()),
        ];
        let page: Page<T> = self.get_json(url, &query).await?;

        debug!(
            url = %url,
            offset = offset,
            items = page.items.len(),
            has_next = page.next.is_some(),
            "Fetched page"
        );

        // An empty page that still advertises a next page would loop forever
        let next_offset = match page.next {
            Some(_) if !page.items.is_empty() => Some(offset + page_size),
            _ => None,
        };
        Ok((page.items, next_offset))
    }

    /// Lazily walk an offset-paged listing until Spotify reports no next page
    fn paginate<'a, T>(
        &'a self,
        url: String,
        page_size: u32,
    ) -> impl Stream<Item = SpotifyResult<T>> + Send + 'a
    where
        T: DeserializeOwned + Send + 'a,
    {
        stream::try_unfold(Some(0u32), move |offset| {
            let url = url.clone();
            async move {
                match offset {
                    Some(offset) => self.fetch_page::<T>(&url, offset, page_size).await.map(Some),
                    None => Ok(None),
                }
            }
        })
        .map_ok(|items| stream::iter(items.into_iter().map(Ok::<T, SpotifyError>)))
        .try_flatten()
    }

    /// Get the authenticated user's profile
    #[instrument(skip(self))]
    pub async fn get_current_user_profile(&self) -> SpotifyResult<UserProfile> {
        self.get_json(&self.endpoint("me"), &[]).await
    }

    /// Stream every playlist visible to the user, in Spotify's order
    pub fn list_playlists(&self) -> impl Stream<Item = SpotifyResult<Playlist>> + Send + '_ {
        self.paginate(self.endpoint("me/playlists"), PLAYLISTS_PAGE_SIZE)
    }

    /// Find the playlist named `name` owned by `owner_id`
    ///
    /// # Errors
    /// - `SpotifyError::AmbiguousPlaylist` if more than one owned playlist has the name
    #[instrument(skip(self))]
    pub async fn find_playlist_by_name(
        &self,
        owner_id: &str,
        name: &str,
    ) -> SpotifyResult<Option<Playlist>> {
        let mut matches: Vec<Playlist> = self
            .list_playlists()
            .try_filter(|playlist| future::ready(playlist.matches(owner_id, name)))
            .try_collect()
            .await?;

        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            count => Err(SpotifyError::AmbiguousPlaylist {
                name: name.to_string(),
                count,
            }),
        }
    }

    /// Stream the items of a playlist in playlist order
    ///
    /// Pages are requested as the stream is polled; the stream can be
    /// consumed once.
    pub fn list_playlist_tracks(
        &self,
        playlist_id: &str,
    ) -> impl Stream<Item = SpotifyResult<PlaylistItem>> + Send + '_ {
        let url = self.endpoint(&format!("playlists/{}/tracks", playlist_id));
        self.paginate(url, TRACKS_PAGE_SIZE)
    }

    /// Create a private playlist for `user_id`
    #[instrument(skip(self, description))]
    pub async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
    ) -> SpotifyResult<Playlist> {
        if name.trim().is_empty() {
            return Err(SpotifyError::InvalidInput(
                "playlist name cannot be empty".to_string(),
            ));
        }

        let payload = json!({
            "name": name,
            "description": description,
            "public": false,
        });
        let body = self
            .send_json(
                Method::POST,
                &self.endpoint(&format!("users/{}/playlists", user_id)),
                &payload,
            )
            .await?;
        let playlist: Playlist = serde_json::from_str(&body)?;

        info!(name = %playlist.name, playlist_id = %playlist.id, "Created playlist");
        Ok(playlist)
    }

    /// Append tracks to a playlist in chunks of [`MAX_BATCH_SIZE`]
    #[instrument(skip(self, uris), fields(count = uris.len()))]
    pub async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> SpotifyResult<BatchOutcome> {
        self.write_in_batches(playlist_id, "add", Method::POST, uris, |chunk| {
            json!({ "uris": chunk })
        })
        .await
    }

    /// Remove every occurrence of the tracks from a playlist, in chunks
    #[instrument(skip(self, uris), fields(count = uris.len()))]
    pub async fn remove_tracks(
        &self,
        playlist_id: &str,
        uris: &[String],
    ) -> SpotifyResult<BatchOutcome> {
        self.write_in_batches(playlist_id, "remove", Method::DELETE, uris, |chunk| {
            let tracks: Vec<serde_json::Value> =
                chunk.iter().map(|uri| json!({ "uri": uri })).collect();
            json!({ "tracks": tracks })
        })
        .await
    }

    /// Issue one call per chunk and record which URIs each call covered
    ///
    /// Token-exchange failures abort; any other failure is confined to its chunk.
    async fn write_in_batches<F>(
        &self,
        playlist_id: &str,
        action: &str,
        method: Method,
        uris: &[String],
        payload: F,
    ) -> SpotifyResult<BatchOutcome>
    where
        F: Fn(&[String]) -> serde_json::Value,
    {
        let url = self.endpoint(&format!("playlists/{}/tracks", playlist_id));
        let mut outcome = BatchOutcome::default();

        for chunk in uris.chunks(MAX_BATCH_SIZE) {
            match self.send_json(method.clone(), &url, &payload(chunk)).await {
                Ok(_) => {
                    info!(playlist_id = %playlist_id, action = action, count = chunk.len(), "Batch applied");
                    outcome.succeeded.extend(chunk.iter().cloned());
                }
                Err(e) if e.is_auth_failure() => return Err(e),
                Err(e) => {
                    warn!(
                        playlist_id = %playlist_id,
                        action = action,
                        count = chunk.len(),
                        error = %e,
                        "Batch rejected"
                    );
                    let reason = e.to_string();
                    outcome.failed.extend(chunk.iter().map(|uri| FailedUri {
                        uri: uri.clone(),
                        reason: reason.clone(),
                    }));
                }
            }
        }

        Ok(outcome)
    }

    /// Replace a playlist's description
    #[instrument(skip(self, description))]
    pub async fn update_playlist_description(
        &self,
        playlist_id: &str,
        description: &str,
    ) -> SpotifyResult<()> {
        let payload = json!({ "description": description });
        self.send_json(
            Method::PUT,
            &self.endpoint(&format!("playlists/{}", playlist_id)),
            &payload,
        )
        .await?;

        debug!(playlist_id = %playlist_id, "Updated playlist description");
        Ok(())
    }
}

/// Prefer Spotify's `error.message`, falling back to the raw body
fn error_message(body: String) -> String {
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(parsed) if !parsed.error.message.is_empty() => parsed.error.message,
        _ => body,
    }
}

/// Truncate error body to keep log lines bounded, respecting UTF-8 boundaries
fn truncate_error_body(body: String) -> String {
    if body.len() <= MAX_ERROR_BODY_SIZE {
        return body;
    }

    let truncate_at = body
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|i| *i <= MAX_ERROR_BODY_SIZE)
        .last()
        .unwrap_or(0);

    format!("{}... (truncated)", &body[..truncate_at])
}
