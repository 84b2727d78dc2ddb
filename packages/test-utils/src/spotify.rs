//! Mock Spotify server for testing the client and the triage job
//!
//! Provides a [`MockSpotifyServer`] that serves the accounts token endpoint
//! and the Web API endpoints the triage job uses, from a single wiremock
//! instance.

use junk_mover_shared_config::SpotifyConfig;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

use crate::fixtures::{PlaylistFixture, PlaylistItemFixture, TEST_USER_ID};

/// Access token handed out by [`MockSpotifyServer::mock_token_success`]
pub const TEST_ACCESS_TOKEN: &str = "test-access-token";

const PLAYLISTS_PAGE_SIZE: usize = 50;
const TRACKS_PAGE_SIZE: usize = 100;

/// Matches JSON request bodies whose top-level `key` equals `value`
struct JsonFieldMatcher {
    key: String,
    value: serde_json::Value,
}

impl Match for JsonFieldMatcher {
    fn matches(&self, request: &Request) -> bool {
        serde_json::from_slice::<serde_json::Value>(&request.body)
            .map(|body| body.get(&self.key) == Some(&self.value))
            .unwrap_or(false)
    }
}

/// Mock Spotify accounts service and Web API
///
/// # Example
///
/// ```rust,ignore
/// use junk_mover_test_utils::{MockSpotifyServer, PlaylistFixture, PlaylistItemFixture};
///
/// #[tokio::test]
/// async fn test_listing() {
///     let spotify = MockSpotifyServer::start().await;
///     spotify.mock_token_success().await;
///     spotify
///         .mock_playlist_items("src", vec![PlaylistItemFixture::track("spotify:track:1", "2024-01-01T00:00:00Z")])
///         .await;
///
///     // Configure your client with spotify.config()
/// }
/// ```
///
/// When one request should first fail and then succeed, mount the failure
/// mock (which is limited with `up_to_n_times`) before the success mock:
/// wiremock answers with the first mounted mock that still matches.
pub struct MockSpotifyServer {
    server: MockServer,
}

impl MockSpotifyServer {
    /// Start a new mock Spotify server
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Get the server URL
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Configuration pointing both the accounts service and the Web API here
    ///
    /// Backoff delays are zero so retry tests run instantly.
    pub fn config(&self) -> SpotifyConfig {
        let mut config =
            SpotifyConfig::new("test-client", "test-secret", "test-refresh").with_base_url(self.url());
        config.max_retries = 3;
        config.retry_base_delay_ms = 0;
        config.timeout_secs = 5;
        config
    }

    /// All requests received so far
    pub async fn received_requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// Number of received requests with the given method and path
    pub async fn request_count(&self, http_method: &str, request_path: &str) -> usize {
        self.received_requests()
            .await
            .iter()
            .filter(|r| r.method.to_string() == http_method && r.url.path() == request_path)
            .count()
    }

    /// JSON bodies of received requests with the given method and path
    pub async fn request_bodies(&self, http_method: &str, request_path: &str) -> Vec<serde_json::Value> {
        self.received_requests()
            .await
            .iter()
            .filter(|r| r.method.to_string() == http_method && r.url.path() == request_path)
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }

    // ========== Accounts service ==========

    /// Mount a mock handing out [`TEST_ACCESS_TOKEN`] for an hour
    pub async fn mock_token_success(&self) {
        self.mock_token_with(TEST_ACCESS_TOKEN, 3600, None).await;
    }

    /// Mount a mock for the token endpoint with custom values
    pub async fn mock_token_with(&self, access_token: &str, expires_in: u64, refresh_token: Option<&str>) {
        let mut body = json!({
            "access_token": access_token,
            "token_type": "Bearer",
            "expires_in": expires_in,
            "scope": "playlist-modify-private playlist-modify-public",
        });
        if let Some(refresh_token) = refresh_token {
            body["refresh_token"] = json!(refresh_token);
        }

        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Mount a mock answering only the first exchange with `access_token`
    ///
    /// Mount it before the regular token mock.
    pub async fn mock_token_once(&self, access_token: &str) {
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": access_token,
                "token_type": "Bearer",
                "expires_in": 3600,
            })))
            .up_to_n_times(1)
            .mount(&self.server)
            .await;
    }

    /// Mount a mock rejecting the grant
    pub async fn mock_token_failure(&self, status: u16, error: &str, description: &str) {
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "error": error,
                "error_description": description,
            })))
            .mount(&self.server)
            .await;
    }

    // ========== Web API ==========

    /// Mount a mock for `/me`
    pub async fn mock_profile(&self, display_name: &str) {
        Mock::given(method("GET"))
            .and(path("/v1/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": TEST_USER_ID,
                "display_name": display_name,
                "email": "test@example.com",
                "country": "SE",
                "product": "premium",
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount paged mocks for `/me/playlists`
    pub async fn mock_playlists(&self, playlists: Vec<PlaylistFixture>) {
        let items: Vec<serde_json::Value> = playlists.iter().map(|p| p.to_json()).collect();
        self.mount_paged("/v1/me/playlists", items, PLAYLISTS_PAGE_SIZE)
            .await;
    }

    /// Mount paged mocks for a playlist's items
    pub async fn mock_playlist_items(&self, playlist_id: &str, items: Vec<PlaylistItemFixture>) {
        let items: Vec<serde_json::Value> = items.iter().map(|i| i.to_json()).collect();
        self.mount_paged(
            &format!("/v1/playlists/{}/tracks", playlist_id),
            items,
            TRACKS_PAGE_SIZE,
        )
        .await;
    }

    /// Mount a mock creating the playlist named `name` with ID `new_id`
    pub async fn mock_create_playlist(&self, name: &str, new_id: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/v1/users/{}/playlists", TEST_USER_ID)))
            .and(JsonFieldMatcher {
                key: "name".to_string(),
                value: json!(name),
            })
            .respond_with(
                ResponseTemplate::new(201).set_body_json(PlaylistFixture::owned(new_id, name).to_json()),
            )
            .mount(&self.server)
            .await;
    }

    /// Mount a mock accepting additions to a playlist
    pub async fn mock_add_tracks(&self, playlist_id: &str) {
        self.mock_tracks_write("POST", playlist_id, 201).await;
    }

    /// Mount a mock accepting removals from a playlist
    pub async fn mock_remove_tracks(&self, playlist_id: &str) {
        self.mock_tracks_write("DELETE", playlist_id, 200).await;
    }

    /// Mount a mock accepting description updates
    pub async fn mock_update_description(&self, playlist_id: &str) {
        Mock::given(method("PUT"))
            .and(path(format!("/v1/playlists/{}", playlist_id)))
            .respond_with(ResponseTemplate::new(200))
            .mount(&self.server)
            .await;
    }

    /// Mount a mock failing `times` requests to `request_path` with `status`
    ///
    /// Mount it before the success mock for the same endpoint.
    pub async fn mock_failures(
        &self,
        http_method: &str,
        request_path: &str,
        status: u16,
        times: u64,
        retry_after: Option<&str>,
    ) {
        let mut response = ResponseTemplate::new(status).set_body_json(json!({
            "error": {
                "status": status,
                "message": format!("mock failure {}", status),
            }
        }));
        if let Some(retry_after) = retry_after {
            response = response.insert_header("Retry-After", retry_after);
        }

        Mock::given(method(http_method))
            .and(path(request_path))
            .respond_with(response)
            .up_to_n_times(times)
            .mount(&self.server)
            .await;
    }

    /// Mount a mock answering 401 only for the given bearer token
    pub async fn mock_rejected_token(&self, request_path: &str, access_token: &str) {
        Mock::given(method("GET"))
            .and(path(request_path))
            .and(header("authorization", format!("Bearer {}", access_token).as_str()))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "status": 401, "message": "The access token expired" }
            })))
            .mount(&self.server)
            .await;
    }

    async fn mock_tracks_write(&self, http_method: &str, playlist_id: &str, status: u16) {
        Mock::given(method(http_method))
            .and(path(format!("/v1/playlists/{}/tracks", playlist_id)))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "snapshot_id": "c25hcHNob3Q",
            })))
            .mount(&self.server)
            .await;
    }

    /// Serve `items` in offset pages, advertising `next` until the last page
    async fn mount_paged(&self, request_path: &str, items: Vec<serde_json::Value>, page_size: usize) {
        let total = items.len();
        let mut chunks: Vec<Vec<serde_json::Value>> =
            items.chunks(page_size).map(|chunk| chunk.to_vec()).collect();
        if chunks.is_empty() {
            chunks.push(Vec::new());
        }

        for (index, chunk) in chunks.into_iter().enumerate() {
            let offset = index * page_size;
            let next_offset = offset + page_size;
            let next = if next_offset < total {
                json!(format!(
                    "{}{}?offset={}&limit={}",
                    self.url(),
                    request_path,
                    next_offset,
                    page_size
                ))
            } else {
                serde_json::Value::Null
            };

            Mock::given(method("GET"))
                .and(path(request_path))
                .and(query_param("offset", offset.to_string().as_str()))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "href": format!("{}{}", self.url(), request_path),
                    "items": chunk,
                    "limit": page_size,
                    "offset": offset,
                    "total": total,
                    "next": next,
                })))
                .mount(&self.server)
                .await;
        }
    }
}
