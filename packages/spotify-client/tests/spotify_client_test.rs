//! Integration tests for the Spotify client against a mock server
//!
//! Tests cover:
//! - Refresh-token exchange, caching, rotation and rejection
//! - Paged listings for playlists and playlist items
//! - Retry behavior for 429 and 5xx responses
//! - Chunked add/remove calls and per-chunk failures

use std::sync::Arc;

use assert_matches::assert_matches;
use futures_util::TryStreamExt;
use junk_mover_spotify_client::{
    AccessTokenProvider, PlaylistItem, SpotifyClient, SpotifyError, TokenBroker, MAX_BATCH_SIZE,
};
use junk_mover_test_utils::{
    MockSpotifyServer, PlaylistFixture, PlaylistItemFixture, TEST_ACCESS_TOKEN, TEST_USER_ID,
};

fn client_for(spotify: &MockSpotifyServer) -> (SpotifyClient, Arc<TokenBroker>) {
    let config = spotify.config();
    let broker = Arc::new(TokenBroker::new(&config).unwrap());
    let client = SpotifyClient::new(&config, broker.clone()).unwrap();
    (client, broker)
}

fn track_uris(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("spotify:track:{:04}", i)).collect()
}

// =============================================================================
// Token exchange
// =============================================================================

#[tokio::test]
async fn test_access_token_is_cached_between_calls() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_token_success().await;
    let (_, broker) = client_for(&spotify);

    assert_eq!(broker.access_token().await.unwrap(), TEST_ACCESS_TOKEN);
    assert_eq!(broker.access_token().await.unwrap(), TEST_ACCESS_TOKEN);

    assert_eq!(broker.exchange_count(), 1);
    assert_eq!(spotify.request_count("POST", "/api/token").await, 1);
}

#[tokio::test]
async fn test_short_lived_token_is_exchanged_again() {
    let spotify = MockSpotifyServer::start().await;
    // Expires inside the safety margin, so it is never considered fresh
    spotify.mock_token_with("short-lived", 30, None).await;
    let (_, broker) = client_for(&spotify);

    broker.access_token().await.unwrap();
    broker.access_token().await.unwrap();

    assert_eq!(broker.exchange_count(), 2);
}

#[tokio::test]
async fn test_rotated_refresh_token_is_exposed() {
    let spotify = MockSpotifyServer::start().await;
    spotify
        .mock_token_with(TEST_ACCESS_TOKEN, 3600, Some("rotated-refresh"))
        .await;
    let (_, broker) = client_for(&spotify);

    assert!(broker.rotated_refresh_token().is_none());
    broker.access_token().await.unwrap();
    assert_eq!(broker.rotated_refresh_token().as_deref(), Some("rotated-refresh"));
}

#[tokio::test]
async fn test_unchanged_refresh_token_is_not_reported_as_rotated() {
    let spotify = MockSpotifyServer::start().await;
    spotify
        .mock_token_with(TEST_ACCESS_TOKEN, 3600, Some("test-refresh"))
        .await;
    let (_, broker) = client_for(&spotify);

    broker.access_token().await.unwrap();
    assert!(broker.rotated_refresh_token().is_none());
}

#[tokio::test]
async fn test_rejected_grant_is_auth_error() {
    let spotify = MockSpotifyServer::start().await;
    spotify
        .mock_token_failure(400, "invalid_grant", "Refresh token revoked")
        .await;
    let (client, _) = client_for(&spotify);

    let result = client.get_current_user_profile().await;

    assert_matches!(result, Err(SpotifyError::Auth(msg)) if msg.contains("invalid_grant"));
    assert_eq!(spotify.request_count("GET", "/v1/me").await, 0);
    assert_eq!(spotify.request_count("POST", "/api/token").await, 1);
}

#[tokio::test]
async fn test_token_endpoint_outage_is_retried() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_failures("POST", "/api/token", 503, 1, None).await;
    spotify.mock_token_success().await;
    let (_, broker) = client_for(&spotify);

    assert_eq!(broker.access_token().await.unwrap(), TEST_ACCESS_TOKEN);

    assert_eq!(broker.exchange_count(), 1);
    assert_eq!(spotify.request_count("POST", "/api/token").await, 2);
}

#[tokio::test]
async fn test_rate_limited_token_exchange_is_retried() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_failures("POST", "/api/token", 429, 1, Some("0")).await;
    spotify.mock_token_success().await;
    let (client, _) = client_for(&spotify);
    spotify.mock_profile("Tester").await;

    let profile = client.get_current_user_profile().await.unwrap();

    assert_eq!(profile.id, TEST_USER_ID);
    assert_eq!(spotify.request_count("POST", "/api/token").await, 2);
}

#[tokio::test]
async fn test_persistent_token_outage_exhausts_retries() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_failures("POST", "/api/token", 503, 3, None).await;
    spotify.mock_token_success().await;
    let (_, broker) = client_for(&spotify);

    let result = broker.access_token().await;

    assert_matches!(
        result,
        Err(SpotifyError::RetriesExhausted { attempts: 3, status: Some(503), .. })
    );
    assert_eq!(spotify.request_count("POST", "/api/token").await, 3);
}

#[tokio::test]
async fn test_expired_access_token_is_replaced_once() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_token_once("stale-token").await;
    spotify.mock_token_success().await;
    spotify.mock_rejected_token("/v1/me", "stale-token").await;
    spotify.mock_profile("Tester").await;
    let (client, broker) = client_for(&spotify);

    let profile = client.get_current_user_profile().await.unwrap();

    assert_eq!(profile.id, TEST_USER_ID);
    assert_eq!(profile.label(), "Tester");
    assert_eq!(broker.exchange_count(), 2);
    assert_eq!(spotify.request_count("GET", "/v1/me").await, 2);
}

#[tokio::test]
async fn test_second_rejection_is_not_retried_again() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_token_with("stale-token", 3600, None).await;
    spotify.mock_rejected_token("/v1/me", "stale-token").await;
    let (client, _) = client_for(&spotify);

    let result = client.get_current_user_profile().await;

    assert_matches!(result, Err(SpotifyError::Api { status: 401, .. }));
    assert_eq!(spotify.request_count("GET", "/v1/me").await, 2);
}

// =============================================================================
// Listings
// =============================================================================

#[tokio::test]
async fn test_profile_keeps_extra_fields() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_token_success().await;
    spotify.mock_profile("Tester").await;
    let (client, _) = client_for(&spotify);

    let profile = client.get_current_user_profile().await.unwrap();

    assert_eq!(profile.extra.get("country").and_then(|v| v.as_str()), Some("SE"));
}

#[tokio::test]
async fn test_playlist_items_are_paged_in_order() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_token_success().await;
    let uris = track_uris(250);
    let fixtures = uris
        .iter()
        .map(|uri| PlaylistItemFixture::track(uri, "2023-05-01T10:00:00Z"))
        .collect();
    spotify.mock_playlist_items("src", fixtures).await;
    let (client, _) = client_for(&spotify);

    let items: Vec<PlaylistItem> = client.list_playlist_tracks("src").try_collect().await.unwrap();

    let listed: Vec<&str> = items.iter().filter_map(|item| item.uri()).collect();
    assert_eq!(listed, uris.iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(spotify.request_count("GET", "/v1/playlists/src/tracks").await, 3);
}

#[tokio::test]
async fn test_empty_playlist_yields_no_items() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_token_success().await;
    spotify.mock_playlist_items("src", Vec::new()).await;
    let (client, _) = client_for(&spotify);

    let items: Vec<PlaylistItem> = client.list_playlist_tracks("src").try_collect().await.unwrap();

    assert!(items.is_empty());
}

#[tokio::test]
async fn test_unavailable_items_have_no_uri() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_token_success().await;
    spotify
        .mock_playlist_items(
            "src",
            vec![
                PlaylistItemFixture::unavailable("2023-05-01T10:00:00Z"),
                PlaylistItemFixture::without_added_at("spotify:track:a"),
            ],
        )
        .await;
    let (client, _) = client_for(&spotify);

    let items: Vec<PlaylistItem> = client.list_playlist_tracks("src").try_collect().await.unwrap();

    assert_eq!(items.len(), 2);
    assert!(items[0].uri().is_none());
    assert_eq!(items[1].uri(), Some("spotify:track:a"));
    assert!(items[1].added_at.is_none());
}

#[tokio::test]
async fn test_find_playlist_only_matches_owned() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_token_success().await;
    spotify
        .mock_playlists(vec![
            PlaylistFixture::followed("other", "Big Junk Drawer", "someone-else"),
            PlaylistFixture::owned("mine", "Big Junk Drawer"),
        ])
        .await;
    let (client, _) = client_for(&spotify);

    let found = client
        .find_playlist_by_name(TEST_USER_ID, "Big Junk Drawer")
        .await
        .unwrap();

    assert_eq!(found.map(|p| p.id), Some("mine".to_string()));
}

#[tokio::test]
async fn test_find_playlist_across_pages() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_token_success().await;
    let mut playlists: Vec<PlaylistFixture> = (0..70)
        .map(|i| PlaylistFixture::owned(&format!("p{}", i), &format!("Playlist {}", i)))
        .collect();
    playlists.push(PlaylistFixture::owned("late", "23 Junk Drawer"));
    spotify.mock_playlists(playlists).await;
    let (client, _) = client_for(&spotify);

    let found = client
        .find_playlist_by_name(TEST_USER_ID, "23 Junk Drawer")
        .await
        .unwrap();

    assert_eq!(found.map(|p| p.id), Some("late".to_string()));
    assert_eq!(spotify.request_count("GET", "/v1/me/playlists").await, 2);
}

#[tokio::test]
async fn test_find_playlist_missing_returns_none() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_token_success().await;
    spotify
        .mock_playlists(vec![PlaylistFixture::owned("p1", "Inbox")])
        .await;
    let (client, _) = client_for(&spotify);

    let found = client.find_playlist_by_name(TEST_USER_ID, "24 Junk Drawer").await;

    assert_matches!(found, Ok(None));
}

#[tokio::test]
async fn test_find_playlist_with_duplicate_names_is_ambiguous() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_token_success().await;
    spotify
        .mock_playlists(vec![
            PlaylistFixture::owned("a", "23 Junk Drawer"),
            PlaylistFixture::owned("b", "23 Junk Drawer"),
        ])
        .await;
    let (client, _) = client_for(&spotify);

    let result = client.find_playlist_by_name(TEST_USER_ID, "23 Junk Drawer").await;

    assert_matches!(result, Err(SpotifyError::AmbiguousPlaylist { count: 2, .. }));
}

// =============================================================================
// Retries
// =============================================================================

#[tokio::test]
async fn test_rate_limited_request_is_retried() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_token_success().await;
    spotify.mock_failures("GET", "/v1/me", 429, 1, Some("0")).await;
    spotify.mock_profile("Tester").await;
    let (client, _) = client_for(&spotify);

    let profile = client.get_current_user_profile().await.unwrap();

    assert_eq!(profile.id, TEST_USER_ID);
    assert_eq!(spotify.request_count("GET", "/v1/me").await, 2);
}

#[tokio::test]
async fn test_server_errors_exhaust_retry_budget() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_token_success().await;
    spotify.mock_failures("GET", "/v1/me", 503, 10, None).await;
    let (client, _) = client_for(&spotify);

    let result = client.get_current_user_profile().await;

    assert_matches!(
        result,
        Err(SpotifyError::RetriesExhausted {
            attempts: 3,
            status: Some(503),
            ..
        })
    );
    assert_eq!(spotify.request_count("GET", "/v1/me").await, 3);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_token_success().await;
    spotify.mock_failures("GET", "/v1/me", 403, 10, None).await;
    let (client, _) = client_for(&spotify);

    let result = client.get_current_user_profile().await;

    assert_matches!(result, Err(SpotifyError::Api { status: 403, .. }));
    assert_eq!(spotify.request_count("GET", "/v1/me").await, 1);
}

// =============================================================================
// Mutations
// =============================================================================

#[tokio::test]
async fn test_create_playlist_is_private() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_token_success().await;
    spotify.mock_create_playlist("23 Junk Drawer", "new-23").await;
    let (client, _) = client_for(&spotify);

    let playlist = client
        .create_playlist(TEST_USER_ID, "23 Junk Drawer", "Junk drawer")
        .await
        .unwrap();

    assert_eq!(playlist.id, "new-23");
    let bodies = spotify
        .request_bodies("POST", &format!("/v1/users/{}/playlists", TEST_USER_ID))
        .await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["public"], false);
    assert_eq!(bodies[0]["description"], "Junk drawer");
}

#[tokio::test]
async fn test_create_playlist_rejects_blank_name() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_token_success().await;
    let (client, _) = client_for(&spotify);

    let result = client.create_playlist(TEST_USER_ID, "  ", "").await;

    assert_matches!(result, Err(SpotifyError::InvalidInput(_)));
}

#[tokio::test]
async fn test_add_tracks_is_chunked() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_token_success().await;
    spotify.mock_add_tracks("dest").await;
    let (client, _) = client_for(&spotify);
    let uris = track_uris(250);

    let outcome = client.add_tracks("dest", &uris).await.unwrap();

    assert!(outcome.is_complete());
    assert_eq!(outcome.succeeded, uris);

    let bodies = spotify.request_bodies("POST", "/v1/playlists/dest/tracks").await;
    let sizes: Vec<usize> = bodies
        .iter()
        .map(|body| body["uris"].as_array().map(Vec::len).unwrap_or(0))
        .collect();
    assert_eq!(sizes, vec![MAX_BATCH_SIZE, MAX_BATCH_SIZE, 50]);
}

#[tokio::test]
async fn test_remove_tracks_sends_track_objects() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_token_success().await;
    spotify.mock_remove_tracks("src").await;
    let (client, _) = client_for(&spotify);
    let uris = track_uris(2);

    let outcome = client.remove_tracks("src", &uris).await.unwrap();

    assert!(outcome.is_complete());
    let bodies = spotify.request_bodies("DELETE", "/v1/playlists/src/tracks").await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["tracks"][0]["uri"], uris[0].as_str());
    assert_eq!(bodies[0]["tracks"][1]["uri"], uris[1].as_str());
}

#[tokio::test]
async fn test_rejected_chunk_only_fails_its_uris() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_token_success().await;
    spotify
        .mock_failures("POST", "/v1/playlists/dest/tracks", 400, 1, None)
        .await;
    spotify.mock_add_tracks("dest").await;
    let (client, _) = client_for(&spotify);
    let uris = track_uris(150);

    let outcome = client.add_tracks("dest", &uris).await.unwrap();

    assert_eq!(outcome.failed.len(), MAX_BATCH_SIZE);
    assert_eq!(outcome.succeeded, uris[MAX_BATCH_SIZE..].to_vec());
    assert!(outcome
        .failure_for(&uris[0])
        .is_some_and(|reason| reason.contains("400")));
    assert!(outcome.failure_for(&uris[MAX_BATCH_SIZE]).is_none());
}

#[tokio::test]
async fn test_auth_failure_aborts_batches() {
    let spotify = MockSpotifyServer::start().await;
    spotify
        .mock_token_failure(401, "invalid_client", "Invalid client")
        .await;
    let (client, _) = client_for(&spotify);

    let result = client.add_tracks("dest", &track_uris(3)).await;

    assert_matches!(result, Err(SpotifyError::Auth(_)));
    assert_eq!(spotify.request_count("POST", "/v1/playlists/dest/tracks").await, 0);
}

#[tokio::test]
async fn test_update_description() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_token_success().await;
    spotify.mock_update_description("dest").await;
    let (client, _) = client_for(&spotify);

    client
        .update_playlist_description("dest", "Last run moved 2 tracks.")
        .await
        .unwrap();

    let bodies = spotify.request_bodies("PUT", "/v1/playlists/dest").await;
    assert_eq!(bodies[0]["description"], "Last run moved 2 tracks.");
}
