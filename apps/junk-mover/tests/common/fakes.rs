//! In-memory stand-ins for Spotify
//!
//! [`FakeSpotify`] keeps playlists in memory and applies adds and removes
//! the way the Web API does, so a test can run the job several times and
//! inspect where every track ended up.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, BoxStream, StreamExt};
use junk_mover::PlaylistApi;
use junk_mover_spotify_client::{
    AccessTokenProvider, BatchOutcome, FailedUri, Playlist, PlaylistItem, PlaylistOwner,
    SpotifyError, SpotifyResult, TrackRef, UserProfile,
};

pub const USER_ID: &str = "test-user";
pub const SOURCE_ID: &str = "source";
pub const SOURCE_NAME: &str = "Big Junk Drawer";

/// Parse an RFC 3339 timestamp
pub fn at(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
}

/// Playlist item for `uri` added at `added_at`
pub fn item(uri: &str, added_at: &str) -> PlaylistItem {
    PlaylistItem {
        added_at: Some(added_at.to_string()),
        track: Some(TrackRef {
            uri: Some(uri.to_string()),
        }),
    }
}

/// Item whose track is no longer available
pub fn unavailable_item(added_at: &str) -> PlaylistItem {
    PlaylistItem {
        added_at: Some(added_at.to_string()),
        track: None,
    }
}

/// Item without an `added_at`
pub fn undated_item(uri: &str) -> PlaylistItem {
    PlaylistItem {
        added_at: None,
        track: Some(TrackRef {
            uri: Some(uri.to_string()),
        }),
    }
}

#[derive(Debug, Clone)]
pub struct FakePlaylist {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub description: String,
    pub items: Vec<PlaylistItem>,
}

impl FakePlaylist {
    fn to_playlist(&self) -> Playlist {
        Playlist {
            id: self.id.clone(),
            name: self.name.clone(),
            owner: PlaylistOwner {
                id: self.owner_id.clone(),
            },
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub playlists: Vec<FakePlaylist>,
    /// Every call, e.g. `find:23 Junk Drawer`, `add:created-1:2`
    pub calls: Vec<String>,
    pub failing_adds: HashSet<String>,
    pub failing_removes: HashSet<String>,
    pub failing_creates: HashSet<String>,
    pub failing_descriptions: bool,
    created: usize,
}

/// In-memory Spotify account for [`USER_ID`]
#[derive(Clone, Default)]
pub struct FakeSpotify {
    state: Arc<Mutex<FakeState>>,
}

impl FakeSpotify {
    /// Account owning the source playlist with the given items
    pub fn with_source(items: Vec<PlaylistItem>) -> Self {
        let fake = Self::default();
        fake.add_playlist(SOURCE_ID, SOURCE_NAME, USER_ID, items);
        fake
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn add_playlist(&self, id: &str, name: &str, owner_id: &str, items: Vec<PlaylistItem>) {
        self.state().playlists.push(FakePlaylist {
            id: id.to_string(),
            name: name.to_string(),
            owner_id: owner_id.to_string(),
            description: String::new(),
            items,
        });
    }

    /// Append items to an existing playlist
    pub fn push_items(&self, playlist_id: &str, items: Vec<PlaylistItem>) {
        let mut state = self.state();
        if let Some(playlist) = state.playlists.iter_mut().find(|p| p.id == playlist_id) {
            playlist.items.extend(items);
        }
    }

    pub fn fail_add(&self, uri: &str) {
        self.state().failing_adds.insert(uri.to_string());
    }

    pub fn fail_remove(&self, uri: &str) {
        self.state().failing_removes.insert(uri.to_string());
    }

    pub fn fail_create(&self, name: &str) {
        self.state().failing_creates.insert(name.to_string());
    }

    pub fn fail_descriptions(&self) {
        self.state().failing_descriptions = true;
    }

    /// Playlist named `name`, if exactly one exists
    pub fn playlist_named(&self, name: &str) -> Option<FakePlaylist> {
        let state = self.state();
        let matches: Vec<&FakePlaylist> = state.playlists.iter().filter(|p| p.name == name).collect();
        match matches.as_slice() {
            [playlist] => Some((*playlist).clone()),
            _ => None,
        }
    }

    /// URIs in a playlist, in order
    pub fn uris(&self, name: &str) -> Vec<String> {
        self.playlist_named(name)
            .map(|playlist| {
                playlist
                    .items
                    .iter()
                    .filter_map(|item| item.uri().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Number of calls starting with `prefix`
    pub fn count_calls(&self, prefix: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    fn log(&self, call: String) {
        self.state().calls.push(call);
    }
}

#[async_trait]
impl PlaylistApi for FakeSpotify {
    async fn current_user(&self) -> SpotifyResult<UserProfile> {
        self.log("me".to_string());
        Ok(UserProfile {
            id: USER_ID.to_string(),
            display_name: Some("Tester".to_string()),
            extra: serde_json::Map::new(),
        })
    }

    async fn find_owned_playlist(&self, owner_id: &str, name: &str) -> SpotifyResult<Option<Playlist>> {
        self.log(format!("find:{}", name));
        let state = self.state();
        let mut matches: Vec<Playlist> = state
            .playlists
            .iter()
            .filter(|p| p.name == name && p.owner_id == owner_id)
            .map(FakePlaylist::to_playlist)
            .collect();

        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            count => Err(SpotifyError::AmbiguousPlaylist {
                name: name.to_string(),
                count,
            }),
        }
    }

    fn playlist_items<'a>(&'a self, playlist_id: &str) -> BoxStream<'a, SpotifyResult<PlaylistItem>> {
        self.log(format!("items:{}", playlist_id));
        let items: Vec<SpotifyResult<PlaylistItem>> = self
            .state()
            .playlists
            .iter()
            .find(|p| p.id == playlist_id)
            .map(|p| p.items.iter().cloned().map(Ok).collect())
            .unwrap_or_default();
        stream::iter(items).boxed()
    }

    async fn create_playlist(
        &self,
        owner_id: &str,
        name: &str,
        description: &str,
    ) -> SpotifyResult<Playlist> {
        self.log(format!("create:{}", name));
        let mut state = self.state();
        if state.failing_creates.contains(name) {
            return Err(SpotifyError::Api {
                status: 403,
                message: "Playlist limit reached".to_string(),
            });
        }

        state.created += 1;
        let playlist = FakePlaylist {
            id: format!("created-{}", state.created),
            name: name.to_string(),
            owner_id: owner_id.to_string(),
            description: description.to_string(),
            items: Vec::new(),
        };
        let created = playlist.to_playlist();
        state.playlists.push(playlist);
        Ok(created)
    }

    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> SpotifyResult<BatchOutcome> {
        self.log(format!("add:{}:{}", playlist_id, uris.len()));
        let mut state = self.state();
        let failing = state.failing_adds.clone();
        let mut outcome = BatchOutcome::default();
        let playlist = state
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .ok_or_else(|| SpotifyError::Api {
                status: 404,
                message: "Resource not found".to_string(),
            })?;

        for uri in uris {
            if failing.contains(uri) {
                outcome.failed.push(FailedUri {
                    uri: uri.clone(),
                    reason: "Spotify API error 400: Invalid track uri".to_string(),
                });
            } else {
                playlist.items.push(item(uri, "2024-12-01T00:00:00Z"));
                outcome.succeeded.push(uri.clone());
            }
        }
        Ok(outcome)
    }

    async fn remove_tracks(&self, playlist_id: &str, uris: &[String]) -> SpotifyResult<BatchOutcome> {
        self.log(format!("remove:{}:{}", playlist_id, uris.len()));
        let mut state = self.state();
        let failing = state.failing_removes.clone();
        let mut outcome = BatchOutcome::default();
        let playlist = state
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .ok_or_else(|| SpotifyError::Api {
                status: 404,
                message: "Resource not found".to_string(),
            })?;

        for uri in uris {
            if failing.contains(uri) {
                outcome.failed.push(FailedUri {
                    uri: uri.clone(),
                    reason: "Spotify server error 502: Bad gateway".to_string(),
                });
            } else {
                playlist.items.retain(|item| item.uri() != Some(uri.as_str()));
                outcome.succeeded.push(uri.clone());
            }
        }
        Ok(outcome)
    }

    async fn update_description(&self, playlist_id: &str, description: &str) -> SpotifyResult<()> {
        self.log(format!("describe:{}", playlist_id));
        let mut state = self.state();
        if state.failing_descriptions {
            return Err(SpotifyError::Server {
                status: 500,
                message: "Internal error".to_string(),
            });
        }
        if let Some(playlist) = state.playlists.iter_mut().find(|p| p.id == playlist_id) {
            playlist.description = description.to_string();
        }
        Ok(())
    }
}

/// Token provider that always succeeds and counts requests
#[derive(Default)]
pub struct CountingTokens {
    pub requests: AtomicUsize,
}

impl CountingTokens {
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccessTokenProvider for CountingTokens {
    async fn access_token(&self) -> SpotifyResult<String> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok("fake-token".to_string())
    }

    fn invalidate(&self) {}
}

/// Token provider whose grant has been revoked
pub struct RevokedTokens;

#[async_trait]
impl AccessTokenProvider for RevokedTokens {
    async fn access_token(&self) -> SpotifyResult<String> {
        Err(SpotifyError::Auth(
            "400: invalid_grant (Refresh token revoked)".to_string(),
        ))
    }

    fn invalidate(&self) {}
}
