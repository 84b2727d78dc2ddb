//! Spotify Web API request and response models

use serde::{Deserialize, Serialize};

/// The authenticated user's profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// Spotify user ID
    pub id: String,
    /// Display name, if the user set one
    #[serde(default)]
    pub display_name: Option<String>,
    /// Remaining profile fields, kept for the profile check output
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserProfile {
    /// Name to show in logs: display name, falling back to the user ID
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.id)
    }
}

/// Playlist owner reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistOwner {
    /// Owner's user ID
    pub id: String,
}

/// A playlist as listed under `/me/playlists` or returned on creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    /// Playlist ID
    pub id: String,
    /// Playlist name
    pub name: String,
    /// Owning user
    pub owner: PlaylistOwner,
}

impl Playlist {
    /// Check whether this playlist is named `name` and owned by `owner_id`
    pub fn matches(&self, owner_id: &str, name: &str) -> bool {
        self.name == name && self.owner.id == owner_id
    }
}

/// Track reference inside a playlist item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackRef {
    /// Spotify URI (e.g. `spotify:track:...`)
    #[serde(default)]
    pub uri: Option<String>,
}

/// One entry of a playlist's track listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistItem {
    /// When the track was added to this playlist (ISO 8601, UTC)
    #[serde(default)]
    pub added_at: Option<String>,
    /// The track; null for unavailable or removed tracks
    #[serde(default)]
    pub track: Option<TrackRef>,
}

impl PlaylistItem {
    /// URI of the item's track, if it has one
    pub fn uri(&self) -> Option<&str> {
        self.track
            .as_ref()
            .and_then(|track| track.uri.as_deref())
            .filter(|uri| !uri.is_empty())
    }
}

/// Result of a chunked add or remove call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// URIs whose chunk was accepted
    pub succeeded: Vec<String>,
    /// URIs whose chunk was rejected, with the reason
    pub failed: Vec<FailedUri>,
}

/// A URI that could not be written, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUri {
    pub uri: String,
    pub reason: String,
}

impl BatchOutcome {
    /// Check whether every URI was written
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Reason recorded for `uri`, if its chunk failed
    pub fn failure_for(&self, uri: &str) -> Option<&str> {
        self.failed
            .iter()
            .find(|failed| failed.uri == uri)
            .map(|failed| failed.reason.as_str())
    }
}

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime of the access token in seconds
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
    #[serde(default)]
    pub scope: Option<String>,
    /// Present when Spotify rotates the refresh token
    #[serde(default)]
    pub refresh_token: Option<String>,
}

fn default_expires_in() -> u64 {
    3600
}

// Internal response types for deserialization

#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next: Option<String>,
}

/// Token endpoint error body
#[derive(Debug, Deserialize)]
pub(crate) struct TokenErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Web API error body
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: String,
}
