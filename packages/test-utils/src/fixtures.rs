//! JSON fixtures for Spotify objects

use serde_json::json;

/// User ID the mock profile endpoint reports
pub const TEST_USER_ID: &str = "test-user";

/// Fixture for `/me/playlists` entries and created playlists
#[derive(Debug, Clone)]
pub struct PlaylistFixture {
    pub id: String,
    pub name: String,
    pub owner_id: String,
}

impl PlaylistFixture {
    /// Playlist owned by [`TEST_USER_ID`]
    pub fn owned(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            owner_id: TEST_USER_ID.to_string(),
        }
    }

    /// Playlist the user follows but does not own
    pub fn followed(id: &str, name: &str, owner_id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            owner_id: owner_id.to_string(),
        }
    }

    /// Convert to JSON value
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "id": self.id,
            "name": self.name,
            "public": false,
            "collaborative": false,
            "owner": {
                "id": self.owner_id,
                "display_name": self.owner_id,
            },
            "tracks": { "total": 0 },
        })
    }
}

/// Fixture for playlist item entries
#[derive(Debug, Clone)]
pub struct PlaylistItemFixture {
    pub uri: Option<String>,
    pub added_at: Option<String>,
}

impl PlaylistItemFixture {
    /// Track `uri` added at the given RFC 3339 timestamp
    pub fn track(uri: &str, added_at: &str) -> Self {
        Self {
            uri: Some(uri.to_string()),
            added_at: Some(added_at.to_string()),
        }
    }

    /// Item whose track is no longer available (`"track": null`)
    pub fn unavailable(added_at: &str) -> Self {
        Self {
            uri: None,
            added_at: Some(added_at.to_string()),
        }
    }

    /// Item with a null `added_at` (very old playlists)
    pub fn without_added_at(uri: &str) -> Self {
        Self {
            uri: Some(uri.to_string()),
            added_at: None,
        }
    }

    /// Item with an arbitrary, possibly malformed, `added_at` string
    pub fn with_raw_added_at(uri: &str, added_at: &str) -> Self {
        Self::track(uri, added_at)
    }

    /// Convert to JSON value
    pub fn to_json(&self) -> serde_json::Value {
        let track = match &self.uri {
            Some(uri) => json!({
                "uri": uri,
                "type": "track",
                "is_local": false,
            }),
            None => serde_json::Value::Null,
        };

        json!({
            "added_at": self.added_at,
            "is_local": false,
            "track": track,
        })
    }
}
