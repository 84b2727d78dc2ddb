//! Year-bucketed destination playlists

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Utc};
use junk_mover_spotify_client::Playlist;
use tracing::{debug, info};

use crate::api::PlaylistApi;
use crate::error::JobResult;

/// A destination playlist derived from the year an item was added
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bucket {
    /// Two-digit year, e.g. `"24"`
    pub year: String,
    /// Playlist name, e.g. `"24 Junk Drawer"`
    pub name: String,
}

impl Bucket {
    /// Bucket for an item added at `added_at` (UTC year)
    pub fn for_added_at(added_at: DateTime<Utc>, suffix: &str) -> Self {
        let year = format!("{:02}", added_at.year().rem_euclid(100));
        let name = format!("{} {}", year, suffix.trim());
        Self { year, name }
    }
}

/// Derive the destination playlist name for an item added at `added_at`
pub fn bucket_name_for(added_at: DateTime<Utc>, suffix: &str) -> String {
    Bucket::for_added_at(added_at, suffix).name
}

/// Resolves bucket names to playlists, creating missing ones
///
/// Each bucket is looked up (and created if needed) at most once per router;
/// later calls are answered from the cache.
pub struct BucketRouter<'a, A: PlaylistApi + ?Sized> {
    api: &'a A,
    owner_id: String,
    source_name: String,
    suffix: String,
    resolved: HashMap<String, Playlist>,
}

impl<'a, A: PlaylistApi + ?Sized> BucketRouter<'a, A> {
    pub fn new(
        api: &'a A,
        owner_id: impl Into<String>,
        source_name: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Self {
        Self {
            api,
            owner_id: owner_id.into(),
            source_name: source_name.into(),
            suffix: suffix.into(),
            resolved: HashMap::new(),
        }
    }

    /// Bucket an item added at `added_at` belongs to
    pub fn bucket_for(&self, added_at: DateTime<Utc>) -> Bucket {
        Bucket::for_added_at(added_at, &self.suffix)
    }

    /// Description given to newly created junk drawers
    pub fn base_description(&self, bucket: &Bucket) -> String {
        format!(
            "Junk drawer of tracks added in {} from {}",
            bucket.year, self.source_name
        )
    }

    /// Find the bucket's playlist among the owner's playlists, or create it
    ///
    /// # Errors
    /// - `JobError::Config` if several owned playlists share the bucket name
    /// - `JobError::Auth` if the run can no longer authenticate
    /// - `JobError::Api` / `JobError::Transient` if lookup or creation failed
    pub async fn resolve_or_create(&mut self, bucket: &Bucket) -> JobResult<Playlist> {
        if let Some(playlist) = self.resolved.get(&bucket.name) {
            debug!(bucket = %bucket.name, playlist_id = %playlist.id, "Bucket already resolved");
            return Ok(playlist.clone());
        }

        let playlist = match self
            .api
            .find_owned_playlist(&self.owner_id, &bucket.name)
            .await?
        {
            Some(existing) => {
                info!(bucket = %bucket.name, playlist_id = %existing.id, "Using existing junk drawer");
                existing
            }
            None => {
                let created = self
                    .api
                    .create_playlist(&self.owner_id, &bucket.name, &self.base_description(bucket))
                    .await?;
                info!(bucket = %bucket.name, playlist_id = %created.id, "Created junk drawer");
                created
            }
        };

        self.resolved.insert(bucket.name.clone(), playlist.clone());
        Ok(playlist)
    }

    /// Number of distinct buckets resolved so far
    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }
}
