//! The slice of the Spotify Web API the triage job drives

use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};
use junk_mover_spotify_client::{
    BatchOutcome, Playlist, PlaylistItem, SpotifyClient, SpotifyResult, UserProfile,
};

/// Playlist operations needed by [`crate::TriageJob`]
#[async_trait]
pub trait PlaylistApi: Send + Sync {
    /// Profile of the user the credentials belong to
    async fn current_user(&self) -> SpotifyResult<UserProfile>;

    /// The single playlist named `name` owned by `owner_id`, if any
    async fn find_owned_playlist(&self, owner_id: &str, name: &str) -> SpotifyResult<Option<Playlist>>;

    /// Items of a playlist in playlist order, fetched lazily
    fn playlist_items<'a>(&'a self, playlist_id: &str) -> BoxStream<'a, SpotifyResult<PlaylistItem>>;

    /// Create a private playlist
    async fn create_playlist(
        &self,
        owner_id: &str,
        name: &str,
        description: &str,
    ) -> SpotifyResult<Playlist>;

    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> SpotifyResult<BatchOutcome>;

    async fn remove_tracks(&self, playlist_id: &str, uris: &[String]) -> SpotifyResult<BatchOutcome>;

    async fn update_description(&self, playlist_id: &str, description: &str) -> SpotifyResult<()>;
}

#[async_trait]
impl PlaylistApi for SpotifyClient {
    async fn current_user(&self) -> SpotifyResult<UserProfile> {
        self.get_current_user_profile().await
    }

    async fn find_owned_playlist(&self, owner_id: &str, name: &str) -> SpotifyResult<Option<Playlist>> {
        self.find_playlist_by_name(owner_id, name).await
    }

    fn playlist_items<'a>(&'a self, playlist_id: &str) -> BoxStream<'a, SpotifyResult<PlaylistItem>> {
        self.list_playlist_tracks(playlist_id).boxed()
    }

    async fn create_playlist(
        &self,
        owner_id: &str,
        name: &str,
        description: &str,
    ) -> SpotifyResult<Playlist> {
        SpotifyClient::create_playlist(self, owner_id, name, description).await
    }

    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> SpotifyResult<BatchOutcome> {
        SpotifyClient::add_tracks(self, playlist_id, uris).await
    }

    async fn remove_tracks(&self, playlist_id: &str, uris: &[String]) -> SpotifyResult<BatchOutcome> {
        SpotifyClient::remove_tracks(self, playlist_id, uris).await
    }

    async fn update_description(&self, playlist_id: &str, description: &str) -> SpotifyResult<()> {
        self.update_playlist_description(playlist_id, description).await
    }
}
