//! Spotify Web API client for Junk Mover
//!
//! This crate provides the pieces of the Spotify Web API the triage job
//! depends on:
//! - Refresh-token exchange with cached, renewable access tokens
//! - Lazily paged playlist and playlist-item listings
//! - Chunked add/remove calls that report per-URI outcomes
//! - Bounded retries for rate limits and server errors
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use futures_util::TryStreamExt;
//! use junk_mover_shared_config::SpotifyConfig;
//! use junk_mover_spotify_client::{SpotifyClient, TokenBroker};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SpotifyConfig::from_env()?;
//! let broker = Arc::new(TokenBroker::new(&config)?);
//! let client = SpotifyClient::new(&config, broker)?;
//!
//! let me = client.get_current_user_profile().await?;
//! if let Some(playlist) = client.find_playlist_by_name(&me.id, "Big Junk Drawer").await? {
//!     let items: Vec<_> = client.list_playlist_tracks(&playlist.id).try_collect().await?;
//!     println!("{} items", items.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Environment Variables
//!
//! See [`SpotifyConfig::from_env`].

mod auth;
mod client;
mod error;
mod models;
mod retry;

pub use auth::{
    authorize_url, exchange_authorization_code, extract_authorization_code, AccessToken,
    AccessTokenProvider, TokenBroker, REQUIRED_SCOPES,
};
pub use client::{SpotifyClient, MAX_BATCH_SIZE};
pub use error::{SpotifyError, SpotifyResult};
pub use models::{
    BatchOutcome, FailedUri, Playlist, PlaylistItem, PlaylistOwner, TokenResponse, TrackRef,
    UserProfile,
};
pub use retry::RetryPolicy;
