//! Shared test utilities for the Junk Mover workspace
//!
//! This crate provides a wiremock-backed stand-in for the Spotify accounts
//! service and Web API, plus JSON fixtures for the objects the triage job
//! reads.
//!
//! # Example
//!
//! ```rust,ignore
//! use junk_mover_test_utils::{MockSpotifyServer, PlaylistFixture};
//!
//! #[tokio::test]
//! async fn test_with_mocks() {
//!     let spotify = MockSpotifyServer::start().await;
//!     spotify.mock_token_success().await;
//!     spotify.mock_playlists(vec![PlaylistFixture::owned("src", "Inbox")]).await;
//!
//!     // Use spotify.config() to build a TokenBroker and SpotifyClient
//! }
//! ```

mod fixtures;
mod spotify;

pub use fixtures::{PlaylistFixture, PlaylistItemFixture, TEST_USER_ID};
pub use spotify::{MockSpotifyServer, TEST_ACCESS_TOKEN};
