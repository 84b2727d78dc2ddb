//! Credential sanity check: exchange the refresh token and print `/me`

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use junk_mover::persist_rotated_refresh_token;
use junk_mover_shared_config::{load_dotenv, SpotifyConfig};
use junk_mover_spotify_client::{SpotifyClient, TokenBroker};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "junk_mover=info,junk_mover_spotify_client=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SpotifyConfig::from_env().context("Failed to load Spotify configuration")?;
    let broker = Arc::new(TokenBroker::new(&config)?);
    let client = SpotifyClient::new(&config, broker.clone())?;

    let profile = client
        .get_current_user_profile()
        .await
        .context("Failed to fetch the current user's profile")?;

    println!("{}", serde_json::to_string_pretty(&profile)?);
    println!("Fetched profile for: {}", profile.label());

    if let Err(e) = persist_rotated_refresh_token(&broker, Path::new(".env")) {
        tracing::warn!(error = %e, "Failed to store rotated refresh token");
    }

    Ok(())
}
