//! Obtain a refresh token through the authorization-code flow
//!
//! Prints the consent URL, reads the URL Spotify redirected to from stdin,
//! exchanges the code and writes the refresh token to `.env`.

use std::path::Path;

use anyhow::{bail, Context};
use junk_mover_shared_config::{load_dotenv, upsert_env_var, SpotifyConfig};
use junk_mover_spotify_client::{
    authorize_url, exchange_authorization_code, extract_authorization_code, REQUIRED_SCOPES,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const ENV_FILE: &str = ".env";
const REFRESH_TOKEN_VAR: &str = "JUNK_MOVER_REFRESH_TOKEN";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "junk_mover_authorize=info,junk_mover_spotify_client=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SpotifyConfig::from_env_without_refresh_token()
        .context("Failed to load Spotify client credentials")?;

    println!("Open this URL in a browser and approve access:\n");
    println!("{}\n", authorize_url(&config, REQUIRED_SCOPES)?);
    println!("Then paste the full URL you were redirected to:");

    let mut redirected = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut redirected)
        .await
        .context("Failed to read the redirected URL")?;

    let code = extract_authorization_code(&redirected)?;
    let tokens = exchange_authorization_code(&config, &code)
        .await
        .context("Failed to exchange the authorization code")?;

    let Some(refresh_token) = tokens.refresh_token else {
        bail!("Spotify did not return a refresh token");
    };

    upsert_env_var(Path::new(ENV_FILE), REFRESH_TOKEN_VAR, &refresh_token)
        .with_context(|| format!("Failed to write {}", ENV_FILE))?;
    tracing::info!(scope = ?tokens.scope, "Authorization complete");
    println!("Stored {} in {}", REFRESH_TOKEN_VAR, ENV_FILE);

    Ok(())
}
