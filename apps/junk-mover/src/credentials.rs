//! Keeping the stored refresh token current

use std::path::Path;

use junk_mover_shared_config::{upsert_env_var, ConfigResult};
use junk_mover_spotify_client::TokenBroker;
use tracing::{info, warn};

/// Environment variable holding the refresh token
pub const REFRESH_TOKEN_VAR: &str = "JUNK_MOVER_REFRESH_TOKEN";

/// Write a refresh token rotated during this run into the env file
///
/// Returns `true` if the file was updated. When the file does not exist the
/// token is not written anywhere and a warning asks the operator to store it.
pub fn persist_rotated_refresh_token(broker: &TokenBroker, env_path: &Path) -> ConfigResult<bool> {
    let Some(token) = broker.rotated_refresh_token() else {
        return Ok(false);
    };

    if !env_path.exists() {
        warn!(
            path = %env_path.display(),
            "Spotify issued a new refresh token but there is no env file to store it in; \
             update {} before the next run",
            REFRESH_TOKEN_VAR
        );
        return Ok(false);
    }

    upsert_env_var(env_path, REFRESH_TOKEN_VAR, &token)?;
    info!(path = %env_path.display(), "Stored rotated refresh token");
    Ok(true)
}
