use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use junk_mover::{persist_rotated_refresh_token, AuditLog, TriageJob};
use junk_mover_shared_config::{load_dotenv, JunkMoverConfig};
use junk_mover_spotify_client::{SpotifyClient, TokenBroker};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    load_dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "junk_mover=info,junk_mover_spotify_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Junk Mover");

    let config = JunkMoverConfig::from_env().context("Failed to load configuration")?;
    let audit = AuditLog::daily(&config.triage.log_dir).with_context(|| {
        format!(
            "Failed to open audit log directory {}",
            config.triage.log_dir.display()
        )
    })?;

    let broker = Arc::new(TokenBroker::new(&config.spotify)?);
    let client = SpotifyClient::new(&config.spotify, broker.clone())?;

    let mut job = TriageJob::new(config.triage, broker.clone(), client, audit);
    let result = job.run().await;

    // Spotify may rotate the refresh token even on runs that fail later
    if let Err(e) = persist_rotated_refresh_token(&broker, Path::new(".env")) {
        tracing::warn!(error = %e, "Failed to store rotated refresh token");
    }

    let report = result.context("Triage run failed")?;
    tracing::info!(
        "Summary: scanned={} skipped={} moved={} failed={}",
        report.summary.scanned,
        report.summary.skipped,
        report.summary.moved,
        report.summary.failed
    );

    Ok(())
}
