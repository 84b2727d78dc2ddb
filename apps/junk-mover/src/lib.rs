//! Junk Mover: triage a holding playlist into year-bucketed junk drawers
//!
//! The [`TriageJob`] authenticates through a token provider, lists the
//! source playlist, moves items older than the configured threshold into
//! `"<YY> <suffix>"` playlists and writes every decision to the
//! [`AuditLog`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use junk_mover::{AuditLog, TriageJob};
//! use junk_mover_shared_config::JunkMoverConfig;
//! use junk_mover_spotify_client::{SpotifyClient, TokenBroker};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = JunkMoverConfig::from_env()?;
//! let broker = Arc::new(TokenBroker::new(&config.spotify)?);
//! let client = SpotifyClient::new(&config.spotify, broker.clone())?;
//! let audit = AuditLog::daily(&config.triage.log_dir)?;
//!
//! let mut job = TriageJob::new(config.triage, broker, client, audit);
//! let report = job.run().await?;
//! println!("moved {} tracks", report.summary.moved);
//! # Ok(())
//! # }
//! ```

pub mod age;
pub mod api;
pub mod audit;
pub mod bucket;
pub mod credentials;
pub mod decision;
pub mod error;
pub mod job;

pub use age::{is_eligible, parse_added_at};
pub use api::PlaylistApi;
pub use audit::{AuditEntry, AuditEvent, AuditLog, AuditSink, DailyFileSink, MemorySink};
pub use bucket::{bucket_name_for, Bucket, BucketRouter};
pub use credentials::persist_rotated_refresh_token;
pub use decision::{Outcome, TriageDecision, TriageSummary};
pub use error::{ErrorSeverity, JobError, JobResult};
pub use job::{BucketReport, JobState, TriageJob, TriageReport, NO_TRACK_URI};
