//! The triage job
//!
//! Moves every item of the source playlist that is older than the
//! configured threshold into the junk drawer for the year it was added.
//! The run walks through [`JobState`] in order; any job-level error ends
//! it in [`JobState::Failed`].
//!
//! Tracks are always added to the destination before they are removed from
//! the source, so an interrupted or partially failed run can leave a track
//! in both playlists but never in neither.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use futures_util::TryStreamExt;
use junk_mover_shared_config::TriageConfig;
use junk_mover_spotify_client::{AccessTokenProvider, BatchOutcome, Playlist, PlaylistItem};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::age::{is_eligible, parse_added_at};
use crate::api::PlaylistApi;
use crate::audit::AuditLog;
use crate::bucket::{Bucket, BucketRouter};
use crate::decision::{Outcome, TriageDecision, TriageSummary};
use crate::error::{JobError, JobResult};

/// Reason recorded for items whose track is unavailable
pub const NO_TRACK_URI: &str = "no track uri";

/// Progress of a triage run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Init,
    Authenticated,
    SourceResolved,
    Scanning,
    Routing,
    Applying,
    Done,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Authenticated => "authenticated",
            Self::SourceResolved => "source_resolved",
            Self::Scanning => "scanning",
            Self::Routing => "routing",
            Self::Applying => "applying",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of applying one bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketReport {
    pub name: String,
    /// Destination playlist, if it could be resolved
    pub playlist_id: Option<String>,
    pub moved: usize,
    pub failed: usize,
}

/// Result of a run that reached [`JobState::Done`]
#[derive(Debug, Clone)]
pub struct TriageReport {
    pub summary: TriageSummary,
    pub buckets: Vec<BucketReport>,
    /// Every decision, in the order it was audited
    pub decisions: Vec<TriageDecision>,
}

/// An eligible item waiting to be moved
#[derive(Debug, Clone)]
struct Candidate {
    uri: String,
    added_at: String,
}

/// Decisions and counters accumulated during a run
struct Ledger<'a> {
    audit: &'a AuditLog,
    summary: TriageSummary,
    decisions: Vec<TriageDecision>,
}

impl<'a> Ledger<'a> {
    fn new(audit: &'a AuditLog) -> Self {
        Self {
            audit,
            summary: TriageSummary::default(),
            decisions: Vec::new(),
        }
    }

    fn record(&mut self, decision: TriageDecision) -> JobResult<()> {
        self.audit.record(&decision)?;
        self.summary.count(decision.outcome);
        self.decisions.push(decision);
        Ok(())
    }
}

/// Orchestrates one triage run against a [`PlaylistApi`]
pub struct TriageJob<A: PlaylistApi> {
    config: TriageConfig,
    tokens: Arc<dyn AccessTokenProvider>,
    api: A,
    audit: AuditLog,
    state: JobState,
}

impl<A: PlaylistApi> TriageJob<A> {
    pub fn new(
        config: TriageConfig,
        tokens: Arc<dyn AccessTokenProvider>,
        api: A,
        audit: AuditLog,
    ) -> Self {
        Self {
            config,
            tokens,
            api,
            audit,
            state: JobState::Init,
        }
    }

    /// Current state; `Done` or `Failed` once a run has returned
    pub fn state(&self) -> JobState {
        self.state
    }

    /// Run the job with the current time as reference
    pub async fn run(&mut self) -> JobResult<TriageReport> {
        self.run_at(Utc::now()).await
    }

    /// Run the job, judging item ages against `reference_now`
    ///
    /// Per-item failures are part of the report; only job-level errors
    /// (configuration, authentication, missing source, audit log) are
    /// returned as `Err`.
    pub async fn run_at(&mut self, reference_now: DateTime<Utc>) -> JobResult<TriageReport> {
        self.state = JobState::Init;

        let mut state = JobState::Init;
        let result = execute(
            &self.config,
            self.tokens.as_ref(),
            &self.api,
            &self.audit,
            reference_now,
            &mut state,
        )
        .await;

        match result {
            Ok(report) => {
                self.state = JobState::Done;
                Ok(report)
            }
            Err(e) => {
                self.state = JobState::Failed;
                e.log();
                warn!(failed_in = %state, "Triage run failed");
                if let Err(audit_err) = self.audit.record_run_failed(state, &e) {
                    warn!(error = %audit_err, "Failed to audit run failure");
                }
                Err(e)
            }
        }
    }
}

fn enter(state: &mut JobState, next: JobState) {
    debug!(from = %state, to = %next, "Job state transition");
    *state = next;
}

async fn execute<A: PlaylistApi + ?Sized>(
    config: &TriageConfig,
    tokens: &dyn AccessTokenProvider,
    api: &A,
    audit: &AuditLog,
    reference_now: DateTime<Utc>,
    state: &mut JobState,
) -> JobResult<TriageReport> {
    // INIT: nothing remote is contacted until the configuration holds
    audit.record_run_start(&config.source_playlist, config.duration_days, reference_now)?;
    config.validate()?;
    let duration_days = u64::try_from(config.duration_days)
        .map_err(|_| JobError::Config("duration_days cannot be negative".to_string()))?;

    tokens.access_token().await?;
    let profile = api.current_user().await?;
    enter(state, JobState::Authenticated);
    info!(user = %profile.label(), "Authenticated");

    let source = api
        .find_owned_playlist(&profile.id, &config.source_playlist)
        .await?
        .ok_or_else(|| {
            JobError::NotFound(format!(
                "playlist '{}' owned by {}",
                config.source_playlist,
                profile.label()
            ))
        })?;
    enter(state, JobState::SourceResolved);
    info!(playlist = %source.name, playlist_id = %source.id, "Using source playlist");

    enter(state, JobState::Scanning);
    let mut ledger = Ledger::new(audit);
    let mut router = BucketRouter::new(api, &profile.id, &source.name, &config.bucket_suffix);
    let buckets = scan(api, &source, &router, reference_now, duration_days, &mut ledger).await?;
    let candidate_count: usize = buckets.values().map(Vec::len).sum();
    info!(
        scanned = ledger.summary.scanned,
        eligible = candidate_count,
        buckets = buckets.len(),
        "Scanned source playlist"
    );

    enter(state, JobState::Routing);
    let mut routed: Vec<(Bucket, Result<Playlist, JobError>, Vec<Candidate>)> = Vec::new();
    for (bucket, candidates) in buckets {
        match router.resolve_or_create(&bucket).await {
            Ok(playlist) => routed.push((bucket, Ok(playlist), candidates)),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(bucket = %bucket.name, error = %e, "Junk drawer unavailable");
                routed.push((bucket, Err(e), candidates));
            }
        }
    }

    enter(state, JobState::Applying);
    let run_stamp = reference_now.to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut bucket_reports = Vec::with_capacity(routed.len());
    for (bucket, destination, candidates) in routed {
        let report = match destination {
            Ok(playlist) => {
                let report =
                    apply_bucket(api, &source, &bucket, &playlist, &candidates, &mut ledger)
                        .await?;
                if config.update_descriptions && report.moved > 0 {
                    let description = format!(
                        "{}. Last run {} moved {} tracks.",
                        router.base_description(&bucket),
                        run_stamp,
                        report.moved
                    );
                    annotate(api, audit, &playlist.id, &description).await?;
                }
                report
            }
            Err(e) => {
                let reason = format!("destination unavailable: {}", e);
                for candidate in &candidates {
                    ledger.record(TriageDecision::failed(
                        Some(&candidate.uri),
                        Some(&candidate.added_at),
                        Some(&bucket.name),
                        reason.clone(),
                    ))?;
                }
                BucketReport {
                    name: bucket.name.clone(),
                    playlist_id: None,
                    moved: 0,
                    failed: candidates.len(),
                }
            }
        };
        bucket_reports.push(report);
    }

    if config.update_descriptions && candidate_count > 0 {
        let description = format!(
            "{} (managed by Junk Mover). Last run {} moved {} tracks to junk drawers.",
            source.name, run_stamp, ledger.summary.moved
        );
        annotate(api, audit, &source.id, &description).await?;
    }

    audit.record_run_summary(&ledger.summary)?;
    info!(
        scanned = ledger.summary.scanned,
        skipped = ledger.summary.skipped,
        moved = ledger.summary.moved,
        failed = ledger.summary.failed,
        resolved_buckets = router.resolved_count(),
        "Triage complete"
    );

    Ok(TriageReport {
        summary: ledger.summary,
        buckets: bucket_reports,
        decisions: ledger.decisions,
    })
}

/// Classify every source item and group the eligible ones by bucket
///
/// A removal takes every occurrence of a URI out of the source at once, so
/// repeated URIs follow the bucket of their first occurrence, and a URI
/// with any occurrence that stays in the source is not moved at all.
async fn scan<A: PlaylistApi + ?Sized>(
    api: &A,
    source: &Playlist,
    router: &BucketRouter<'_, A>,
    reference_now: DateTime<Utc>,
    duration_days: u64,
    ledger: &mut Ledger<'_>,
) -> JobResult<BTreeMap<Bucket, Vec<Candidate>>> {
    let mut buckets: BTreeMap<Bucket, Vec<Candidate>> = BTreeMap::new();
    let mut first_bucket: HashMap<String, Bucket> = HashMap::new();
    let mut staying: HashSet<String> = HashSet::new();

    let mut items = api.playlist_items(&source.id);
    while let Some(item) = items.try_next().await? {
        ledger.summary.scanned += 1;
        let decision = classify(
            &item,
            router,
            reference_now,
            duration_days,
            &mut first_bucket,
            &mut buckets,
        );
        if let Some(decision) = decision {
            if let Some(uri) = &decision.uri {
                staying.insert(uri.clone());
            }
            ledger.record(decision)?;
        }
    }

    if !staying.is_empty() {
        for candidates in buckets.values_mut() {
            let (held, kept): (Vec<Candidate>, Vec<Candidate>) = candidates
                .drain(..)
                .partition(|candidate| staying.contains(&candidate.uri));
            *candidates = kept;
            for candidate in held {
                ledger.record(TriageDecision::skipped(
                    Some(&candidate.uri),
                    Some(&candidate.added_at),
                    "another occurrence stays in the source",
                ))?;
            }
        }
        buckets.retain(|_, candidates| !candidates.is_empty());
    }

    Ok(buckets)
}

/// Returns the decision for items that will not be moved
fn classify<A: PlaylistApi + ?Sized>(
    item: &PlaylistItem,
    router: &BucketRouter<'_, A>,
    reference_now: DateTime<Utc>,
    duration_days: u64,
    first_bucket: &mut HashMap<String, Bucket>,
    buckets: &mut BTreeMap<Bucket, Vec<Candidate>>,
) -> Option<TriageDecision> {
    let raw_added_at = item.added_at.as_deref();

    let Some(uri) = item.uri() else {
        return Some(TriageDecision::skipped(None, raw_added_at, NO_TRACK_URI));
    };
    let Some(raw) = raw_added_at else {
        return Some(TriageDecision::failed(Some(uri), None, None, "missing added_at"));
    };
    let added_at = match parse_added_at(raw) {
        Ok(added_at) => added_at,
        Err(reason) => return Some(TriageDecision::failed(Some(uri), Some(raw), None, reason)),
    };

    if !is_eligible(added_at, reference_now, duration_days) {
        return Some(TriageDecision::skipped(
            Some(uri),
            Some(raw),
            format!("added less than {} days ago", duration_days),
        ));
    }

    let bucket = first_bucket
        .entry(uri.to_string())
        .or_insert_with(|| router.bucket_for(added_at))
        .clone();
    buckets.entry(bucket).or_default().push(Candidate {
        uri: uri.to_string(),
        added_at: raw.to_string(),
    });
    None
}

/// Add a bucket's tracks to the destination, then remove what was added from the source
async fn apply_bucket<A: PlaylistApi + ?Sized>(
    api: &A,
    source: &Playlist,
    bucket: &Bucket,
    destination: &Playlist,
    candidates: &[Candidate],
    ledger: &mut Ledger<'_>,
) -> JobResult<BucketReport> {
    let uris = unique_uris(candidates);

    let added = write_or_fail_all(api.add_tracks(&destination.id, &uris).await, &uris)?;
    let added_uris: Vec<String> = added.succeeded.clone();

    let removed = if added_uris.is_empty() {
        BatchOutcome::default()
    } else {
        write_or_fail_all(api.remove_tracks(&source.id, &added_uris).await, &added_uris)?
    };

    let mut report = BucketReport {
        name: bucket.name.clone(),
        playlist_id: Some(destination.id.clone()),
        moved: 0,
        failed: 0,
    };

    for candidate in candidates {
        let decision = if let Some(reason) = added.failure_for(&candidate.uri) {
            TriageDecision::failed(
                Some(&candidate.uri),
                Some(&candidate.added_at),
                Some(&bucket.name),
                format!("add to {} failed: {}", bucket.name, reason),
            )
        } else if let Some(reason) = removed.failure_for(&candidate.uri) {
            TriageDecision::failed(
                Some(&candidate.uri),
                Some(&candidate.added_at),
                Some(&bucket.name),
                format!(
                    "duplicated: added to {} but removal from {} failed: {}",
                    bucket.name, source.name, reason
                ),
            )
        } else {
            TriageDecision::moved(&candidate.uri, &candidate.added_at, &bucket.name)
        };

        match decision.outcome {
            Outcome::Moved => report.moved += 1,
            _ => report.failed += 1,
        }
        ledger.record(decision)?;
    }

    info!(
        bucket = %bucket.name,
        playlist_id = %destination.id,
        moved = report.moved,
        failed = report.failed,
        "Applied bucket"
    );
    Ok(report)
}

/// Turn a whole-call failure into a per-URI one, unless it ends the run
fn write_or_fail_all(
    result: junk_mover_spotify_client::SpotifyResult<BatchOutcome>,
    uris: &[String],
) -> JobResult<BatchOutcome> {
    match result {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            let e = JobError::from(e);
            if e.is_fatal() {
                return Err(e);
            }
            let reason = e.to_string();
            Ok(BatchOutcome {
                succeeded: Vec::new(),
                failed: uris
                    .iter()
                    .map(|uri| junk_mover_spotify_client::FailedUri {
                        uri: uri.clone(),
                        reason: reason.clone(),
                    })
                    .collect(),
            })
        }
    }
}

fn unique_uris(candidates: &[Candidate]) -> Vec<String> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter(|candidate| seen.insert(candidate.uri.as_str()))
        .map(|candidate| candidate.uri.clone())
        .collect()
}

/// Best-effort description update; only audit log failures propagate
async fn annotate<A: PlaylistApi + ?Sized>(
    api: &A,
    audit: &AuditLog,
    playlist_id: &str,
    description: &str,
) -> JobResult<()> {
    let error = api
        .update_description(playlist_id, description)
        .await
        .err()
        .map(|e| e.to_string());
    audit.record_description_update(playlist_id, error)?;
    Ok(())
}
