//! Durable audit trail of triage runs
//!
//! Every decision, description update and run marker becomes one JSON line.
//! [`DailyFileSink`] writes one file per local calendar day and prunes
//! files past the retention window whenever it opens a new day's file.
//! Each line is flushed to the file before `write_entry` returns, so a run
//! killed mid-apply leaves every decision made so far on disk.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Days, Local, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::decision::{TriageDecision, TriageSummary};
use crate::error::JobError;
use crate::job::JobState;

/// Audit files are named `junk_mover.<YYYY-MM-DD>.log`
const FILE_PREFIX: &str = "junk_mover.";
const FILE_SUFFIX: &str = ".log";

/// Days of audit files kept on disk
pub const DEFAULT_RETENTION_DAYS: u64 = 365;

/// One line of the audit trail
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: AuditEvent,
}

impl AuditEntry {
    pub fn new(event: AuditEvent) -> Self {
        Self::at(Utc::now(), event)
    }

    pub fn at(timestamp: DateTime<Utc>, event: AuditEvent) -> Self {
        Self { timestamp, event }
    }
}

/// What an audit line records
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    RunStarted {
        source_playlist: String,
        duration_days: i64,
        reference_now: DateTime<Utc>,
    },
    Decision(TriageDecision),
    DescriptionUpdated {
        playlist_id: String,
        succeeded: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    RunFinished(TriageSummary),
    RunFailed {
        state: JobState,
        error: String,
    },
}

/// Destination for audit entries
pub trait AuditSink: Send + Sync {
    /// Append one entry
    fn write_entry(&self, entry: &AuditEntry) -> io::Result<()>;

    /// Push buffered entries to durable storage
    fn flush(&self) -> io::Result<()>;
}

struct OpenDay {
    date: NaiveDate,
    writer: BufWriter<File>,
}

/// JSON-lines files rotated on the local calendar day
pub struct DailyFileSink {
    dir: PathBuf,
    retention_days: u64,
    current: Mutex<Option<OpenDay>>,
}

impl DailyFileSink {
    /// Create the sink, creating `dir` if it does not exist
    pub fn new(dir: impl Into<PathBuf>, retention_days: u64) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            retention_days,
            current: Mutex::new(None),
        })
    }

    /// Path of the file holding entries for `date`
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(file_name_for(date))
    }

    fn lock(&self) -> MutexGuard<'_, Option<OpenDay>> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn open_day(&self, date: NaiveDate) -> io::Result<OpenDay> {
        if let Err(e) = prune_expired(&self.dir, date, self.retention_days) {
            warn!(dir = %self.dir.display(), error = %e, "Failed to prune old audit files");
        }

        let path = self.path_for(date);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!(path = %path.display(), "Opened audit file");
        Ok(OpenDay {
            date,
            writer: BufWriter::new(file),
        })
    }
}

impl AuditSink for DailyFileSink {
    fn write_entry(&self, entry: &AuditEntry) -> io::Result<()> {
        let date = entry.timestamp.with_timezone(&Local).date_naive();
        let mut current = self.lock();

        if current.as_ref().map(|day| day.date) != Some(date) {
            if let Some(mut previous) = current.take() {
                previous.writer.flush()?;
            }
            *current = Some(self.open_day(date)?);
        }

        if let Some(day) = current.as_mut() {
            serde_json::to_writer(&mut day.writer, entry)?;
            day.writer.write_all(b"\n")?;
            day.writer.flush()?;
        }
        Ok(())
    }

    fn flush(&self) -> io::Result<()> {
        match self.lock().as_mut() {
            Some(day) => day.writer.flush(),
            None => Ok(()),
        }
    }
}

/// Name of the audit file for `date`
pub fn file_name_for(date: NaiveDate) -> String {
    format!("{}{}{}", FILE_PREFIX, date.format("%Y-%m-%d"), FILE_SUFFIX)
}

fn date_of_file(name: &str) -> Option<NaiveDate> {
    let date = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Delete audit files dated more than `retention_days` before `today`
///
/// Returns the number of files removed. Files not matching the audit
/// naming scheme are left alone.
pub fn prune_expired(dir: &Path, today: NaiveDate, retention_days: u64) -> io::Result<usize> {
    let Some(oldest_kept) = today.checked_sub_days(Days::new(retention_days)) else {
        return Ok(0);
    };

    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(date) = name.to_str().and_then(date_of_file) else {
            continue;
        };
        if date < oldest_kept {
            fs::remove_file(entry.path())?;
            info!(file = %entry.path().display(), "Pruned expired audit file");
            removed += 1;
        }
    }
    Ok(removed)
}

/// In-memory sink, for tests and dry inspection
#[derive(Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries written so far
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Decisions written so far, in order
    pub fn decisions(&self) -> Vec<TriageDecision> {
        self.entries()
            .into_iter()
            .filter_map(|entry| match entry.event {
                AuditEvent::Decision(decision) => Some(decision),
                _ => None,
            })
            .collect()
    }
}

impl AuditSink for MemorySink {
    fn write_entry(&self, entry: &AuditEntry) -> io::Result<()> {
        self.entries
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "audit buffer poisoned"))?
            .push(entry.clone());
        Ok(())
    }

    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Append-only audit log for triage runs
///
/// Each entry is also mirrored to `tracing`.
#[derive(Clone)]
pub struct AuditLog {
    sink: Arc<dyn AuditSink>,
}

impl AuditLog {
    /// Audit log writing daily files under `dir` with the default retention
    pub fn daily(dir: impl Into<PathBuf>) -> io::Result<Self> {
        Ok(Self::with_sink(Arc::new(DailyFileSink::new(
            dir,
            DEFAULT_RETENTION_DAYS,
        )?)))
    }

    pub fn with_sink(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    fn write(&self, event: AuditEvent) -> io::Result<()> {
        self.sink.write_entry(&AuditEntry::new(event))
    }

    pub fn record_run_start(
        &self,
        source_playlist: &str,
        duration_days: i64,
        reference_now: DateTime<Utc>,
    ) -> io::Result<()> {
        info!(
            source_playlist = %source_playlist,
            duration_days = duration_days,
            reference_now = %reference_now,
            "Triage run started"
        );
        self.write(AuditEvent::RunStarted {
            source_playlist: source_playlist.to_string(),
            duration_days,
            reference_now,
        })
    }

    /// Record the decision taken for one item
    pub fn record(&self, decision: &TriageDecision) -> io::Result<()> {
        info!(
            uri = decision.uri.as_deref().unwrap_or("-"),
            added_at = decision.added_at.as_deref().unwrap_or("-"),
            bucket = decision.bucket.as_deref().unwrap_or("-"),
            outcome = ?decision.outcome,
            reason = %decision.reason,
            "Track decision"
        );
        self.write(AuditEvent::Decision(decision.clone()))
    }

    pub fn record_description_update(&self, playlist_id: &str, error: Option<String>) -> io::Result<()> {
        match &error {
            None => info!(playlist_id = %playlist_id, "Playlist description updated"),
            Some(e) => warn!(playlist_id = %playlist_id, error = %e, "Playlist description not updated"),
        }
        self.write(AuditEvent::DescriptionUpdated {
            playlist_id: playlist_id.to_string(),
            succeeded: error.is_none(),
            error,
        })
    }

    /// Record the final counters and flush
    pub fn record_run_summary(&self, summary: &TriageSummary) -> io::Result<()> {
        info!(
            scanned = summary.scanned,
            skipped = summary.skipped,
            moved = summary.moved,
            failed = summary.failed,
            "Triage run finished"
        );
        self.write(AuditEvent::RunFinished(*summary))?;
        self.sink.flush()
    }

    /// Record a fatal error and flush
    pub fn record_run_failed(&self, state: JobState, error: &JobError) -> io::Result<()> {
        self.write(AuditEvent::RunFailed {
            state,
            error: error.to_string(),
        })?;
        self.sink.flush()
    }
}
