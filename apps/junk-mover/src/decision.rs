//! Per-track decisions and run counters

use serde::Serialize;

/// What happened to one source playlist item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Added to its junk drawer and removed from the source
    Moved,
    /// Left in the source on purpose
    Skipped,
    /// Could not be classified or moved
    Failed,
}

/// One audited decision about a source playlist item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriageDecision {
    /// Track URI, absent for unavailable tracks
    pub uri: Option<String>,
    /// `added_at` exactly as Spotify reported it
    pub added_at: Option<String>,
    /// Destination playlist name, once the item was routed
    pub bucket: Option<String>,
    pub outcome: Outcome,
    pub reason: String,
}

impl TriageDecision {
    pub fn moved(uri: &str, added_at: &str, bucket: &str) -> Self {
        Self {
            uri: Some(uri.to_string()),
            added_at: Some(added_at.to_string()),
            bucket: Some(bucket.to_string()),
            outcome: Outcome::Moved,
            reason: format!("moved to {}", bucket),
        }
    }

    pub fn skipped(uri: Option<&str>, added_at: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            uri: uri.map(str::to_string),
            added_at: added_at.map(str::to_string),
            bucket: None,
            outcome: Outcome::Skipped,
            reason: reason.into(),
        }
    }

    pub fn failed(
        uri: Option<&str>,
        added_at: Option<&str>,
        bucket: Option<&str>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.map(str::to_string),
            added_at: added_at.map(str::to_string),
            bucket: bucket.map(str::to_string),
            outcome: Outcome::Failed,
            reason: reason.into(),
        }
    }
}

/// Counters reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TriageSummary {
    pub scanned: usize,
    pub skipped: usize,
    pub moved: usize,
    pub failed: usize,
}

impl TriageSummary {
    /// Count a decision
    ///
    /// `scanned` is counted separately, as items are read.
    pub fn count(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Moved => self.moved += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed => self.failed += 1,
        }
    }
}
