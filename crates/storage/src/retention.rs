//! Tiered time-decay eviction over the automatic-backup index.

use crate::index::{FileKind, RetentionEntry, RetentionIndex};
use crate::StorageError;
use chrono::{Duration, NaiveDateTime};
use std::path::{Path, PathBuf};
use tracing::info;

/// Budgeted eviction biased toward recency: a handful of near-present
/// entries are kept unconditionally, roughly a day's worth survive at
/// hourly granularity, and a short tail survives beyond that.
///
/// Classification ages are measured against a mutable reference clock.
/// Whenever an hourly-tier entry is evicted the reference clock rewinds to
/// that entry's timestamp, so the effective spacing between survivors
/// widens the further back the scan goes. The budgets only ever decrease
/// within a pass; an exhausted tier stays exhausted.
#[derive(Debug, Clone, Copy)]
pub struct TieredPolicy {
    /// Entries no older than one hour kept unconditionally.
    pub recent_budget: u32,
    /// Entries between one hour and one day old.
    pub hourly_budget: u32,
    /// Entries older than one day.
    pub daily_budget: u32,
    /// Pruning runs only once the index grows past this many entries.
    pub capacity: usize,
}

impl Default for TieredPolicy {
    fn default() -> Self {
        Self { recent_budget: 5, hourly_budget: 24, daily_budget: 7, capacity: 50 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PruneOutcome {
    pub kept: usize,
    pub deleted: usize,
}

impl TieredPolicy {
    /// Runs one eviction pass over `index`, newest entry first, using `now`
    /// as the initial reference clock. Deleted entries release their
    /// backing files.
    pub fn enforce(
        &self,
        index: &mut RetentionIndex,
        now: NaiveDateTime,
    ) -> Result<PruneOutcome, StorageError> {
        let mut reference = now;
        let mut recent = self.recent_budget;
        let mut hourly = self.hourly_budget;
        let mut daily = self.daily_budget;

        let mut deleted = 0;
        let mut at = 0;
        while at < index.len() {
            let timestamp = index.entries()[at].timestamp;
            let age = reference - timestamp;

            if age <= Duration::hours(1) {
                if recent > 0 {
                    recent -= 1;
                    at += 1;
                } else {
                    index.remove_at(at)?;
                    deleted += 1;
                }
            } else if age <= Duration::days(1) {
                if hourly > 0 {
                    hourly -= 1;
                    at += 1;
                } else {
                    index.remove_at(at)?;
                    deleted += 1;
                    reference = timestamp;
                }
            } else if daily > 0 {
                daily -= 1;
                at += 1;
            } else {
                index.remove_at(at)?;
                deleted += 1;
            }
        }

        let outcome = PruneOutcome { kept: index.len(), deleted };
        if deleted > 0 {
            info!(kept = outcome.kept, deleted = outcome.deleted, "pruned backup index");
        }
        Ok(outcome)
    }
}

/// The automatic-backup index: a [`RetentionIndex`] that enforces a
/// [`TieredPolicy`] whenever an addition pushes it past capacity. The
/// user-save index is a bare [`RetentionIndex`] and never prunes.
#[derive(Debug, Clone, Default)]
pub struct BackupIndex {
    index: RetentionIndex,
    policy: TieredPolicy,
}

impl BackupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: TieredPolicy) -> Self {
        Self { index: RetentionIndex::new(), policy }
    }

    pub fn scan(dir: &Path) -> Result<Self, StorageError> {
        Ok(Self { index: RetentionIndex::scan(dir, FileKind::Backup)?, policy: TieredPolicy::default() })
    }

    /// Registers a freshly written backup. When the index now exceeds
    /// capacity, an eviction pass runs with the new entry's timestamp as
    /// the reference time and its outcome is returned.
    pub fn record(
        &mut self,
        timestamp: NaiveDateTime,
        path: PathBuf,
    ) -> Result<Option<PruneOutcome>, StorageError> {
        self.index.add(timestamp, path);
        if self.index.len() > self.policy.capacity {
            return self.policy.enforce(&mut self.index, timestamp).map(Some);
        }
        Ok(None)
    }

    /// Runs an eviction pass regardless of the capacity trigger.
    pub fn force_prune(&mut self, now: NaiveDateTime) -> Result<PruneOutcome, StorageError> {
        self.policy.enforce(&mut self.index, now)
    }

    pub fn latest(&self) -> Option<&RetentionEntry> {
        self.index.latest()
    }

    pub fn entries(&self) -> &[RetentionEntry] {
        self.index.entries()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
