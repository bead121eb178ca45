//! Orchestration: capture/restore/backup against a snapshot store and its
//! retention indexes, serialized behind one [`OperationGuard`].

use crate::capture::capture;
use crate::guard::OperationGuard;
use crate::restore::{restore, RestoreOutcome};
use chrono::NaiveDateTime;
use desk_engine::{WindowSystem, WindowSystemError};
use std::path::{Path, PathBuf};
use storage::{
    BackupIndex, FileKind, PruneOutcome, RetentionEntry, RetentionIndex, SnapshotStore,
    StorageError,
};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// Another capture/restore/backup operation is already in flight.
    #[error("another operation is already in progress")]
    Busy,
    /// Nothing has been saved yet, so there is nothing to restore.
    #[error("no saved arrangements")]
    NothingSaved,
    #[error(transparent)]
    WindowSystem(#[from] WindowSystemError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Owns the window-system handle, the snapshot store, and both retention
/// indexes: the unbounded user-save index and the pruned backup index.
///
/// Every mutating operation claims the guard for its full duration; the
/// indexes have no internal locking, so pruning must never overlap another
/// operation. Rebuilds both indexes from a directory scan at construction.
pub struct Coordinator<S> {
    system: S,
    store: SnapshotStore,
    saves: RetentionIndex,
    backups: BackupIndex,
    guard: OperationGuard,
}

impl<S: WindowSystem> Coordinator<S> {
    pub fn new(system: S, store: SnapshotStore) -> Result<Self, StorageError> {
        let saves = RetentionIndex::scan(store.root(), FileKind::Arrangement)?;
        let backups = BackupIndex::scan(store.root())?;
        Ok(Self { system, store, saves, backups, guard: OperationGuard::new() })
    }

    /// The shared busy flag; the embedding layer may hold it to block
    /// operations during its own critical sections.
    pub fn guard(&self) -> &OperationGuard {
        &self.guard
    }

    pub fn system(&self) -> &S {
        &self.system
    }

    pub fn into_system(self) -> S {
        self.system
    }

    pub fn saves(&self) -> &RetentionIndex {
        &self.saves
    }

    pub fn backups(&self) -> &BackupIndex {
        &self.backups
    }

    pub fn latest_arrangement(&self) -> Option<&RetentionEntry> {
        self.saves.latest()
    }

    /// Captures the live window set into a new `arrangement_` file and
    /// indexes it. Returns the file path.
    pub fn save_arrangement(&mut self, now: NaiveDateTime) -> Result<PathBuf, CoordinatorError> {
        let _permit = self.guard.try_acquire().ok_or(CoordinatorError::Busy)?;

        let arrangement = capture(&self.system)?;
        let path = self.store.arrangement_path(now);
        self.store.save_arrangement(&arrangement, &path)?;
        self.saves.add(now, path.clone());

        info!(windows = arrangement.len(), path = %path.display(), "arrangement saved");
        Ok(path)
    }

    /// Captures into a new `backup_` file and records it in the backup
    /// index, pruning when the addition pushes the index past capacity.
    pub fn backup(
        &mut self,
        now: NaiveDateTime,
    ) -> Result<(PathBuf, Option<PruneOutcome>), CoordinatorError> {
        let _permit = self.guard.try_acquire().ok_or(CoordinatorError::Busy)?;

        let arrangement = capture(&self.system)?;
        let path = self.store.backup_path(now);
        self.store.save_arrangement(&arrangement, &path)?;
        let pruned = self.backups.record(now, path.clone())?;

        info!(windows = arrangement.len(), path = %path.display(), "backup recorded");
        Ok((path, pruned))
    }

    /// Applies the arrangement stored at `path` to the live window set.
    pub fn restore_from(&mut self, path: &Path) -> Result<RestoreOutcome, CoordinatorError> {
        let _permit = self.guard.try_acquire().ok_or(CoordinatorError::Busy)?;

        let arrangement = self.store.load_arrangement(path)?;
        let outcome = restore(&mut self.system, &arrangement)?;

        info!(applied = outcome.applied, skipped = outcome.skipped, "arrangement restored");
        Ok(outcome)
    }

    /// Applies the most recent user-saved arrangement.
    pub fn restore_latest(&mut self) -> Result<RestoreOutcome, CoordinatorError> {
        let path =
            self.saves.latest().map(|entry| entry.path.clone()).ok_or(CoordinatorError::NothingSaved)?;
        self.restore_from(&path)
    }

    /// Runs a retention pass over the backup index regardless of capacity.
    pub fn prune_backups(&mut self, now: NaiveDateTime) -> Result<PruneOutcome, CoordinatorError> {
        let _permit = self.guard.try_acquire().ok_or(CoordinatorError::Busy)?;
        Ok(self.backups.force_prune(now)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use desk_engine::SimWindowSystem;
    use win_model::{Point, Rect, WindowKey, WindowPlacement};

    fn placement_at(x: i32, y: i32) -> WindowPlacement {
        WindowPlacement {
            flags: 0,
            show_cmd: 1,
            min_position: Point { x: -1, y: -1 },
            max_position: Point { x: -1, y: -1 },
            normal_rect: Rect { left: x, top: y, right: x + 640, bottom: y + 480 },
        }
    }

    fn stamp(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn seeded_system() -> SimWindowSystem {
        let mut sys = SimWindowSystem::new();
        sys.create_desktop().unwrap();
        sys.open_window(WindowKey::new("a.exe", "A"), Some(0), placement_at(0, 0));
        sys.open_window(WindowKey::new("b.exe", "B"), Some(1), placement_at(50, 50));
        sys
    }

    #[test]
    fn save_then_restore_latest_round_trips() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = SnapshotStore::with_root(temp.path());
        let mut coordinator = Coordinator::new(seeded_system(), store).unwrap();

        let path = coordinator.save_arrangement(stamp("2026-08-07 12:00:00")).unwrap();
        assert!(path.exists());
        assert_eq!(coordinator.latest_arrangement().unwrap().path, path);

        let outcome = coordinator.restore_latest().unwrap();
        assert_eq!(outcome, RestoreOutcome { applied: 2, skipped: 0 });
    }

    #[test]
    fn restore_latest_without_saves_is_a_distinct_error() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = SnapshotStore::with_root(temp.path());
        let mut coordinator = Coordinator::new(seeded_system(), store).unwrap();

        assert!(matches!(
            coordinator.restore_latest(),
            Err(CoordinatorError::NothingSaved)
        ));
    }

    #[test]
    fn operations_are_rejected_while_the_guard_is_held() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = SnapshotStore::with_root(temp.path());
        let mut coordinator = Coordinator::new(seeded_system(), store).unwrap();

        let permit = coordinator.guard().clone().try_acquire().unwrap();

        let now = stamp("2026-08-07 12:00:00");
        assert!(matches!(coordinator.save_arrangement(now), Err(CoordinatorError::Busy)));
        assert!(matches!(coordinator.backup(now), Err(CoordinatorError::Busy)));
        assert!(matches!(coordinator.prune_backups(now), Err(CoordinatorError::Busy)));

        drop(permit);
        assert!(coordinator.save_arrangement(now).is_ok());
    }

    #[test]
    fn indexes_are_rebuilt_from_the_directory_at_startup() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = SnapshotStore::with_root(temp.path());

        {
            let mut coordinator = Coordinator::new(seeded_system(), store.clone()).unwrap();
            coordinator.save_arrangement(stamp("2026-08-07 10:00:00")).unwrap();
            coordinator.save_arrangement(stamp("2026-08-07 11:00:00")).unwrap();
            coordinator.backup(stamp("2026-08-07 11:30:00")).unwrap();
        }

        let coordinator = Coordinator::new(seeded_system(), store).unwrap();
        assert_eq!(coordinator.saves().len(), 2);
        assert_eq!(coordinator.backups().len(), 1);
        assert_eq!(
            coordinator.latest_arrangement().unwrap().timestamp,
            stamp("2026-08-07 11:00:00")
        );
    }

    #[test]
    fn user_save_index_never_prunes() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = SnapshotStore::with_root(temp.path());
        let mut coordinator = Coordinator::new(seeded_system(), store).unwrap();

        let start = stamp("2026-08-01 00:00:00");
        for i in 0..55 {
            coordinator.save_arrangement(start + Duration::minutes(i)).unwrap();
        }

        assert_eq!(coordinator.saves().len(), 55);
        for entry in coordinator.saves().entries() {
            assert!(entry.path.exists());
        }
    }

    #[test]
    fn backup_index_is_bounded_by_the_retention_policy() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = SnapshotStore::with_root(temp.path());
        let mut coordinator = Coordinator::new(seeded_system(), store).unwrap();

        // 60 backups spaced 10 minutes apart, oldest first.
        let start = stamp("2026-08-01 00:00:00");
        let mut last_prune = None;
        for i in 0..60 {
            let (_, pruned) = coordinator.backup(start + Duration::minutes(10 * i)).unwrap();
            if pruned.is_some() {
                last_prune = pruned;
            }
            assert!(coordinator.backups().len() <= 51);
        }

        assert!(last_prune.is_some());
        assert!(coordinator.backups().len() <= 50);
        // Index entries and on-disk files agree.
        for entry in coordinator.backups().entries() {
            assert!(entry.path.exists());
        }
    }
}
