//! Arrangement persistence: JSON snapshot files in a data directory, plus
//! the timestamp-ordered retention indexes built over them.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use win_model::Arrangement;

mod index;
mod retention;

pub use index::{FileKind, RetentionEntry, RetentionIndex};
pub use retention::{BackupIndex, PruneOutcome, TieredPolicy};

const ARRANGEMENT_SCHEMA_VERSION: u32 = 1;

/// Serialization refuses arrangements beyond this many records; the caller
/// gets a distinct, user-actionable error instead of a generic I/O failure.
pub const MAX_ARRANGEMENT_WINDOWS: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local data directory")]
    NoDataDirectory,
    #[error("too many windows to save ({count}, limit {limit})")]
    TooManyWindows { count: usize, limit: usize },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ArrangementEnvelope {
    version: u32,
    windows: Arrangement,
}

/// Root-directory handle for arrangement and backup files.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn from_default_project() -> Result<Self, StorageError> {
        let dirs = ProjectDirs::from("dev", "Windowsill", "Windowsill")
            .ok_or(StorageError::NoDataDirectory)?;

        Ok(Self { root: dirs.data_local_dir().to_path_buf() })
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path for a user-initiated save stamped at `timestamp`.
    pub fn arrangement_path(&self, timestamp: chrono::NaiveDateTime) -> PathBuf {
        self.root.join(index::file_name(FileKind::Arrangement, timestamp))
    }

    /// Path for an automatic backup stamped at `timestamp`.
    pub fn backup_path(&self, timestamp: chrono::NaiveDateTime) -> PathBuf {
        self.root.join(index::file_name(FileKind::Backup, timestamp))
    }

    /// Writes `arrangement` to `path` atomically (temp file + rename).
    pub fn save_arrangement(
        &self,
        arrangement: &Arrangement,
        path: &Path,
    ) -> Result<(), StorageError> {
        if arrangement.len() > MAX_ARRANGEMENT_WINDOWS {
            return Err(StorageError::TooManyWindows {
                count: arrangement.len(),
                limit: MAX_ARRANGEMENT_WINDOWS,
            });
        }

        fs::create_dir_all(&self.root)?;

        let envelope = ArrangementEnvelope {
            version: ARRANGEMENT_SCHEMA_VERSION,
            windows: arrangement.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&envelope)?;

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, bytes)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    pub fn load_arrangement(&self, path: &Path) -> Result<Arrangement, StorageError> {
        load_arrangement(path)
    }
}

/// Loads an arrangement file. Missing files and corrupt content surface as
/// the underlying I/O or serde error.
pub fn load_arrangement(path: &Path) -> Result<Arrangement, StorageError> {
    let bytes = fs::read(path)?;
    let envelope: ArrangementEnvelope = serde_json::from_slice(&bytes)?;

    Ok(envelope.windows)
}
