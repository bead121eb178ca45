//! Timestamp-ordered registry of stored snapshot files.

use crate::StorageError;
use chrono::NaiveDateTime;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

const STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Which family of snapshot files an index tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// User-initiated saves (`arrangement_` prefix).
    Arrangement,
    /// Automatic backups (`backup_` prefix).
    Backup,
}

impl FileKind {
    fn prefix(self) -> &'static str {
        match self {
            FileKind::Arrangement => "arrangement_",
            FileKind::Backup => "backup_",
        }
    }
}

pub(crate) fn file_name(kind: FileKind, timestamp: NaiveDateTime) -> String {
    format!("{}{}.json", kind.prefix(), timestamp.format(STAMP_FORMAT))
}

/// Parses `<prefix><yyyyMMdd-HHmmss>.json`; anything else is `None`.
fn parse_file_name(kind: FileKind, name: &str) -> Option<NaiveDateTime> {
    let stamp = name.strip_prefix(kind.prefix())?.strip_suffix(".json")?;
    NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionEntry {
    pub timestamp: NaiveDateTime,
    pub path: PathBuf,
}

/// Registry of `(timestamp, path)` pairs kept in descending timestamp
/// order. The index exclusively owns the backing files: removal through
/// the index deletes the file as well.
#[derive(Debug, Clone, Default)]
pub struct RetentionIndex {
    entries: Vec<RetentionEntry>,
}

impl RetentionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds an index by scanning `dir` for files matching the `kind`
    /// naming pattern. Non-matching files are skipped silently; a missing
    /// directory yields an empty index.
    pub fn scan(dir: &Path, kind: FileKind) -> Result<Self, StorageError> {
        let read_dir = match fs::read_dir(dir) {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(err) => return Err(err.into()),
        };

        let mut index = Self::new();
        for entry in read_dir {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            match parse_file_name(kind, name) {
                Some(timestamp) => index.add(timestamp, entry.path()),
                None => debug!(file = name, "skipping non-snapshot file"),
            }
        }

        Ok(index)
    }

    /// Inserts an entry, keeping the newest-first order.
    pub fn add(&mut self, timestamp: NaiveDateTime, path: PathBuf) {
        let at = self
            .entries
            .partition_point(|entry| entry.timestamp > timestamp);
        self.entries.insert(at, RetentionEntry { timestamp, path });
    }

    pub fn latest(&self) -> Option<&RetentionEntry> {
        self.entries.first()
    }

    pub fn entries(&self) -> &[RetentionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops the entry at `at` and deletes its backing file. A file that is
    /// already gone is not an error; any other I/O failure propagates.
    pub(crate) fn remove_at(&mut self, at: usize) -> Result<RetentionEntry, StorageError> {
        let entry = self.entries.remove(at);
        match fs::remove_file(&entry.path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamp(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn file_names_use_the_stamp_convention() {
        let ts = stamp("2026-08-07 09:05:03");
        assert_eq!(file_name(FileKind::Arrangement, ts), "arrangement_20260807-090503.json");
        assert_eq!(file_name(FileKind::Backup, ts), "backup_20260807-090503.json");
    }

    #[test]
    fn parse_rejects_foreign_names() {
        assert!(parse_file_name(FileKind::Backup, "backup_20260807-090503.json").is_some());
        assert!(parse_file_name(FileKind::Backup, "arrangement_20260807-090503.json").is_none());
        assert!(parse_file_name(FileKind::Backup, "backup_garbage.json").is_none());
        assert!(parse_file_name(FileKind::Backup, "backup_20260807-090503.txt").is_none());
        assert!(parse_file_name(FileKind::Backup, "notes.txt").is_none());
    }

    #[test]
    fn add_keeps_newest_first_order() {
        let mut index = RetentionIndex::new();
        index.add(stamp("2026-08-07 10:00:00"), PathBuf::from("b"));
        index.add(stamp("2026-08-07 12:00:00"), PathBuf::from("c"));
        index.add(stamp("2026-08-07 08:00:00"), PathBuf::from("a"));

        let order: Vec<_> =
            index.entries().iter().map(|e| e.path.to_str().unwrap()).collect();
        assert_eq!(order, ["c", "b", "a"]);
        assert_eq!(index.latest().unwrap().path, PathBuf::from("c"));
    }

    #[test]
    fn scan_collects_matching_files_and_ignores_the_rest() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        for name in [
            "backup_20260807-080000.json",
            "backup_20260807-100000.json",
            "arrangement_20260807-090000.json",
            "backup_garbage.json",
            "notes.txt",
        ] {
            fs::write(temp.path().join(name), b"{}").unwrap();
        }

        let backups = RetentionIndex::scan(temp.path(), FileKind::Backup).unwrap();
        assert_eq!(backups.len(), 2);
        assert_eq!(
            backups.latest().unwrap().timestamp,
            stamp("2026-08-07 10:00:00")
        );

        let saves = RetentionIndex::scan(temp.path(), FileKind::Arrangement).unwrap();
        assert_eq!(saves.len(), 1);
    }

    #[test]
    fn scan_of_missing_directory_is_empty() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let missing = temp.path().join("nope");

        let index = RetentionIndex::scan(&missing, FileKind::Backup).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn remove_at_deletes_the_backing_file() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("backup_20260807-080000.json");
        fs::write(&path, b"{}").unwrap();

        let mut index = RetentionIndex::new();
        index.add(stamp("2026-08-07 08:00:00"), path.clone());

        index.remove_at(0).unwrap();
        assert!(index.is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn remove_at_tolerates_an_already_missing_file() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let mut index = RetentionIndex::new();
        index.add(stamp("2026-08-07 08:00:00"), temp.path().join("gone.json"));

        assert!(index.remove_at(0).is_ok());
    }
}
