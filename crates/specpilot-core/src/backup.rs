//! Timestamped snapshots of the engine tree.
//!
//! Every backup is a plain directory under `.specpilot/backups/` holding a
//! full copy of `.specpilot/engine/`. The directory name carries the
//! creation time (`backup_YYYYMMDD_HHMMSS`, UTC), with a `-N` suffix when
//! several backups land in the same second. Ordering, listing and retention
//! all work from the name, so anything in the backups directory that does
//! not match the pattern is ignored.

use crate::error::{Result, SpecpilotError};
use crate::io;
use crate::paths::Layout;
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const DEFAULT_KEEP_BACKUPS: usize = 3;

const NAME_PREFIX: &str = "backup_";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const MAX_SAME_SECOND: u32 = 100;

static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn name_re() -> &'static Regex {
    NAME_RE.get_or_init(|| {
        Regex::new(r"^backup_(\d{8}_\d{6})(?:-(\d{1,3}))?$").expect("backup name pattern is valid")
    })
}

// ---------------------------------------------------------------------------
// Backup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Backup {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub path: PathBuf,
    #[serde(skip)]
    seq: u32,
}

impl Backup {
    /// Recognise a backup directory by name. `None` for anything else.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let caps = name_re().captures(name)?;
        let created_at = NaiveDateTime::parse_from_str(&caps[1], TIMESTAMP_FORMAT)
            .ok()?
            .and_utc();
        let seq = match caps.get(2) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        Some(Self {
            name: name.to_string(),
            created_at,
            path: path.to_path_buf(),
            seq,
        })
    }

    pub fn name_for(at: DateTime<Utc>, seq: u32) -> String {
        let stamp = at.format(TIMESTAMP_FORMAT);
        if seq == 0 {
            format!("{NAME_PREFIX}{stamp}")
        } else {
            format!("{NAME_PREFIX}{stamp}-{seq}")
        }
    }

    /// Oldest first.
    fn chronological(&self, other: &Self) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then(self.seq.cmp(&other.seq))
    }
}

// ---------------------------------------------------------------------------
// CleanupReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    pub removed: Vec<String>,
    pub failed: Vec<FailedRemoval>,
    pub kept: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedRemoval {
    pub name: String,
    pub error: String,
}

impl CleanupReport {
    pub fn is_noop(&self) -> bool {
        self.removed.is_empty() && self.failed.is_empty()
    }
}

// ---------------------------------------------------------------------------
// BackupManager
// ---------------------------------------------------------------------------

pub struct BackupManager<'a> {
    layout: &'a Layout,
}

impl<'a> BackupManager<'a> {
    pub fn new(layout: &'a Layout) -> Self {
        Self { layout }
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.layout.backups_dir()
    }

    /// Snapshot the current engine tree.
    ///
    /// Fails with [`SpecpilotError::NoEngine`] when nothing is installed. A
    /// copy that fails halfway removes its partial directory before the
    /// error is returned.
    pub fn create_backup(&self) -> Result<Backup> {
        self.create_backup_at(Utc::now())
    }

    pub fn create_backup_at(&self, now: DateTime<Utc>) -> Result<Backup> {
        let engine = self.layout.engine_dir();
        if !engine.is_dir() {
            return Err(SpecpilotError::NoEngine(engine));
        }

        let (name, dir) = self.allocate_dir(now)?;
        match io::copy_tree(&engine, &dir) {
            Ok(files) => {
                tracing::info!(backup = %name, files, "backup created");
            }
            Err(e) => {
                tracing::error!(backup = %name, "backup failed: {e}");
                if let Err(rm) = std::fs::remove_dir_all(&dir) {
                    tracing::warn!(path = %dir.display(), "could not remove partial backup: {rm}");
                }
                return Err(e);
            }
        }

        Backup::from_path(&dir).ok_or(SpecpilotError::BackupNotFound(name))
    }

    /// Uses `create_dir` rather than `create_dir_all` so an existing
    /// directory is never reused.
    fn allocate_dir(&self, now: DateTime<Utc>) -> Result<(String, PathBuf)> {
        let root = self.backups_dir();
        io::ensure_dir(&root)?;
        for seq in 0..MAX_SAME_SECOND {
            let name = Backup::name_for(now, seq);
            let dir = root.join(&name);
            match std::fs::create_dir(&dir) {
                Ok(()) => return Ok((name, dir)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(SpecpilotError::BackupNameExhausted(Backup::name_for(now, 0)))
    }

    /// All valid backups, newest first. A missing backups directory is empty.
    pub fn list_backups(&self) -> Result<Vec<Backup>> {
        let root = self.backups_dir();
        if !root.is_dir() {
            return Ok(Vec::new());
        }
        let mut backups = Vec::new();
        for entry in std::fs::read_dir(&root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            match Backup::from_path(&entry.path()) {
                Some(b) => backups.push(b),
                None => tracing::debug!(path = %entry.path().display(), "ignoring non-backup entry"),
            }
        }
        backups.sort_by(|a, b| b.chronological(a));
        Ok(backups)
    }

    pub fn latest(&self) -> Result<Option<Backup>> {
        Ok(self.list_backups()?.into_iter().next())
    }

    pub fn find(&self, name: &str) -> Result<Backup> {
        self.list_backups()?
            .into_iter()
            .find(|b| b.name == name)
            .ok_or_else(|| SpecpilotError::BackupNotFound(name.to_string()))
    }

    /// Backups that `cleanup(keep_count)` would delete, oldest first.
    pub fn expired(&self, keep_count: usize) -> Result<Vec<Backup>> {
        let mut backups = self.list_backups()?;
        backups.reverse();
        let excess = backups.len().saturating_sub(keep_count);
        backups.truncate(excess);
        Ok(backups)
    }

    /// Delete all but the `keep_count` most recent backups.
    ///
    /// A backup that cannot be removed is logged and reported in
    /// [`CleanupReport::failed`]; the rest of the cleanup carries on.
    pub fn cleanup(&self, keep_count: usize) -> Result<CleanupReport> {
        let expired = self.expired(keep_count)?;
        let kept = self.list_backups()?.len() - expired.len();
        Ok(self.remove_all(expired, kept))
    }

    fn remove_all(&self, expired: Vec<Backup>, kept: usize) -> CleanupReport {
        let mut report = CleanupReport {
            kept,
            ..CleanupReport::default()
        };
        for backup in expired {
            match std::fs::remove_dir_all(&backup.path) {
                Ok(()) => {
                    tracing::info!(backup = %backup.name, "removed old backup");
                    report.removed.push(backup.name);
                }
                Err(e) => {
                    tracing::warn!(backup = %backup.name, "failed to remove old backup: {e}");
                    report.failed.push(FailedRemoval {
                        name: backup.name,
                        error: e.to_string(),
                    });
                }
            }
        }
        report
    }

    /// Replace the engine tree with the contents of `backup`.
    ///
    /// Checks the backup exists before touching the engine. After that the
    /// engine is removed and re-copied; an interruption in between leaves it
    /// missing or partial. Returns the number of files restored.
    pub fn restore(&self, backup: &Backup) -> Result<usize> {
        if !backup.path.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("backup directory not found: {}", backup.path.display()),
            )
            .into());
        }
        let engine = self.layout.engine_dir();
        if engine.exists() {
            std::fs::remove_dir_all(&engine)?;
        }
        let files = io::copy_tree(&backup.path, &engine)?;
        tracing::info!(backup = %backup.name, files, "engine restored");
        Ok(files)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn installed() -> (TempDir, Layout) {
        let dir = TempDir::new().unwrap();
        let layout = Layout::new(dir.path(), dir.path());
        io::atomic_write(&layout.engine_dir().join("rules/core.md"), b"core v1").unwrap();
        io::atomic_write(&layout.engine_dir().join("modes.md"), b"modes v1").unwrap();
        (dir, layout)
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(secs)
    }

    #[test]
    fn name_roundtrip() {
        let name = Backup::name_for(at(5), 0);
        assert_eq!(name, "backup_20250301_120005");
        let b = Backup::from_path(Path::new(&name)).unwrap();
        assert_eq!(b.created_at, at(5));
        assert_eq!(Backup::name_for(at(5), 2), "backup_20250301_120005-2");
    }

    #[test]
    fn rejects_foreign_names() {
        for name in [
            "backup_2025",
            "backup_20250301_120005-x",
            "backup_20251301_120005",
            "snapshot_20250301_120005",
            "backup_20250301_120005.tar",
        ] {
            assert!(Backup::from_path(Path::new(name)).is_none(), "{name}");
        }
    }

    #[test]
    fn create_backup_copies_engine() {
        let (_dir, layout) = installed();
        let mgr = BackupManager::new(&layout);
        let backup = mgr.create_backup_at(at(0)).unwrap();

        assert_eq!(backup.name, "backup_20250301_120000");
        assert_eq!(
            io::snapshot(&backup.path),
            io::snapshot(&layout.engine_dir())
        );
    }

    #[test]
    fn create_backup_without_engine_fails() {
        let dir = TempDir::new().unwrap();
        let layout = Layout::new(dir.path(), dir.path());
        let err = BackupManager::new(&layout).create_backup().unwrap_err();
        assert!(matches!(err, SpecpilotError::NoEngine(_)));
        assert!(!layout.backups_dir().exists());
    }

    #[test]
    fn same_second_backups_get_suffixes() {
        let (_dir, layout) = installed();
        let mgr = BackupManager::new(&layout);
        let first = mgr.create_backup_at(at(0)).unwrap();
        let second = mgr.create_backup_at(at(0)).unwrap();
        assert_eq!(second.name, format!("{}-1", first.name));

        let listed = mgr.list_backups().unwrap();
        assert_eq!(listed[0].name, second.name);
        assert_eq!(listed[1].name, first.name);
    }

    #[test]
    fn list_is_newest_first_and_skips_strays() {
        let (_dir, layout) = installed();
        let mgr = BackupManager::new(&layout);
        for secs in [30, 10, 20] {
            mgr.create_backup_at(at(secs)).unwrap();
        }
        std::fs::create_dir_all(layout.backups_dir().join("manual-copy")).unwrap();
        std::fs::write(layout.backups_dir().join("backup_20250301_120099"), b"").unwrap();

        let names: Vec<_> = mgr
            .list_backups()
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "backup_20250301_120030",
                "backup_20250301_120020",
                "backup_20250301_120010",
            ]
        );
    }

    #[test]
    fn list_without_backups_dir_is_empty() {
        let (_dir, layout) = installed();
        assert!(BackupManager::new(&layout).list_backups().unwrap().is_empty());
    }

    #[test]
    fn cleanup_keeps_three_newest_of_five() {
        let (_dir, layout) = installed();
        let mgr = BackupManager::new(&layout);
        for secs in 0..5 {
            mgr.create_backup_at(at(secs * 60)).unwrap();
        }

        let report = mgr.cleanup(3).unwrap();

        assert_eq!(
            report.removed,
            vec!["backup_20250301_120000", "backup_20250301_120100"]
        );
        assert_eq!(report.kept, 3);
        let remaining: Vec<_> = mgr
            .list_backups()
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(
            remaining,
            vec![
                "backup_20250301_120400",
                "backup_20250301_120300",
                "backup_20250301_120200",
            ]
        );
    }

    #[test]
    fn cleanup_with_room_to_spare_is_noop() {
        let (_dir, layout) = installed();
        let mgr = BackupManager::new(&layout);
        mgr.create_backup_at(at(0)).unwrap();
        let report = mgr.cleanup(3).unwrap();
        assert!(report.is_noop());
        assert_eq!(report.kept, 1);
    }

    #[test]
    fn restore_replaces_engine_exactly() {
        let (_dir, layout) = installed();
        let mgr = BackupManager::new(&layout);
        let before = io::snapshot(&layout.engine_dir());
        let backup = mgr.create_backup_at(at(0)).unwrap();

        io::atomic_write(&layout.engine_dir().join("rules/core.md"), b"core v2").unwrap();
        io::atomic_write(&layout.engine_dir().join("extra.md"), b"new").unwrap();

        mgr.restore(&backup).unwrap();
        assert_eq!(io::snapshot(&layout.engine_dir()), before);
    }

    #[test]
    fn restore_is_idempotent() {
        let (_dir, layout) = installed();
        let mgr = BackupManager::new(&layout);
        let backup = mgr.create_backup_at(at(0)).unwrap();
        io::atomic_write(&layout.engine_dir().join("modes.md"), b"changed").unwrap();

        mgr.restore(&backup).unwrap();
        let first = io::snapshot(&layout.engine_dir());
        mgr.restore(&backup).unwrap();
        assert_eq!(io::snapshot(&layout.engine_dir()), first);
    }

    #[test]
    fn restore_missing_backup_leaves_engine_alone() {
        let (_dir, layout) = installed();
        let mgr = BackupManager::new(&layout);
        let backup = mgr.create_backup_at(at(0)).unwrap();
        std::fs::remove_dir_all(&backup.path).unwrap();
        let before = io::snapshot(&layout.engine_dir());

        let err = mgr.restore(&backup).unwrap_err();
        assert!(matches!(err, SpecpilotError::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
        assert_eq!(io::snapshot(&layout.engine_dir()), before);
    }

    #[cfg(unix)]
    #[test]
    fn failed_backup_removes_partial_dir() {
        let (_dir, layout) = installed();
        std::os::unix::fs::symlink(
            layout.project_root().join("nowhere"),
            layout.engine_dir().join("zz-dangling"),
        )
        .unwrap();
        let mgr = BackupManager::new(&layout);

        assert!(mgr.create_backup_at(at(0)).is_err());

        assert!(layout.backups_dir().is_dir());
        assert_eq!(std::fs::read_dir(layout.backups_dir()).unwrap().count(), 0);
    }

    #[test]
    fn failed_removal_is_reported_and_cleanup_continues() {
        let (_dir, layout) = installed();
        let mgr = BackupManager::new(&layout);
        let real = mgr.create_backup_at(at(60)).unwrap();
        let vanished = Backup::from_path(&layout.backups_dir().join(Backup::name_for(at(0), 0)))
            .unwrap();

        let report = mgr.remove_all(vec![vanished, real], 0);

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].name, "backup_20250301_120000");
        assert_eq!(report.removed, vec!["backup_20250301_120100"]);
        assert!(!report.is_noop());
        assert!(mgr.list_backups().unwrap().is_empty());
    }

    #[test]
    fn find_unknown_backup() {
        let (_dir, layout) = installed();
        let err = BackupManager::new(&layout).find("backup_nope").unwrap_err();
        assert!(matches!(err, SpecpilotError::BackupNotFound(_)));
    }

    mod retention {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(24))]

            /// cleanup leaves min(keep, n) backups, and they are the newest ones
            #[test]
            fn cleanup_keeps_most_recent(
                offsets in proptest::collection::btree_set(0i64..10_000, 0..8),
                keep in 0usize..10,
            ) {
                let (_dir, layout) = installed();
                let mgr = BackupManager::new(&layout);
                for secs in &offsets {
                    mgr.create_backup_at(at(*secs)).unwrap();
                }

                mgr.cleanup(keep).unwrap();

                let remaining: Vec<_> = mgr
                    .list_backups()
                    .unwrap()
                    .into_iter()
                    .map(|b| b.created_at)
                    .collect();
                let expected: Vec<_> = offsets
                    .iter()
                    .rev()
                    .take(keep)
                    .map(|secs| at(*secs))
                    .collect();
                prop_assert_eq!(remaining.len(), keep.min(offsets.len()));
                prop_assert_eq!(remaining, expected);
            }
        }
    }
}
