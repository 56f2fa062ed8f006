//! Refresh an installed engine tree from the framework's copy.
//!
//! A live update always runs in this order:
//!
//! 1. snapshot the installed engine ([`BackupManager::create_backup`]);
//! 2. copy every new or changed framework file over it;
//! 3. if a copy fails, restore the snapshot;
//! 4. on success, prune old backups down to the retention count.
//!
//! No file is written before step 1 has succeeded. Copies are not
//! transactional: the snapshot is the only recovery path if the process dies
//! between steps 2 and 3.

use crate::backup::{Backup, BackupManager, CleanupReport, DEFAULT_KEEP_BACKUPS};
use crate::error::{Result, SpecpilotError};
use crate::io;
use crate::lock::InstallLock;
use crate::paths::Layout;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// How many planned files a summary names before it starts counting.
pub const PREVIEW_LIMIT: usize = 5;

// ---------------------------------------------------------------------------
// Copier
// ---------------------------------------------------------------------------

/// Writes one file of an update.
pub trait Copier {
    fn copy(&mut self, from: &Path, to: &Path) -> std::io::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FsCopier;

impl Copier for FsCopier {
    fn copy(&mut self, from: &Path, to: &Path) -> std::io::Result<()> {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(from, to)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    New,
    Changed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::New => f.write_str("new"),
            ChangeKind::Changed => f.write_str("changed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedFile {
    /// Relative to both engine roots.
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Framework files that differ from the installed engine, in copy order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdatePlan {
    pub files: Vec<PlannedFile>,
    pub unchanged: usize,
}

impl UpdatePlan {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn count(&self, kind: ChangeKind) -> usize {
        self.files.iter().filter(|f| f.kind == kind).count()
    }

    /// The first `limit` files and how many were left out.
    pub fn preview(&self, limit: usize) -> (&[PlannedFile], usize) {
        let shown = self.files.len().min(limit);
        (&self.files[..shown], self.files.len() - shown)
    }
}

// ---------------------------------------------------------------------------
// State / outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateState {
    Idle,
    BackupCreated,
    FilesCopied,
    RolledBack,
    RollbackFailed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// Nothing was written.
    DryRun { plan: UpdatePlan },
    /// The installed engine already matches the framework; nothing was written.
    UpToDate { plan: UpdatePlan },
    Updated {
        backup: Backup,
        plan: UpdatePlan,
        copied: usize,
        cleanup: CleanupReport,
    },
    /// A copy failed and the engine was restored from `backup`.
    RolledBack {
        backup: Backup,
        copied: usize,
        error: String,
    },
    /// A copy failed and so did the restore; the engine is in an unknown state.
    RollbackFailed {
        backup: Backup,
        copy_error: String,
        restore_error: String,
    },
}

impl UpdateOutcome {
    pub fn state(&self) -> UpdateState {
        match self {
            UpdateOutcome::DryRun { .. } | UpdateOutcome::UpToDate { .. } => UpdateState::Idle,
            UpdateOutcome::Updated { .. } => UpdateState::FilesCopied,
            UpdateOutcome::RolledBack { .. } => UpdateState::RolledBack,
            UpdateOutcome::RollbackFailed { .. } => UpdateState::RollbackFailed,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(
            self,
            UpdateOutcome::RolledBack { .. } | UpdateOutcome::RollbackFailed { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct UpdateOptions {
    pub dry_run: bool,
    pub keep_backups: usize,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            keep_backups: DEFAULT_KEEP_BACKUPS,
        }
    }
}

pub struct UpdateOrchestrator<'a, C: Copier = FsCopier> {
    layout: &'a Layout,
    options: UpdateOptions,
    copier: C,
    state: UpdateState,
}

impl<'a> UpdateOrchestrator<'a, FsCopier> {
    pub fn new(layout: &'a Layout, options: UpdateOptions) -> Self {
        Self::with_copier(layout, options, FsCopier)
    }
}

impl<'a, C: Copier> UpdateOrchestrator<'a, C> {
    pub fn with_copier(layout: &'a Layout, options: UpdateOptions, copier: C) -> Self {
        Self {
            layout,
            options,
            copier,
            state: UpdateState::Idle,
        }
    }

    pub fn state(&self) -> UpdateState {
        self.state
    }

    /// Compare the framework engine with the installed one. Read-only.
    pub fn plan(&self) -> Result<UpdatePlan> {
        self.check_preconditions()?;
        let source = self.layout.source_engine_dir();
        let engine = self.layout.engine_dir();

        let mut plan = UpdatePlan::default();
        for rel in io::list_files(&source)? {
            let dest = engine.join(&rel);
            let kind = if !dest.exists() {
                ChangeKind::New
            } else if io::same_contents(&source.join(&rel), &dest)? {
                plan.unchanged += 1;
                continue;
            } else {
                ChangeKind::Changed
            };
            plan.files.push(PlannedFile { path: rel, kind });
        }
        tracing::debug!(
            planned = plan.len(),
            unchanged = plan.unchanged,
            "update plan computed"
        );
        Ok(plan)
    }

    pub fn run(self) -> Result<UpdateOutcome> {
        let plan = self.plan()?;
        self.apply(plan)
    }

    /// Carry out `plan`. Errors are returned only when nothing was changed
    /// (precondition, lock or backup failures); failures after the backup
    /// exists are reported through the outcome.
    pub fn apply(mut self, plan: UpdatePlan) -> Result<UpdateOutcome> {
        self.check_preconditions()?;
        if self.options.dry_run {
            return Ok(UpdateOutcome::DryRun { plan });
        }
        if plan.is_empty() {
            tracing::info!("engine already up to date");
            return Ok(UpdateOutcome::UpToDate { plan });
        }

        let _lock = InstallLock::acquire(self.layout)?;
        let manager = BackupManager::new(self.layout);

        let backup = manager.create_backup()?;
        self.transition(UpdateState::BackupCreated);

        let source = self.layout.source_engine_dir();
        let engine = self.layout.engine_dir();
        let mut copied = 0;
        for file in &plan.files {
            let from = source.join(&file.path);
            let to = engine.join(&file.path);
            if let Err(e) = self.copier.copy(&from, &to) {
                let copy_error = format!("{}: {e}", file.path.display());
                tracing::error!(file = %file.path.display(), "copy failed, rolling back: {e}");
                return Ok(self.roll_back(&manager, backup, copied, copy_error));
            }
            tracing::debug!(file = %file.path.display(), kind = %file.kind, "copied");
            copied += 1;
        }
        self.transition(UpdateState::FilesCopied);

        let cleanup = manager.cleanup(self.options.keep_backups)?;
        Ok(UpdateOutcome::Updated {
            backup,
            plan,
            copied,
            cleanup,
        })
    }

    fn roll_back(
        &mut self,
        manager: &BackupManager<'_>,
        backup: Backup,
        copied: usize,
        copy_error: String,
    ) -> UpdateOutcome {
        match manager.restore(&backup) {
            Ok(_) => {
                self.transition(UpdateState::RolledBack);
                UpdateOutcome::RolledBack {
                    backup,
                    copied,
                    error: copy_error,
                }
            }
            Err(e) => {
                self.transition(UpdateState::RollbackFailed);
                tracing::error!(backup = %backup.name, "rollback failed: {e}");
                UpdateOutcome::RollbackFailed {
                    backup,
                    copy_error,
                    restore_error: e.to_string(),
                }
            }
        }
    }

    fn check_preconditions(&self) -> Result<()> {
        if !self.layout.is_installed() {
            return Err(SpecpilotError::NotInstalled(self.layout.engine_dir()));
        }
        let source = self.layout.source_engine_dir();
        if !source.is_dir() {
            return Err(SpecpilotError::FrameworkEngineMissing(source));
        }
        Ok(())
    }

    fn transition(&mut self, next: UpdateState) {
        tracing::debug!(from = ?self.state, to = ?next, "update state");
        self.state = next;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        _project: TempDir,
        _framework: TempDir,
        layout: Layout,
    }

    /// Installed engine with `core.md`, `modes.md`, `keep.md`; framework
    /// changes two of them and adds `rules/new.md`.
    fn fixture() -> Fixture {
        let project = TempDir::new().unwrap();
        let framework = TempDir::new().unwrap();
        let layout = Layout::new(project.path(), framework.path());

        let engine = layout.engine_dir();
        io::atomic_write(&engine.join("core.md"), b"core v1").unwrap();
        io::atomic_write(&engine.join("modes.md"), b"modes v1").unwrap();
        io::atomic_write(&engine.join("keep.md"), b"same").unwrap();

        let source = layout.source_engine_dir();
        io::atomic_write(&source.join("core.md"), b"core v2").unwrap();
        io::atomic_write(&source.join("modes.md"), b"modes v2").unwrap();
        io::atomic_write(&source.join("keep.md"), b"same").unwrap();
        io::atomic_write(&source.join("rules/new.md"), b"brand new").unwrap();

        Fixture {
            _project: project,
            _framework: framework,
            layout,
        }
    }

    /// Copies normally until `fail_at` files have been written, then errors.
    struct FailingCopier {
        fail_at: usize,
        done: usize,
    }

    impl Copier for FailingCopier {
        fn copy(&mut self, from: &Path, to: &Path) -> std::io::Result<()> {
            if self.done == self.fail_at {
                return Err(std::io::Error::other("disk full"));
            }
            self.done += 1;
            FsCopier.copy(from, to)
        }
    }

    /// Deletes every backup, then fails, so the restore has nothing to use.
    struct BackupWipingCopier {
        backups: PathBuf,
    }

    impl Copier for BackupWipingCopier {
        fn copy(&mut self, _from: &Path, _to: &Path) -> std::io::Result<()> {
            std::fs::remove_dir_all(&self.backups)?;
            Err(std::io::Error::other("disk full"))
        }
    }

    fn live() -> UpdateOptions {
        UpdateOptions::default()
    }

    #[test]
    fn plan_reports_new_and_changed_only() {
        let fx = fixture();
        let plan = UpdateOrchestrator::new(&fx.layout, live()).plan().unwrap();

        assert_eq!(plan.len(), 3);
        assert_eq!(plan.unchanged, 1);
        assert_eq!(plan.count(ChangeKind::Changed), 2);
        assert_eq!(plan.count(ChangeKind::New), 1);
        let new = plan.files.iter().find(|f| f.kind == ChangeKind::New).unwrap();
        assert_eq!(new.path, PathBuf::from("rules/new.md"));
    }

    #[test]
    fn preview_truncates() {
        let plan = UpdatePlan {
            files: (0..8)
                .map(|i| PlannedFile {
                    path: PathBuf::from(format!("f{i}.md")),
                    kind: ChangeKind::New,
                })
                .collect(),
            unchanged: 0,
        };
        let (shown, rest) = plan.preview(PREVIEW_LIMIT);
        assert_eq!(shown.len(), 5);
        assert_eq!(rest, 3);
    }

    #[test]
    fn dry_run_writes_nothing() {
        let fx = fixture();
        let project_before = io::snapshot(fx.layout.project_root());

        let outcome = UpdateOrchestrator::new(
            &fx.layout,
            UpdateOptions {
                dry_run: true,
                ..live()
            },
        )
        .run()
        .unwrap();

        match outcome {
            UpdateOutcome::DryRun { plan } => assert_eq!(plan.len(), 3),
            other => panic!("expected dry run, got {other:?}"),
        }
        assert_eq!(io::snapshot(fx.layout.project_root()), project_before);
        assert!(!fx.layout.backups_dir().exists());
    }

    #[test]
    fn successful_update_matches_source() {
        let fx = fixture();
        let outcome = UpdateOrchestrator::new(&fx.layout, live()).run().unwrap();

        let UpdateOutcome::Updated { backup, copied, .. } = outcome else {
            panic!("expected update");
        };
        assert_eq!(copied, 3);
        for rel in io::list_files(&fx.layout.source_engine_dir()).unwrap() {
            assert_eq!(
                std::fs::read(fx.layout.source_engine_dir().join(&rel)).unwrap(),
                std::fs::read(fx.layout.engine_dir().join(&rel)).unwrap(),
                "{}",
                rel.display()
            );
        }
        assert_eq!(
            std::fs::read(backup.path.join("core.md")).unwrap(),
            b"core v1"
        );
        assert!(!fx.layout.lock_path().exists());
    }

    #[test]
    fn copy_failure_rolls_back() {
        let fx = fixture();
        let before = io::snapshot(&fx.layout.engine_dir());
        let orchestrator = UpdateOrchestrator::with_copier(
            &fx.layout,
            live(),
            FailingCopier {
                fail_at: 2,
                done: 0,
            },
        );
        assert_eq!(orchestrator.state(), UpdateState::Idle);

        let outcome = orchestrator.run().unwrap();

        assert_eq!(outcome.state(), UpdateState::RolledBack);
        assert!(!outcome.is_success());
        let UpdateOutcome::RolledBack { copied, error, .. } = outcome else {
            unreachable!();
        };
        assert_eq!(copied, 2);
        assert!(error.contains("disk full"));
        assert_eq!(io::snapshot(&fx.layout.engine_dir()), before);
    }

    #[test]
    fn unrecoverable_copy_failure_reports_rollback_failed() {
        let fx = fixture();
        let outcome = UpdateOrchestrator::with_copier(
            &fx.layout,
            live(),
            BackupWipingCopier {
                backups: fx.layout.backups_dir(),
            },
        )
        .run()
        .unwrap();

        assert_eq!(outcome.state(), UpdateState::RollbackFailed);
        assert!(!outcome.is_success());
        let UpdateOutcome::RollbackFailed {
            backup,
            copy_error,
            restore_error,
        } = outcome
        else {
            unreachable!();
        };
        assert!(copy_error.contains("disk full"));
        assert!(restore_error.contains("backup directory not found"));
        assert!(backup.path.starts_with(fx.layout.backups_dir()));
        assert!(!fx.layout.lock_path().exists());
    }

    #[test]
    fn backup_io_failure_aborts_before_copying() {
        let fx = fixture();
        let before = io::snapshot(&fx.layout.engine_dir());
        std::fs::write(fx.layout.backups_dir(), b"not a directory").unwrap();

        let err = UpdateOrchestrator::new(&fx.layout, live()).run().unwrap_err();

        assert!(matches!(err, SpecpilotError::Io(_)));
        assert_eq!(io::snapshot(&fx.layout.engine_dir()), before);
        assert!(fx.layout.backups_dir().is_file());
        assert!(!fx.layout.lock_path().exists());
    }

    #[test]
    fn failed_update_keeps_all_backups() {
        let fx = fixture();
        let manager = BackupManager::new(&fx.layout);
        for _ in 0..4 {
            manager.create_backup().unwrap();
        }
        let existing = manager.list_backups().unwrap().len();

        UpdateOrchestrator::with_copier(
            &fx.layout,
            UpdateOptions {
                dry_run: false,
                keep_backups: 1,
            },
            FailingCopier {
                fail_at: 0,
                done: 0,
            },
        )
        .run()
        .unwrap();

        assert_eq!(manager.list_backups().unwrap().len(), existing + 1);
    }

    #[test]
    fn success_enforces_retention() {
        let fx = fixture();
        let manager = BackupManager::new(&fx.layout);
        let base = chrono::Utc::now() - chrono::Duration::hours(1);
        for i in 0..4 {
            manager
                .create_backup_at(base + chrono::Duration::seconds(i))
                .unwrap();
        }

        let outcome = UpdateOrchestrator::new(
            &fx.layout,
            UpdateOptions {
                dry_run: false,
                keep_backups: 2,
            },
        )
        .run()
        .unwrap();

        let UpdateOutcome::Updated { backup, cleanup, .. } = outcome else {
            panic!("expected update");
        };
        assert_eq!(cleanup.removed.len(), 3);
        let remaining = manager.list_backups().unwrap();
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[0].name, backup.name);
    }

    #[test]
    fn up_to_date_writes_nothing() {
        let fx = fixture();
        UpdateOrchestrator::new(&fx.layout, live()).run().unwrap();
        let backups = BackupManager::new(&fx.layout).list_backups().unwrap().len();

        let outcome = UpdateOrchestrator::new(&fx.layout, live()).run().unwrap();
        assert!(matches!(outcome, UpdateOutcome::UpToDate { .. }));
        assert_eq!(
            BackupManager::new(&fx.layout).list_backups().unwrap().len(),
            backups
        );
    }

    #[test]
    fn requires_installation() {
        let fx = fixture();
        std::fs::remove_dir_all(fx.layout.engine_dir()).unwrap();
        let err = UpdateOrchestrator::new(&fx.layout, live()).run().unwrap_err();
        assert!(matches!(err, SpecpilotError::NotInstalled(_)));
        assert!(!fx.layout.backups_dir().exists());
    }

    #[test]
    fn requires_framework_engine() {
        let fx = fixture();
        std::fs::remove_dir_all(fx.layout.source_engine_dir()).unwrap();
        let err = UpdateOrchestrator::new(&fx.layout, live()).run().unwrap_err();
        assert!(matches!(err, SpecpilotError::FrameworkEngineMissing(_)));
    }

    #[test]
    fn held_lock_blocks_update_before_backup() {
        let fx = fixture();
        let _held = InstallLock::acquire(&fx.layout).unwrap();
        let err = UpdateOrchestrator::new(&fx.layout, live()).run().unwrap_err();
        assert!(matches!(err, SpecpilotError::Locked(_)));
        assert!(!fx.layout.backups_dir().exists());
    }
}
