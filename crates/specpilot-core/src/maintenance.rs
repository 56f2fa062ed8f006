//! Standalone backup commands: on-demand backup, rollback, cleanup.

use crate::backup::{Backup, BackupManager, CleanupReport};
use crate::error::{Result, SpecpilotError};
use crate::lock::InstallLock;
use crate::paths::Layout;
use crate::prompt::Prompter;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RollbackOutcome {
    pub backup: Backup,
    pub files: usize,
}

fn require_specpilot_dir(layout: &Layout) -> Result<()> {
    if !layout.specpilot_dir().is_dir() {
        return Err(SpecpilotError::NotInstalled(layout.engine_dir()));
    }
    Ok(())
}

/// Snapshot the engine right now.
pub fn backup_now(layout: &Layout) -> Result<Backup> {
    if !layout.is_installed() {
        return Err(SpecpilotError::NotInstalled(layout.engine_dir()));
    }
    let _lock = InstallLock::acquire(layout)?;
    BackupManager::new(layout).create_backup()
}

/// Restore a backup chosen through `prompter` (newest is the default).
///
/// Works without an engine tree so a failed rollback can be retried.
pub fn rollback(layout: &Layout, prompter: &mut dyn Prompter) -> Result<RollbackOutcome> {
    require_specpilot_dir(layout)?;
    let _lock = InstallLock::acquire(layout)?;
    let manager = BackupManager::new(layout);

    let mut backups = manager.list_backups()?;
    if backups.is_empty() {
        return Err(SpecpilotError::NoBackups(manager.backups_dir()));
    }

    let options: Vec<String> = backups
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let stamp = b.created_at.format("%Y-%m-%d %H:%M:%S UTC");
            if i == 0 {
                format!("{} ({stamp}, latest)", b.name)
            } else {
                format!("{} ({stamp})", b.name)
            }
        })
        .collect();
    let index = prompter.select("Select a backup to restore", &options, 0)?;
    if index >= backups.len() {
        return Err(SpecpilotError::InvalidChoice(index.to_string()));
    }
    let backup = backups.swap_remove(index);

    let question = format!(
        "Restore {}? The current .specpilot/engine will be replaced",
        backup.name
    );
    if !prompter.confirm(&question, false)? {
        return Err(SpecpilotError::Cancelled);
    }

    let files = manager.restore(&backup)?;
    Ok(RollbackOutcome { backup, files })
}

/// Enforce retention right away, asking first when anything would be removed.
pub fn cleanup_backups(
    layout: &Layout,
    prompter: &mut dyn Prompter,
    keep_count: usize,
) -> Result<CleanupReport> {
    require_specpilot_dir(layout)?;
    let _lock = InstallLock::acquire(layout)?;
    let manager = BackupManager::new(layout);

    let expired = manager.expired(keep_count)?;
    if expired.is_empty() {
        return Ok(CleanupReport {
            kept: manager.list_backups()?.len(),
            ..CleanupReport::default()
        });
    }

    let question = format!(
        "Remove {} old backup(s), keeping the {keep_count} most recent?",
        expired.len()
    );
    if !prompter.confirm(&question, false)? {
        return Err(SpecpilotError::Cancelled);
    }
    manager.cleanup(keep_count)
}
