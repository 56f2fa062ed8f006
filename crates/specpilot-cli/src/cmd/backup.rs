use crate::output::{print_json, print_table};
use anyhow::Context;
use specpilot_core::{backup::BackupManager, maintenance, paths::Layout};

pub fn create(layout: &Layout, json: bool) -> anyhow::Result<()> {
    let backup = maintenance::backup_now(layout).context("backup failed")?;
    if json {
        print_json(&backup)?;
    } else {
        println!("Created backup {}", backup.name);
        println!("  path: {}", backup.path.display());
    }
    Ok(())
}

pub fn list(layout: &Layout, json: bool) -> anyhow::Result<()> {
    let manager = BackupManager::new(layout);
    let backups = manager.list_backups().context("failed to list backups")?;

    if json {
        return print_json(&backups);
    }
    if backups.is_empty() {
        println!("No backups in {}", manager.backups_dir().display());
        return Ok(());
    }

    let rows = backups
        .iter()
        .map(|b| {
            vec![
                b.name.clone(),
                b.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                b.path.display().to_string(),
            ]
        })
        .collect();
    print_table(&["NAME", "CREATED (UTC)", "PATH"], rows);
    Ok(())
}
