use crate::output::print_json;
use crate::prompt::TerminalPrompter;
use anyhow::Context;
use specpilot_core::{maintenance, paths::Layout, prompt::AutoPrompter};

pub fn run(layout: &Layout, force: bool, keep_backups: usize, json: bool) -> anyhow::Result<()> {
    let report = if force {
        maintenance::cleanup_backups(layout, &mut AutoPrompter, keep_backups)
    } else {
        maintenance::cleanup_backups(layout, &mut TerminalPrompter::stdio(), keep_backups)
    }
    .context("backup cleanup failed")?;

    if json {
        return print_json(&report);
    }

    if report.is_noop() {
        println!(
            "Nothing to clean up: {} backup(s), keeping up to {keep_backups}.",
            report.kept
        );
        return Ok(());
    }
    for name in &report.removed {
        println!("  removed: {name}");
    }
    for failed in &report.failed {
        println!("  warning: could not remove {}: {}", failed.name, failed.error);
    }
    println!(
        "Removed {} backup(s); {} kept.",
        report.removed.len(),
        report.kept
    );
    Ok(())
}
