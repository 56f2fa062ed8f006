use crate::output::{print_json, print_plan_files};
use crate::prompt::TerminalPrompter;
use anyhow::Context;
use specpilot_core::{
    paths::{self, Layout},
    prompt::Prompter,
    update::{ChangeKind, UpdateOptions, UpdateOrchestrator, UpdateOutcome, PREVIEW_LIMIT},
};

/// `specpilot update`: bring the installed engine in line with the framework.
///
/// Requires an existing installation. Every live update is preceded by a
/// backup and rolled back automatically if copying fails.
pub fn run(
    layout: &Layout,
    options: UpdateOptions,
    verbose: bool,
    force: bool,
    json: bool,
) -> anyhow::Result<()> {
    let orchestrator = UpdateOrchestrator::new(layout, options);
    let plan = orchestrator.plan().context("cannot update")?;
    let limit = if verbose { None } else { Some(PREVIEW_LIMIT) };

    if !json {
        println!("Updating SpecPilot engine in: {}", layout.project_root().display());
        println!("  source: {}", layout.source_engine_dir().display());
    }

    if !options.dry_run && !plan.is_empty() && !force {
        if !json {
            println!(
                "\n{} file(s) will be updated ({} changed, {} new):",
                plan.len(),
                plan.count(ChangeKind::Changed),
                plan.count(ChangeKind::New)
            );
            print_plan_files(&plan, limit);
        }
        let question = format!("Apply these changes to {}?", paths::ENGINE_DIR);
        if !TerminalPrompter::stdio().confirm(&question, true)? {
            anyhow::bail!("update cancelled");
        }
    }

    let outcome = orchestrator.apply(plan).context("update aborted")?;

    if json {
        print_json(&outcome)?;
    } else {
        print_outcome(&outcome, limit);
    }

    match outcome {
        UpdateOutcome::RolledBack { backup, error, .. } => Err(anyhow::anyhow!(
            "update failed ({error}); engine rolled back to {}",
            backup.name
        )),
        UpdateOutcome::RollbackFailed {
            backup,
            copy_error,
            restore_error,
        } => Err(anyhow::anyhow!(
            "update failed ({copy_error}) and rollback failed ({restore_error}); \
             {} is in an unknown state and needs manual repair from {}",
            paths::ENGINE_DIR,
            backup.path.display()
        )),
        _ => Ok(()),
    }
}

fn print_outcome(outcome: &UpdateOutcome, limit: Option<usize>) {
    match outcome {
        UpdateOutcome::DryRun { plan } => {
            if plan.is_empty() {
                println!("\nDry run: engine is already up to date.");
            } else {
                println!(
                    "\nDry run: {} file(s) would be updated ({} unchanged):",
                    plan.len(),
                    plan.unchanged
                );
                print_plan_files(plan, limit);
            }
            println!("No changes made.");
        }
        UpdateOutcome::UpToDate { plan } => {
            println!(
                "\nEngine is already up to date ({} file(s) checked).",
                plan.unchanged
            );
        }
        UpdateOutcome::Updated {
            backup,
            plan,
            copied,
            cleanup,
        } => {
            println!("\n  backup:  {}", backup.name);
            println!("  updated: {copied} file(s)");
            if limit.is_none() {
                print_plan_files(plan, None);
            }
            for name in &cleanup.removed {
                println!("  removed old backup: {name}");
            }
            for failed in &cleanup.failed {
                println!("  warning: could not remove {}: {}", failed.name, failed.error);
            }
            println!("\nSpecPilot engine updated.");
        }
        UpdateOutcome::RolledBack { backup, copied, .. } => {
            println!(
                "\nUpdate failed after {copied} file(s); restored {} from {}.",
                paths::ENGINE_DIR,
                backup.name
            );
        }
        UpdateOutcome::RollbackFailed { backup, .. } => {
            println!(
                "\nUpdate failed and the automatic rollback did not complete.\n\
                 Restore manually with: specpilot rollback (backup: {})",
                backup.name
            );
        }
    }
}
