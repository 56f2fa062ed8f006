use crate::output::print_json;
use crate::prompt::TerminalPrompter;
use anyhow::Context;
use specpilot_core::{
    maintenance,
    paths::{self, Layout},
    prompt::AutoPrompter,
};

pub fn run(layout: &Layout, force: bool, json: bool) -> anyhow::Result<()> {
    let outcome = if force {
        maintenance::rollback(layout, &mut AutoPrompter)
    } else {
        maintenance::rollback(layout, &mut TerminalPrompter::stdio())
    }
    .context("rollback failed")?;

    if json {
        print_json(&outcome)?;
    } else {
        println!(
            "Restored {} from {} ({} file(s)).",
            paths::ENGINE_DIR,
            outcome.backup.name,
            outcome.files
        );
    }
    Ok(())
}
