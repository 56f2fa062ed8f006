use crate::prompt::TerminalPrompter;
use anyhow::Context;
use specpilot_core::{
    paths::Layout,
    prompt::Prompter,
    scaffold::{self, InitAnswers, WriteStatus},
};

pub fn run(layout: &Layout, fast: bool, title: Option<&str>) -> anyhow::Result<()> {
    let title = match (fast, title) {
        (true, None) => anyhow::bail!("--title is required for fast mode"),
        (_, t) => t,
    };
    let mut prompter = TerminalPrompter::stdio();

    println!("Initializing SpecPilot in: {}", layout.project_root().display());

    scaffold::validate_environment(layout, &mut prompter)
        .context("environment check failed")?;

    let answers = match title.filter(|_| fast) {
        Some(title) => {
            let answers = InitAnswers::fast(title, &scaffold::git_user());
            println!("\nFast mode, using defaults:");
            print_plan(&answers);
            answers
        }
        None => {
            let answers = InitAnswers::ask(layout, &mut prompter, &scaffold::git_user())?;
            println!("\nInstallation plan:");
            print_plan(&answers);
            if !prompter.confirm("\nProceed with installation?", true)? {
                anyhow::bail!("installation cancelled");
            }
            answers
        }
    };

    println!("\nInstalling:");
    let written = scaffold::install(layout, &answers).context("installation failed")?;
    for w in &written {
        match w.status {
            WriteStatus::Created => println!("  created: {}", w.path),
            WriteStatus::Updated => println!("  updated: {}", w.path),
            WriteStatus::Exists => println!("  exists:  {}", w.path),
        }
    }

    println!("\nSpecPilot installation complete.");
    println!("Next:");
    println!("  1. Open the project in your AI-enabled editor");
    println!("  2. Create a mode with the SpecPilot instructions");
    println!("  3. Say 'Enter Pilot Mode' to begin guided development");
    println!(
        "\nYour workspace is ready at: {}/",
        Layout::relative_workspace(&answers.username)
    );

    Ok(())
}

fn print_plan(answers: &InitAnswers) {
    println!("  Project:             {}", answers.project_title);
    println!("  Username:            {}", answers.username);
    println!("  Philosophy:          {}", answers.philosophy.title());
    println!("  Architecture:        {}", answers.architecture.title());
    println!("  Notepad:             {}", answers.notepad_summary);
    println!(
        "  Commit intelligence: {}",
        if answers.commit_intelligence { "yes" } else { "no" }
    );
}
