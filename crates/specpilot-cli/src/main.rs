mod cmd;
mod output;
mod prompt;
mod root;

use clap::{error::ErrorKind, Args, CommandFactory, Parser, Subcommand};
use specpilot_core::{backup::DEFAULT_KEEP_BACKUPS, paths::Layout, update::UpdateOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "specpilot",
    about = "Install, update and roll back the SpecPilot framework in a project",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .specpilot/, else the current directory)
    #[arg(long, global = true, env = "SPECPILOT_ROOT")]
    root: Option<PathBuf>,

    /// Framework distribution that contains .specpilot/engine (default: next to this binary)
    #[arg(long, global = true, env = "SPECPILOT_FRAMEWORK")]
    framework: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    // `init` options, accepted without naming the subcommand
    #[command(flatten)]
    init: InitArgs,

    /// Defaults to `init`
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Debug, Default)]
struct InitArgs {
    /// Directory to install into (default: --root, else the current directory)
    target: Option<PathBuf>,

    /// Skip the questions and use defaults (requires --title)
    #[arg(long)]
    fast: bool,

    /// Project title
    #[arg(long)]
    title: Option<String>,
}

impl InitArgs {
    fn is_given(&self) -> bool {
        self.fast || self.title.is_some() || self.target.is_some()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Install SpecPilot into the project (interactive unless --fast)
    Init(InitArgs),

    /// Refresh the installed engine from the framework, with automatic rollback
    Update {
        /// Show what would change without writing anything
        #[arg(long)]
        dry_run: bool,

        /// List every file and log each step
        #[arg(long, short = 'v')]
        verbose: bool,

        /// Don't ask for confirmation
        #[arg(long)]
        force: bool,

        /// Backups to keep after a successful update
        #[arg(long, default_value_t = DEFAULT_KEEP_BACKUPS, env = "SPECPILOT_KEEP_BACKUPS")]
        keep_backups: usize,
    },

    /// Restore the engine from a backup
    Rollback {
        /// Restore the most recent backup without asking
        #[arg(long)]
        force: bool,
    },

    /// Delete all but the most recent backups
    CleanupBackups {
        /// Don't ask for confirmation
        #[arg(long)]
        force: bool,

        /// Backups to keep
        #[arg(long, default_value_t = DEFAULT_KEEP_BACKUPS, env = "SPECPILOT_KEEP_BACKUPS")]
        keep_backups: usize,
    },

    /// Back up the engine now
    Backup,

    /// List backups, newest first
    Backups,
}

fn main() {
    let cli = Cli::parse();
    let command = match cli.command {
        None => Commands::Init(cli.init),
        Some(_) if cli.init.is_given() => Cli::command()
            .error(
                ErrorKind::ArgumentConflict,
                "init options (TARGET, --fast, --title) cannot be combined with a subcommand",
            )
            .exit(),
        Some(command) => command,
    };

    let default_level = match &command {
        Commands::Update { verbose: true, .. } => tracing::Level::DEBUG,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let project_root = match &command {
        Commands::Init(args) => root::init_root(args.target.as_deref().or(cli.root.as_deref())),
        _ => root::resolve_root(cli.root.as_deref()),
    };
    let framework_root = root::resolve_framework(cli.framework.as_deref());
    let layout = Layout::new(project_root, framework_root);
    tracing::debug!(
        root = %layout.project_root().display(),
        framework = %layout.framework_root().display(),
        "resolved layout"
    );

    let result = match command {
        Commands::Init(args) => cmd::init::run(&layout, args.fast, args.title.as_deref()),
        Commands::Update {
            dry_run,
            verbose,
            force,
            keep_backups,
        } => cmd::update::run(
            &layout,
            UpdateOptions {
                dry_run,
                keep_backups,
            },
            verbose,
            force,
            cli.json,
        ),
        Commands::Rollback { force } => cmd::rollback::run(&layout, force, cli.json),
        Commands::CleanupBackups {
            force,
            keep_backups,
        } => cmd::cleanup_backups::run(&layout, force, keep_backups, cli.json),
        Commands::Backup => cmd::backup::create(&layout, cli.json),
        Commands::Backups => cmd::backup::list(&layout, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
