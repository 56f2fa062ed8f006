//! `specpilot init`: lay down the project tree, engine, workspace and docs.

use crate::config::{Approach, LocalConfig, NotepadSummary, UserConfig};
use crate::error::{Result, SpecpilotError};
use crate::io;
use crate::paths::{self, Layout};
use crate::prompt::Prompter;
use serde::Serialize;
use std::path::Path;

pub const DEFAULT_USERNAME: &str = "developer";

/// Templates shipped in `engine/templates/`, and where each lands in the project.
const DOC_TEMPLATES: [(&str, &str); 4] = [
    ("product_roadmap", "docs/plans/product_roadmap.md"),
    ("architecture", "docs/plans/architecture.md"),
    ("technical_roadmap", "docs/plans/technical_roadmap.md"),
    ("project_conventions", "docs/project_conventions.md"),
];

const GITIGNORE_ENTRIES: [&str; 2] = [".specpilot.local", ".specpilot/backups/"];

// ---------------------------------------------------------------------------
// Answers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitAnswers {
    pub username: String,
    pub project_title: String,
    pub project_description: String,
    pub philosophy: Approach,
    pub architecture: Approach,
    pub notepad_summary: NotepadSummary,
    pub commit_intelligence: bool,
}

impl InitAnswers {
    /// Defaults used by `init --fast`.
    pub fn fast(title: &str, username: &str) -> Self {
        Self {
            username: username.to_string(),
            project_title: title.to_string(),
            project_description: format!("A {title} project built with SpecPilot framework."),
            philosophy: Approach::default(),
            architecture: Approach::default(),
            notepad_summary: NotepadSummary::default(),
            commit_intelligence: true,
        }
    }

    /// Ask every question of the interactive setup.
    pub fn ask(layout: &Layout, prompter: &mut dyn Prompter, default_user: &str) -> Result<Self> {
        let username = prompter.input("Username", Some(default_user))?;
        let dir_name = layout
            .project_root()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string());
        let project_title = prompter.input("Project title", Some(&dir_name))?;
        let project_description = prompter.input("Project description (optional)", None)?;

        let approaches = [
            "Enterprise Scale - strict rules, security focus, TDD".to_string(),
            "Scalable MVP - solid foundations, growth-oriented".to_string(),
            "Vibe Time - minimal conventions, flexible approach".to_string(),
        ];
        let philosophy = pick(
            prompter,
            "Development philosophy",
            &approaches,
            Approach::all(),
            Approach::default(),
        )?;
        let goals = [
            "Enterprise Scale - high security and reliability from day one".to_string(),
            "Scalable MVP - a solid foundation that can grow".to_string(),
            "Vibe Time - no formal architecture, just get it working".to_string(),
        ];
        let architecture = pick(
            prompter,
            "Architecture goal",
            &goals,
            Approach::all(),
            Approach::default(),
        )?;
        let summaries = [
            "one-line - brief summary after each command".to_string(),
            "verbose - detailed summary after each command".to_string(),
            "none - no automatic summary".to_string(),
        ];
        let notepad_summary = pick(
            prompter,
            "Notepad summary",
            &summaries,
            NotepadSummary::all(),
            NotepadSummary::default(),
        )?;
        let commit_intelligence = prompter.confirm(
            "Enable commit intelligence (development scores and session analytics)?",
            true,
        )?;

        Ok(Self {
            username: non_empty_or(username, default_user),
            project_title: non_empty_or(project_title, &dir_name),
            project_description,
            philosophy,
            architecture,
            notepad_summary,
            commit_intelligence,
        })
    }
}

fn pick<T: Copy + PartialEq>(
    prompter: &mut dyn Prompter,
    prompt: &str,
    labels: &[String],
    values: &[T],
    default: T,
) -> Result<T> {
    let default_index = values.iter().position(|v| *v == default).unwrap_or(0);
    let index = prompter.select(prompt, labels, default_index)?;
    values
        .get(index)
        .copied()
        .ok_or_else(|| SpecpilotError::InvalidChoice((index + 1).to_string()))
}

fn non_empty_or(value: String, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// `git config user.name`, or [`DEFAULT_USERNAME`] when git is absent or unset.
pub fn git_user() -> String {
    let Ok(git) = which::which("git") else {
        return DEFAULT_USERNAME.to_string();
    };
    match std::process::Command::new(git)
        .args(["config", "user.name"])
        .output()
    {
        Ok(out) if out.status.success() => {
            let name = String::from_utf8_lossy(&out.stdout).trim().to_string();
            if name.is_empty() {
                DEFAULT_USERNAME.to_string()
            } else {
                name
            }
        }
        Ok(_) => DEFAULT_USERNAME.to_string(),
        Err(e) => {
            tracing::debug!("git config user.name failed: {e}");
            DEFAULT_USERNAME.to_string()
        }
    }
}

/// The project root must be a writable directory; an existing installation
/// is only replaced after confirmation.
pub fn validate_environment(layout: &Layout, prompter: &mut dyn Prompter) -> Result<()> {
    let root = layout.project_root();
    if !root.is_dir() {
        return Err(SpecpilotError::InvalidTarget(root.to_path_buf()));
    }
    if layout.specpilot_dir().exists()
        && !prompter.confirm(
            ".specpilot directory already exists. Overwrite existing installation?",
            false,
        )?
    {
        return Err(SpecpilotError::Cancelled);
    }
    if tempfile::tempfile_in(root).is_err() {
        return Err(SpecpilotError::NotWritable(root.to_path_buf()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Install
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteStatus {
    Created,
    Updated,
    Exists,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Written {
    /// Relative to the project root.
    pub path: String,
    pub status: WriteStatus,
}

#[derive(Debug, Default)]
struct Log(Vec<Written>);

impl Log {
    fn push(&mut self, path: impl Into<String>, status: WriteStatus) {
        self.0.push(Written {
            path: path.into(),
            status,
        });
    }

    fn created_or_exists(&mut self, path: &str, created: bool) {
        let status = if created {
            WriteStatus::Created
        } else {
            WriteStatus::Exists
        };
        self.push(path, status);
    }
}

/// Lay down a complete installation. Managed files (engine, config) are
/// always rewritten; user-owned files are only created when missing.
pub fn install(layout: &Layout, answers: &InitAnswers) -> Result<Vec<Written>> {
    let source = layout.source_engine_dir();
    if !source.is_dir() {
        return Err(SpecpilotError::FrameworkEngineMissing(source));
    }
    let root = layout.project_root();
    let mut log = Log::default();

    for dir in [
        paths::SPECPILOT_DIR,
        paths::ENGINE_DIR,
        paths::WORKSPACE_DIR,
        paths::BACKUPS_DIR,
    ]
    .into_iter()
    .chain(paths::PROJECT_DIRS)
    {
        io::ensure_dir(&root.join(dir))?;
    }

    let files = io::copy_tree(&source, &layout.engine_dir())?;
    tracing::info!(files, "engine installed");
    log.push(format!("{}/ ({files} files)", paths::ENGINE_DIR), WriteStatus::Updated);

    let user = &answers.username;
    let workspace = layout.user_workspace(user);
    for dir in paths::USER_WORKSPACE_DIRS {
        io::ensure_dir(&workspace.join(dir))?;
    }

    LocalConfig::new(user.as_str()).save(layout)?;
    log.push(paths::LOCAL_CONFIG_FILE, WriteStatus::Updated);
    UserConfig::new(user, answers.notepad_summary, answers.commit_intelligence)
        .save(layout, user)?;
    log.push(
        format!("{}/{}", Layout::relative_workspace(user), paths::USER_CONFIG_FILE),
        WriteStatus::Updated,
    );

    let readme = readme_content(answers);
    log.created_or_exists(
        "README.md",
        io::write_if_missing(&root.join("README.md"), readme.as_bytes())?,
    );

    let templates = layout.templates_dir();
    for (name, dest) in DOC_TEMPLATES {
        let template = templates.join(format!("{name}.md"));
        if !template.is_file() {
            tracing::debug!(template = name, "template not shipped, skipping");
            continue;
        }
        let target = root.join(dest);
        let created = copy_if_missing(&template, &target)?;
        log.created_or_exists(dest, created);
    }

    log.created_or_exists(
        &format!("{}/{}", Layout::relative_workspace(user), paths::NOTEPAD_FILE),
        io::write_if_missing(&layout.notepad_path(user), NOTEPAD_CONTENT.as_bytes())?,
    );

    let gitignore = root.join(".gitignore");
    if io::write_if_missing(&gitignore, GITIGNORE_CONTENT.as_bytes())? {
        log.push(".gitignore", WriteStatus::Created);
    } else {
        let mut added = false;
        for entry in GITIGNORE_ENTRIES {
            added |= io::ensure_gitignore_entry(root, entry)?;
        }
        let status = if added {
            WriteStatus::Updated
        } else {
            WriteStatus::Exists
        };
        log.push(".gitignore", status);
    }

    log.created_or_exists(
        "requirements.txt",
        io::write_if_missing(&root.join("requirements.txt"), REQUIREMENTS_CONTENT.as_bytes())?,
    );

    Ok(log.0)
}

fn copy_if_missing(from: &Path, to: &Path) -> Result<bool> {
    if to.exists() {
        return Ok(false);
    }
    if let Some(parent) = to.parent() {
        io::ensure_dir(parent)?;
    }
    std::fs::copy(from, to)?;
    Ok(true)
}

fn readme_content(answers: &InitAnswers) -> String {
    let description = if answers.project_description.trim().is_empty() {
        "A project built with SpecPilot framework."
    } else {
        answers.project_description.as_str()
    };
    format!(
        "# {title}\n\n{description}\n{body}\n## Development Philosophy\n\n\
         **{philosophy}** approach with **{architecture}** architecture goals.\n\n\
         See the [SpecPilot documentation](https://github.com/specpilot/framework) for more.\n",
        title = answers.project_title,
        body = README_BODY,
        philosophy = answers.philosophy.title(),
        architecture = answers.architecture.title(),
    )
}

// ---------------------------------------------------------------------------
// Static content
// ---------------------------------------------------------------------------

const README_BODY: &str = r#"
## Getting Started

This project follows the SpecPilot workflow: plans and specs are written
first, then implemented and checked against them.

### Modes

- **Initialization**: project startup and validation
- **Pilot**: step-by-step development guidance
- **Architecture**: collaborative architectural design
- **Design**: specification writing
- **Spec**: implementation and testing
- **Vibe**: debugging and troubleshooting
- **Deep Check**: quality assurance
- **Commit**: commit analysis

### Quick Start

1. Open the project in your AI-enabled editor
2. Create a mode that loads the SpecPilot instructions
3. Say "Enter Pilot Mode" to begin

## Project Structure

- `docs/plans/` - product, architecture and technical roadmaps
- `docs/specs/` - feature specifications
- `src/` - source code
- `tests/` - tests
- `.specpilot/` - framework engine, workspaces and backups
"#;

const NOTEPAD_CONTENT: &str = r#"# Development Notes

---

## Ideas
*Add your ideas here*

## To Do List
*Add your tasks here*

## Decisions to Make
*Add decisions that need to be made here*

## Other Notes
*Add other notes here*

---
_Use "Add to notepad:" to capture content | Use "Organize Notepad" to clean up_
"#;

const GITIGNORE_CONTENT: &str = r#"# SpecPilot
.specpilot.local
.specpilot/backups/

# Python
__pycache__/
*.py[cod]
*.egg-info/
build/
dist/

# Virtual environments
.env
.venv
env/
venv/

# IDE
.vscode/
.idea/
*.swp
*~

# OS
.DS_Store
Thumbs.db
"#;

const REQUIREMENTS_CONTENT: &str = "# Project dependencies\n# Add your Python package requirements here\n";

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
