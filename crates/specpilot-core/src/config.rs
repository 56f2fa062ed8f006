use crate::error::Result;
use crate::paths::Layout;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

// ---------------------------------------------------------------------------
// Choices
// ---------------------------------------------------------------------------

/// Development philosophy and architecture goal share one scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Approach {
    Enterprise,
    #[default]
    Scalable,
    Vibe,
}

impl Approach {
    pub fn all() -> &'static [Approach] {
        &[Approach::Enterprise, Approach::Scalable, Approach::Vibe]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Approach::Enterprise => "enterprise",
            Approach::Scalable => "scalable",
            Approach::Vibe => "vibe",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Approach::Enterprise => "Enterprise",
            Approach::Scalable => "Scalable",
            Approach::Vibe => "Vibe",
        }
    }
}

impl fmt::Display for Approach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NotepadSummary {
    #[default]
    #[serde(rename = "one-line")]
    OneLine,
    #[serde(rename = "verbose")]
    Verbose,
    #[serde(rename = "none")]
    Off,
}

impl NotepadSummary {
    pub fn all() -> &'static [NotepadSummary] {
        &[
            NotepadSummary::OneLine,
            NotepadSummary::Verbose,
            NotepadSummary::Off,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NotepadSummary::OneLine => "one-line",
            NotepadSummary::Verbose => "verbose",
            NotepadSummary::Off => "none",
        }
    }
}

impl fmt::Display for NotepadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// LocalConfig (.specpilot.local)
// ---------------------------------------------------------------------------

/// Per-checkout pointer to the active user's workspace. Not committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalConfig {
    pub username: String,
    pub workspace_path: String,
}

impl LocalConfig {
    pub fn new(username: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            workspace_path: Layout::relative_workspace(&username),
            username,
        }
    }

    pub fn load(layout: &Layout) -> Result<Self> {
        load_json(&layout.local_config_path())
    }

    pub fn save(&self, layout: &Layout) -> Result<()> {
        save_json(&layout.local_config_path(), self)
    }
}

// ---------------------------------------------------------------------------
// UserConfig (workspace/<user>/config/config.json)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub verbose_mode: bool,
    #[serde(default)]
    pub notepad_summary: NotepadSummary,
    #[serde(default = "default_true")]
    pub track_model: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitConfig {
    #[serde(default = "default_true")]
    pub commit_intelligence: bool,
    #[serde(default = "default_true")]
    pub session_analytics: bool,
    #[serde(default = "default_true")]
    pub frustration_scoring: bool,
    #[serde(default = "default_true")]
    pub productivity_metrics: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(rename = "_description")]
    pub description: String,
    pub logging: LoggingConfig,
    #[serde(rename = "commitconfiguration")]
    pub commit: CommitConfig,
}

impl UserConfig {
    pub fn new(username: &str, notepad_summary: NotepadSummary, commit_intelligence: bool) -> Self {
        Self {
            description: format!("Project-specific configuration for {username}"),
            logging: LoggingConfig {
                verbose_mode: true,
                notepad_summary,
                track_model: true,
            },
            commit: CommitConfig {
                commit_intelligence,
                session_analytics: true,
                frustration_scoring: true,
                productivity_metrics: true,
            },
        }
    }

    pub fn load(layout: &Layout, username: &str) -> Result<Self> {
        load_json(&layout.user_config_path(username))
    }

    pub fn save(&self, layout: &Layout, username: &str) -> Result<()> {
        save_json(&layout.user_config_path(username), self)
    }
}

fn load_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut data = serde_json::to_string_pretty(value)?;
    data.push('\n');
    crate::io::atomic_write(path, data.as_bytes())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
