use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const SPECPILOT_DIR: &str = ".specpilot";
pub const ENGINE_DIR: &str = ".specpilot/engine";
pub const WORKSPACE_DIR: &str = ".specpilot/workspace";
pub const BACKUPS_DIR: &str = ".specpilot/backups";
pub const TEMPLATES_DIR: &str = "templates";

pub const LOCK_FILE: &str = ".specpilot/.lock";
pub const LOCAL_CONFIG_FILE: &str = ".specpilot.local";
pub const USER_CONFIG_FILE: &str = "config/config.json";
pub const NOTEPAD_FILE: &str = "notepad/note.md";

pub const PROJECT_DIRS: [&str; 4] = ["docs/plans", "docs/specs", "src", "tests"];
pub const USER_WORKSPACE_DIRS: [&str; 3] = ["config", "logs", "notepad"];

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Resolved paths of one installation.
///
/// Built once per invocation from the project root (where SpecPilot is, or
/// will be, installed) and the framework root (the distribution that ships
/// `.specpilot/engine`). Every lifecycle operation borrows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    project_root: PathBuf,
    framework_root: PathBuf,
}

impl Layout {
    pub fn new(project_root: impl Into<PathBuf>, framework_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            framework_root: framework_root.into(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn framework_root(&self) -> &Path {
        &self.framework_root
    }

    pub fn specpilot_dir(&self) -> PathBuf {
        self.project_root.join(SPECPILOT_DIR)
    }

    pub fn engine_dir(&self) -> PathBuf {
        self.project_root.join(ENGINE_DIR)
    }

    pub fn workspace_dir(&self) -> PathBuf {
        self.project_root.join(WORKSPACE_DIR)
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.project_root.join(BACKUPS_DIR)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.project_root.join(LOCK_FILE)
    }

    pub fn local_config_path(&self) -> PathBuf {
        self.project_root.join(LOCAL_CONFIG_FILE)
    }

    /// The engine shipped with the framework, i.e. the update source.
    pub fn source_engine_dir(&self) -> PathBuf {
        self.framework_root.join(ENGINE_DIR)
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.engine_dir().join(TEMPLATES_DIR)
    }

    pub fn user_workspace(&self, username: &str) -> PathBuf {
        self.workspace_dir().join(username)
    }

    pub fn user_config_path(&self, username: &str) -> PathBuf {
        self.user_workspace(username).join(USER_CONFIG_FILE)
    }

    pub fn notepad_path(&self, username: &str) -> PathBuf {
        self.user_workspace(username).join(NOTEPAD_FILE)
    }

    /// Workspace path as recorded in `.specpilot.local` (always `/`-separated).
    pub fn relative_workspace(username: &str) -> String {
        format!("{WORKSPACE_DIR}/{username}")
    }

    pub fn is_installed(&self) -> bool {
        self.engine_dir().is_dir()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let layout = Layout::new("/tmp/proj", "/opt/specpilot");
        assert_eq!(
            layout.engine_dir(),
            PathBuf::from("/tmp/proj/.specpilot/engine")
        );
        assert_eq!(
            layout.backups_dir(),
            PathBuf::from("/tmp/proj/.specpilot/backups")
        );
        assert_eq!(
            layout.source_engine_dir(),
            PathBuf::from("/opt/specpilot/.specpilot/engine")
        );
        assert_eq!(
            layout.user_config_path("ada"),
            PathBuf::from("/tmp/proj/.specpilot/workspace/ada/config/config.json")
        );
        assert_eq!(
            layout.templates_dir(),
            PathBuf::from("/tmp/proj/.specpilot/engine/templates")
        );
    }

    #[test]
    fn relative_workspace_uses_forward_slashes() {
        assert_eq!(
            Layout::relative_workspace("ada"),
            ".specpilot/workspace/ada"
        );
    }

    #[test]
    fn not_installed_without_engine() {
        let dir = tempfile::TempDir::new().unwrap();
        let layout = Layout::new(dir.path(), dir.path());
        assert!(!layout.is_installed());
        std::fs::create_dir_all(layout.engine_dir()).unwrap();
        assert!(layout.is_installed());
    }
}
