use specpilot_core::paths::SPECPILOT_DIR;
use std::path::{Path, PathBuf};

/// Resolve the project root for commands that act on an existing install.
///
/// Priority:
/// 1. `--root` flag / `SPECPILOT_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.specpilot/`
/// 3. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = current_dir();
    let mut dir = cwd.clone();
    loop {
        if dir.join(SPECPILOT_DIR).is_dir() {
            return dir;
        }
        match dir.parent() {
            Some(p) => dir = p.to_path_buf(),
            None => break,
        }
    }

    cwd
}

/// `init` installs where it is pointed, never into an enclosing project.
pub fn init_root(explicit: Option<&Path>) -> PathBuf {
    explicit.map(Path::to_path_buf).unwrap_or_else(current_dir)
}

/// The framework distribution: `--framework` / `SPECPILOT_FRAMEWORK`, else the
/// directory holding the running binary.
pub fn resolve_framework(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(current_dir)
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
