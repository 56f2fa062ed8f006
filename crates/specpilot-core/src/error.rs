use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecpilotError {
    #[error("not installed: run 'specpilot init' first (no engine found at {0})")]
    NotInstalled(PathBuf),

    #[error("framework engine not found at {0}")]
    FrameworkEngineMissing(PathBuf),

    #[error("no engine tree to back up at {0}")]
    NoEngine(PathBuf),

    #[error("no backups found in {0}")]
    NoBackups(PathBuf),

    #[error("backup not found: {0}")]
    BackupNotFound(String),

    #[error("could not allocate a unique backup directory for {0}")]
    BackupNameExhausted(String),

    #[error(
        "another specpilot process holds the lock at {0}; \
         remove the file if no other process is running"
    )]
    Locked(PathBuf),

    #[error("target must be an existing directory: {0}")]
    InvalidTarget(PathBuf),

    #[error("target directory is not writable: {0}")]
    NotWritable(PathBuf),

    #[error("invalid choice '{0}'")]
    InvalidChoice(String),

    #[error("cancelled by user")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}

pub type Result<T> = std::result::Result<T, SpecpilotError>;
