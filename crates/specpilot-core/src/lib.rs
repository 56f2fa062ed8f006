pub mod backup;
pub mod config;
pub mod error;
pub mod io;
pub mod lock;
pub mod maintenance;
pub mod paths;
pub mod prompt;
pub mod scaffold;
pub mod update;

pub use error::{Result, SpecpilotError};
