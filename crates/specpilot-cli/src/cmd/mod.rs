pub mod backup;
pub mod cleanup_backups;
pub mod init;
pub mod rollback;
pub mod update;
