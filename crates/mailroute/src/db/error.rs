use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The database directory could not be created.
    #[error("Cannot create database directory '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema migration v{version} failed: {reason}")]
    Migration { version: u32, reason: String },

    /// The file was written by a newer build with migrations this one lacks.
    #[error("Database schema v{found} is newer than the supported v{supported}")]
    SchemaTooNew { found: u32, supported: u32 },

    /// A stored value could not be decoded back into its domain type.
    #[error("Corrupt row in '{table}': {reason}")]
    Corrupt { table: &'static str, reason: String },

    #[error("Database lock poisoned")]
    LockPoisoned,
}
