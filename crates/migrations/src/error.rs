//! Error types for the migration engine
//!
//! Every fallible operation returns [`MigrateResult`]. Batch operations wrap
//! the first failure in [`MigrateError::Halted`] so callers can tell which
//! migration stopped the run and what was committed before it.

use std::path::PathBuf;
use thiserror::Error;

use crate::migrations::MigrationResult;

/// Result type alias for migration operations
pub type MigrateResult<T> = Result<T, MigrateError>;

/// Error types for migration operations
#[derive(Debug, Error)]
pub enum MigrateError {
    /// A migration directory lacks its forward or reverse script
    #[error("Missing {script} in {}", .dir.display())]
    MissingScript { script: &'static str, dir: PathBuf },

    /// The database rejected a migration script; its transaction was rolled back
    #[error("Failed to execute {script} for migration {migration}: {source}")]
    ScriptExecution {
        migration: String,
        script: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// Configuration file could not be read or parsed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No usable database connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// Ledger, lock or transaction-control failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem failure while scanning, reading or generating migrations
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Name that cannot be used for a generated migration directory
    #[error("Invalid migration name '{0}'")]
    InvalidName(String),

    /// A batch stopped at the first failing migration
    #[error(
        "Migration {}_{} failed after {} applied: {source}",
        .failed.version,
        .failed.name,
        .applied.len()
    )]
    Halted {
        /// Migrations committed before the failure
        applied: Vec<MigrationResult>,
        /// The migration that failed
        failed: MigrationResult,
        #[source]
        source: Box<MigrateError>,
    },
}

impl MigrateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MigrateError::Io {
            path: path.into(),
            source,
        }
    }

    /// The error at the root of a halted batch, or `self` otherwise
    pub fn root_cause(&self) -> &MigrateError {
        match self {
            MigrateError::Halted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
