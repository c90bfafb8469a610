//! Migration Definitions - Core types for migrations
//!
//! Defines Migration, AppliedRecord, MigrationResult and the direction and
//! status enums shared by the repository, ledger and executor.

use chrono::NaiveDateTime;
use std::fmt;
use std::path::PathBuf;

/// File name of the forward script inside a migration directory
pub const UP_SCRIPT: &str = "up.sql";

/// File name of the reverse script inside a migration directory
pub const DOWN_SCRIPT: &str = "down.sql";

/// Represents a migration directory on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    /// 14-digit `YYYYMMDDHHMMSS` timestamp
    pub version: String,
    /// Slug following the version in the directory name
    pub name: String,
    /// Directory holding `up.sql` and `down.sql`
    pub path: PathBuf,
}

impl Migration {
    /// Directory name, `<version>_<name>`
    pub fn id(&self) -> String {
        format!("{}_{}", self.version, self.name)
    }

    /// Path to the script for the given direction
    pub fn script_path(&self, direction: MigrationDirection) -> PathBuf {
        self.path.join(direction.script())
    }
}

impl fmt::Display for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.version, self.name)
    }
}

/// Ledger row for an applied migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedRecord {
    pub version: String,
    /// Server-assigned at insert
    pub applied_at: NaiveDateTime,
}

/// A migration that was applied or reverted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationResult {
    pub version: String,
    pub name: String,
}

impl From<&Migration> for MigrationResult {
    fn from(migration: &Migration) -> Self {
        Self {
            version: migration.version.clone(),
            name: migration.name.clone(),
        }
    }
}

impl fmt::Display for MigrationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.version, self.name)
    }
}

/// Migration direction for execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    /// Apply the migration (run `up.sql`)
    Up,
    /// Revert the migration (run `down.sql`)
    Down,
}

impl MigrationDirection {
    pub fn script(self) -> &'static str {
        match self {
            MigrationDirection::Up => UP_SCRIPT,
            MigrationDirection::Down => DOWN_SCRIPT,
        }
    }
}

/// Migration status in the system
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationStatus {
    /// On disk, not in the ledger
    Pending(Migration),
    /// On disk and in the ledger
    Applied {
        migration: Migration,
        applied_at: NaiveDateTime,
    },
    /// In the ledger but its directory is gone
    Orphaned(AppliedRecord),
}

impl MigrationStatus {
    pub fn version(&self) -> &str {
        match self {
            MigrationStatus::Pending(migration) => &migration.version,
            MigrationStatus::Applied { migration, .. } => &migration.version,
            MigrationStatus::Orphaned(record) => &record.version,
        }
    }
}
