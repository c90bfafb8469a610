//! Configuration for the migration system
//!
//! Settings come from an optional `siquil.toml` in the working directory.
//! Only `migrations_dir` is recognised; anything missing falls back to
//! [`MigrationConfig::default`].

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{MigrateError, MigrateResult};

/// Name of the configuration file looked up in the working directory
pub const CONFIG_FILE: &str = "siquil.toml";

/// Table name for tracking applied migrations
pub const MIGRATIONS_TABLE: &str = "__siquil_migrations";

/// Configuration for the migration system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Directory where migration directories are stored
    pub migrations_dir: PathBuf,
    /// Table name for tracking migrations. Not read from `siquil.toml`;
    /// library callers may override it.
    pub migrations_table: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            migrations_dir: PathBuf::from("migrations"),
            migrations_table: MIGRATIONS_TABLE.to_string(),
        }
    }
}

/// Keys other than `migrations_dir` are ignored
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    migrations_dir: Option<PathBuf>,
}

impl MigrationConfig {
    /// Load `siquil.toml` from `cwd` if present, resolving the migrations
    /// directory against `cwd`
    pub fn load(cwd: &Path) -> MigrateResult<Self> {
        let path = cwd.join(CONFIG_FILE);
        let file = if path.exists() {
            Self::read_file(&path)?
        } else {
            tracing::debug!(path = %path.display(), "No configuration file, using defaults");
            ConfigFile::default()
        };
        Ok(Self::from_file(file, cwd))
    }

    /// Load an explicitly named configuration file, which must exist
    pub fn load_from(path: &Path, cwd: &Path) -> MigrateResult<Self> {
        if !path.is_file() {
            return Err(MigrateError::Configuration(format!(
                "Configuration file {} not found",
                path.display()
            )));
        }
        Ok(Self::from_file(Self::read_file(path)?, cwd))
    }

    fn read_file(path: &Path) -> MigrateResult<ConfigFile> {
        let content = fs::read_to_string(path).map_err(|e| {
            MigrateError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content).map_err(|e| {
            MigrateError::Configuration(format!("Error parsing {}: {}", path.display(), e))
        })
    }

    fn from_file(file: ConfigFile, cwd: &Path) -> Self {
        let mut config = Self::default();
        if let Some(dir) = file.migrations_dir {
            config.migrations_dir = dir;
        }
        config.migrations_dir = cwd.join(&config.migrations_dir);
        config
    }

    fn parse(content: &str) -> Result<ConfigFile, toml::de::Error> {
        toml::from_str(content)
    }

    /// Override the migrations directory
    pub fn with_migrations_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.migrations_dir = dir.into();
        self
    }
}
