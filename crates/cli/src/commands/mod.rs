pub mod database;
pub mod migration;

use anyhow::Context;
use siquil_migrations::{mask_database_url, Database, MigrateError, MigrationConfig, DATABASE_URL_ENV};
use std::path::Path;

/// Load configuration from `--config` or `siquil.toml` in the working directory
pub fn load_config(config_path: Option<&Path>) -> anyhow::Result<MigrationConfig> {
    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    let config = match config_path {
        Some(path) => MigrationConfig::load_from(path, &cwd)?,
        None => MigrationConfig::load(&cwd)?,
    };
    tracing::debug!(migrations_dir = %config.migrations_dir.display(), "Configuration loaded");
    Ok(config)
}

/// Open the pool named by `DATABASE_URL`
pub async fn connect() -> Result<Database, MigrateError> {
    if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
        tracing::info!(url = %mask_database_url(&url), "Using database");
    }
    Database::from_env().await
}

/// Print what a halted batch committed before the failure
pub(crate) fn report_failure(error: &MigrateError) {
    if let MigrateError::Halted { applied, .. } = error {
        for migration in applied {
            println!("  Applied {}", migration);
        }
        if !applied.is_empty() {
            println!("Applied {} migration(s) before the failure", applied.len());
        }
    }
}
