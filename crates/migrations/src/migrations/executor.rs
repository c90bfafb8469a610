//! Transactional Executor - Applies and reverts single migrations
//!
//! Each apply or revert runs the whole script plus the ledger update inside
//! one transaction. On any failure the transaction is rolled back and the
//! original error returned, so the ledger never records half a migration.

use sqlx::{PgConnection, PgPool};
use std::fs;

use super::definitions::{Migration, MigrationDirection};
use super::ledger::Ledger;
use crate::error::{MigrateError, MigrateResult};

/// Runs migration scripts against the database
#[derive(Debug, Clone)]
pub struct Executor {
    pool: PgPool,
    ledger: Ledger,
}

impl Executor {
    pub fn new(pool: PgPool, ledger: Ledger) -> Self {
        Self { pool, ledger }
    }

    /// Run `up.sql` and record the version
    pub async fn apply(&self, migration: &Migration) -> MigrateResult<()> {
        self.execute(migration, MigrationDirection::Up).await?;
        tracing::info!(migration = %migration, "Applied migration");
        Ok(())
    }

    /// Run `down.sql` and remove the version
    pub async fn revert(&self, migration: &Migration) -> MigrateResult<()> {
        self.execute(migration, MigrationDirection::Down).await?;
        tracing::info!(migration = %migration, "Reverted migration");
        Ok(())
    }

    async fn execute(&self, migration: &Migration, direction: MigrationDirection) -> MigrateResult<()> {
        let script = read_script(migration, direction)?;

        // The pooled connection returns to the pool when `transaction` drops.
        let mut transaction = self.pool.begin().await?;

        let outcome = self
            .run_in_transaction(&mut *transaction, migration, direction, &script)
            .await;

        match outcome {
            Ok(()) => {
                transaction.commit().await?;
                Ok(())
            }
            Err(error) => {
                if let Err(rollback_error) = transaction.rollback().await {
                    tracing::warn!(
                        migration = %migration,
                        error = %rollback_error,
                        "Rollback failed"
                    );
                }
                Err(error)
            }
        }
    }

    async fn run_in_transaction(
        &self,
        conn: &mut PgConnection,
        migration: &Migration,
        direction: MigrationDirection,
        script: &str,
    ) -> MigrateResult<()> {
        tracing::debug!(migration = %migration, script = direction.script(), "Executing script");

        // Executed as one batch so scripts may hold several statements.
        sqlx::Executor::execute(&mut *conn, script)
            .await
            .map_err(|source| MigrateError::ScriptExecution {
                migration: migration.id(),
                script: direction.script(),
                source,
            })?;

        match direction {
            MigrationDirection::Up => self.ledger.insert(conn, &migration.version).await,
            MigrationDirection::Down => self.ledger.remove(conn, &migration.version).await,
        }
    }
}

/// Read the script for `direction`, failing if the file is absent
pub fn read_script(migration: &Migration, direction: MigrationDirection) -> MigrateResult<String> {
    let path = migration.script_path(direction);
    if !path.is_file() {
        return Err(MigrateError::MissingScript {
            script: direction.script(),
            dir: migration.path.clone(),
        });
    }
    fs::read_to_string(&path).map_err(|e| MigrateError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn migration_in(temp_dir: &TempDir) -> Migration {
        let path = temp_dir.path().join("20240101000000_init");
        fs::create_dir_all(&path).unwrap();
        Migration {
            version: "20240101000000".to_string(),
            name: "init".to_string(),
            path,
        }
    }

    #[test]
    fn test_read_script_returns_full_text() {
        let temp_dir = TempDir::new().unwrap();
        let migration = migration_in(&temp_dir);
        let sql = "CREATE TABLE a (id INT);\nCREATE TABLE b (id INT);\n";
        fs::write(migration.path.join("up.sql"), sql).unwrap();

        assert_eq!(read_script(&migration, MigrationDirection::Up).unwrap(), sql);
    }

    #[test]
    fn test_read_script_missing_up() {
        let temp_dir = TempDir::new().unwrap();
        let migration = migration_in(&temp_dir);

        let err = read_script(&migration, MigrationDirection::Up).unwrap_err();
        match err {
            MigrateError::MissingScript { script, dir } => {
                assert_eq!(script, "up.sql");
                assert_eq!(dir, migration.path);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_script_missing_down() {
        let temp_dir = TempDir::new().unwrap();
        let migration = migration_in(&temp_dir);
        fs::write(migration.path.join("up.sql"), "SELECT 1;").unwrap();

        let err = read_script(&migration, MigrationDirection::Down).unwrap_err();
        assert!(matches!(
            err,
            MigrateError::MissingScript { script: "down.sql", .. }
        ));
    }
}
