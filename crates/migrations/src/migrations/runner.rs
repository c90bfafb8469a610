//! Migration Runner - Operator-facing migration operations
//!
//! Composes the repository, ledger and executor into run-pending,
//! revert-last, reset, setup and status. Every database operation holds the
//! migration lock and starts from a fresh disk scan and ledger query.

use std::collections::HashMap;

use super::definitions::{Migration, MigrationResult, MigrationStatus};
use super::executor::Executor;
use super::ledger::Ledger;
use super::lock::MigrationLock;
use super::repository::{self, MigrationRepository};
use crate::config::MigrationConfig;
use crate::database::Database;
use crate::error::{MigrateError, MigrateResult};

/// Result of `database setup`
#[derive(Debug)]
pub struct SetupResult {
    /// Whether the migrations directory had to be created
    pub created_dir: bool,
    pub applied: Vec<MigrationResult>,
}

/// Migration runner that executes migrations against a database
pub struct MigrationRunner {
    repository: MigrationRepository,
    ledger: Ledger,
    executor: Executor,
    database: Database,
}

impl MigrationRunner {
    /// Create a new migration runner
    pub fn new(config: &MigrationConfig, database: &Database) -> Self {
        let pool = database.pool().clone();
        let ledger = Ledger::with_table(pool.clone(), config.migrations_table.clone());
        Self {
            repository: MigrationRepository::new(config.migrations_dir.clone()),
            executor: Executor::new(pool, ledger.clone()),
            ledger,
            database: database.clone(),
        }
    }

    /// Apply every pending migration in ascending order, stopping at the first failure
    pub async fn run_pending(&self) -> MigrateResult<Vec<MigrationResult>> {
        let lock = MigrationLock::acquire(self.database.pool()).await?;
        let result = self.run_pending_locked().await;
        release(lock, result).await
    }

    /// Revert the migration with the greatest applied version.
    ///
    /// Returns `None` when nothing is applied or the last applied version has
    /// no directory on disk.
    pub async fn revert_last(&self) -> MigrateResult<Option<MigrationResult>> {
        let lock = MigrationLock::acquire(self.database.pool()).await?;
        let result = self.revert_last_locked().await;
        release(lock, result).await
    }

    /// Drop the schema, recreate the ledger and apply every migration on disk
    pub async fn reset(&self) -> MigrateResult<Vec<MigrationResult>> {
        let lock = MigrationLock::acquire(self.database.pool()).await?;
        let result = self.reset_locked().await;
        release(lock, result).await
    }

    /// Create the migrations directory if needed, then run pending migrations
    pub async fn setup(&self) -> MigrateResult<SetupResult> {
        let created_dir = self.repository.ensure_dir()?;
        let applied = self.run_pending().await?;
        Ok(SetupResult {
            created_dir,
            applied,
        })
    }

    /// Every migration on disk with its state, followed by ledger entries
    /// whose directory no longer exists
    pub async fn status(&self) -> MigrateResult<Vec<MigrationStatus>> {
        self.ledger.ensure_table().await?;
        let all = self.repository.list()?;
        let mut applied: HashMap<String, _> = self
            .ledger
            .applied_records()
            .await?
            .into_iter()
            .map(|record| (record.version.clone(), record))
            .collect();

        let mut statuses: Vec<MigrationStatus> = all
            .into_iter()
            .map(|migration| match applied.remove(&migration.version) {
                Some(record) => MigrationStatus::Applied {
                    migration,
                    applied_at: record.applied_at,
                },
                None => MigrationStatus::Pending(migration),
            })
            .collect();

        let mut orphaned: Vec<_> = applied.into_values().map(MigrationStatus::Orphaned).collect();
        orphaned.sort_by(|a, b| a.version().cmp(b.version()));
        statuses.extend(orphaned);
        Ok(statuses)
    }

    async fn run_pending_locked(&self) -> MigrateResult<Vec<MigrationResult>> {
        self.ledger.ensure_table().await?;
        let applied = self.ledger.applied_versions().await?;
        let pending = repository::pending(self.repository.list()?, &applied);

        if pending.is_empty() {
            tracing::info!("No pending migrations");
            return Ok(Vec::new());
        }

        self.apply_all(&pending).await
    }

    async fn revert_last_locked(&self) -> MigrateResult<Option<MigrationResult>> {
        self.ledger.ensure_table().await?;
        let applied = self.ledger.applied_versions().await?;

        let Some(migration) = repository::last_applied(self.repository.list()?, &applied) else {
            tracing::info!("No migrations to revert");
            return Ok(None);
        };

        self.executor.revert(&migration).await?;
        Ok(Some(MigrationResult::from(&migration)))
    }

    async fn reset_locked(&self) -> MigrateResult<Vec<MigrationResult>> {
        self.ledger.drop_all_tables().await?;
        self.ledger.ensure_table().await?;

        let all = self.repository.list()?;
        if all.is_empty() {
            tracing::info!("No migrations to run");
            return Ok(Vec::new());
        }

        self.apply_all(&all).await
    }

    /// Apply `migrations` in order. The first failure halts the batch; earlier
    /// migrations stay committed.
    async fn apply_all(&self, migrations: &[Migration]) -> MigrateResult<Vec<MigrationResult>> {
        let mut applied = Vec::with_capacity(migrations.len());

        for migration in migrations {
            if let Err(error) = self.executor.apply(migration).await {
                tracing::error!(migration = %migration, error = %error, "Migration failed");
                return Err(MigrateError::Halted {
                    applied,
                    failed: MigrationResult::from(migration),
                    source: Box::new(error),
                });
            }
            applied.push(MigrationResult::from(migration));
        }

        tracing::info!(count = applied.len(), "Applied migrations");
        Ok(applied)
    }
}

/// Release the lock, preferring the operation's error over an unlock failure
async fn release<T>(lock: MigrationLock, result: MigrateResult<T>) -> MigrateResult<T> {
    match (lock.release().await, result) {
        (_, Err(error)) => Err(error),
        (Err(unlock_error), Ok(_)) => Err(unlock_error),
        (Ok(()), Ok(value)) => Ok(value),
    }
}
