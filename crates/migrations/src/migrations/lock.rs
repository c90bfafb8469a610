//! Cross-process migration lock
//!
//! A session-level PostgreSQL advisory lock held on a dedicated pooled
//! connection for the duration of one command. Concurrent invocations against
//! the same database wait on each other instead of applying the same
//! migration twice.

use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};

use crate::error::MigrateResult;

/// Advisory lock key, derived from the bytes of "siquil"
pub const MIGRATION_LOCK_KEY: i64 = 0x7369_7175_696c;

/// Holds the advisory lock until [`MigrationLock::release`] is called.
///
/// If the guard is dropped without releasing, the connection is detached from
/// the pool and closed, which ends the session and frees the lock.
pub struct MigrationLock {
    conn: Option<PoolConnection<Postgres>>,
}

impl MigrationLock {
    /// Block until the lock is granted
    pub async fn acquire(pool: &PgPool) -> MigrateResult<Self> {
        let mut conn = pool.acquire().await?;
        tracing::debug!(key = MIGRATION_LOCK_KEY, "Waiting for migration lock");
        sqlx::query("SELECT pg_advisory_lock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *conn)
            .await?;
        tracing::debug!(key = MIGRATION_LOCK_KEY, "Migration lock acquired");
        Ok(Self { conn: Some(conn) })
    }

    /// Unlock and hand the connection back to the pool
    pub async fn release(mut self) -> MigrateResult<()> {
        if let Some(mut conn) = self.conn.take() {
            sqlx::query("SELECT pg_advisory_unlock($1)")
                .bind(MIGRATION_LOCK_KEY)
                .execute(&mut *conn)
                .await?;
            tracing::debug!(key = MIGRATION_LOCK_KEY, "Migration lock released");
        }
        Ok(())
    }
}

impl Drop for MigrationLock {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::debug!("Migration lock dropped without release; closing its session");
            drop(conn.detach());
        }
    }
}
