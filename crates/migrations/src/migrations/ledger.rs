//! Applied-State Ledger - Tracks applied migrations inside the database
//!
//! One row per applied migration in the ledger table. The table is created
//! lazily and must exist before any read or write.

use sqlx::{PgConnection, PgPool, Row};

use super::definitions::AppliedRecord;
use crate::config::MIGRATIONS_TABLE;
use crate::error::MigrateResult;

/// Ledger of applied migration versions
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: PgPool,
    table: String,
}

impl Ledger {
    pub fn new(pool: PgPool) -> Self {
        Self::with_table(pool, MIGRATIONS_TABLE)
    }

    pub fn with_table(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Ensure migrations table exists
    pub async fn ensure_table(&self) -> MigrateResult<()> {
        sqlx::query(&self.create_table_sql())
            .execute(&self.pool)
            .await?;
        tracing::debug!(table = %self.table, "Migrations table ready");
        Ok(())
    }

    /// Applied versions, ascending
    pub async fn applied_versions(&self) -> MigrateResult<Vec<String>> {
        let sql = format!("SELECT version FROM {} ORDER BY version ASC", self.table);
        let versions = sqlx::query_scalar::<_, String>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(versions)
    }

    /// Applied rows with their timestamps, ascending by version
    pub async fn applied_records(&self) -> MigrateResult<Vec<AppliedRecord>> {
        let sql = format!(
            "SELECT version, applied_at FROM {} ORDER BY version ASC",
            self.table
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(AppliedRecord {
                version: row.try_get("version")?,
                applied_at: row.try_get("applied_at")?,
            });
        }
        Ok(records)
    }

    /// Drop every table in the `public` schema, the ledger included.
    ///
    /// [`Ledger::ensure_table`] must run again before the ledger is used.
    pub async fn drop_all_tables(&self) -> MigrateResult<()> {
        tracing::warn!("Dropping schema public");
        sqlx::Executor::execute(&self.pool, DROP_SCHEMA_SQL).await?;
        Ok(())
    }

    /// Record `version` as applied on the given connection
    pub(crate) async fn insert(&self, conn: &mut PgConnection, version: &str) -> MigrateResult<()> {
        let sql = format!("INSERT INTO {} (version) VALUES ($1)", self.table);
        sqlx::query(&sql).bind(version).execute(conn).await?;
        Ok(())
    }

    /// Remove the record for `version` on the given connection
    pub(crate) async fn remove(&self, conn: &mut PgConnection, version: &str) -> MigrateResult<()> {
        let sql = format!("DELETE FROM {} WHERE version = $1", self.table);
        sqlx::query(&sql).bind(version).execute(conn).await?;
        Ok(())
    }

    fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \
                version VARCHAR(14) PRIMARY KEY,\n    \
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP\n\
            )",
            self.table
        )
    }
}

const DROP_SCHEMA_SQL: &str = "DROP SCHEMA public CASCADE;\nCREATE SCHEMA public;";

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    fn lazy_ledger() -> Ledger {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgresql://localhost/siquil")
            .unwrap();
        Ledger::new(pool)
    }

    #[tokio::test]
    async fn test_create_table_sql() {
        let ledger = lazy_ledger();
        let sql = ledger.create_table_sql();

        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS __siquil_migrations"));
        assert!(sql.contains("version VARCHAR(14) PRIMARY KEY"));
        assert!(sql.contains("applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP"));
    }

    #[tokio::test]
    async fn test_custom_table_name() {
        let ledger = Ledger::with_table(lazy_ledger().pool, "schema_versions");
        assert_eq!(ledger.table(), "schema_versions");
        assert!(ledger
            .create_table_sql()
            .contains("CREATE TABLE IF NOT EXISTS schema_versions"));
    }
}
