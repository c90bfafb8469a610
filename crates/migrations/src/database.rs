//! Database handle
//!
//! A [`Database`] owns the connection pool for one command invocation. It is
//! passed explicitly to every engine operation and must be closed with
//! [`Database::close`] before the process exits.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use url::Url;

use crate::error::{MigrateError, MigrateResult};

/// Environment variable holding the connection string
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Connection pool for a single command invocation
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Wrap an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using the connection string in `DATABASE_URL`
    pub async fn from_env() -> MigrateResult<Self> {
        let database_url = std::env::var(DATABASE_URL_ENV).map_err(|_| {
            MigrateError::Connection(format!(
                "{} environment variable is not set",
                DATABASE_URL_ENV
            ))
        })?;
        Self::connect(&database_url).await
    }

    /// Connect to the given database URL
    pub async fn connect(database_url: &str) -> MigrateResult<Self> {
        tracing::debug!(url = %mask_database_url(database_url), "Connecting to database");

        // One connection holds the advisory lock while another runs migrations.
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await
            .map_err(|e| MigrateError::Connection(format!("Failed to connect to database: {}", e)))?;

        Ok(Self::new(pool))
    }

    /// Get the database pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close every connection in the pool
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("Database pool closed");
    }
}

/// Replace the password in a connection string for display
pub fn mask_database_url(url_str: &str) -> String {
    match Url::parse(url_str) {
        Ok(mut url) => {
            if url.password().is_some() && url.set_password(Some("****")).is_err() {
                return "<redacted>".to_string();
            }
            url.to_string()
        }
        Err(_) => url_str.to_string(),
    }
}
