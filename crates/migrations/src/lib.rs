//! # siquil-migrations
//!
//! Plain-SQL schema migrations for PostgreSQL.
//!
//! Discovers migration directories on disk, records applied versions in a
//! ledger table inside the database, and applies or reverts each migration in
//! its own transaction.
//!
//! ```rust,no_run
//! use siquil_migrations::{Database, MigrationConfig, MigrationRunner};
//!
//! # async fn example() -> siquil_migrations::MigrateResult<()> {
//! let config = MigrationConfig::load(&std::env::current_dir().unwrap())?;
//! let database = Database::from_env().await?;
//!
//! let result = MigrationRunner::new(&config, &database).run_pending().await;
//! database.close().await;
//!
//! for migration in result? {
//!     println!("applied {}", migration);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod migrations;

pub use config::{MigrationConfig, CONFIG_FILE, MIGRATIONS_TABLE};
pub use database::{mask_database_url, Database, DATABASE_URL_ENV};
pub use error::{MigrateError, MigrateResult};
pub use migrations::*;
