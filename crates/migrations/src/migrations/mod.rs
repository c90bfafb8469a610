//! Migration System
//!
//! Migrations live on disk as `<version>_<name>/{up.sql,down.sql}` and are
//! tracked in a ledger table inside the target database.

pub mod definitions;
pub mod executor;
pub mod ledger;
pub mod lock;
pub mod repository;
pub mod runner;

pub use definitions::*;
pub use executor::Executor;
pub use ledger::Ledger;
pub use lock::MigrationLock;
pub use repository::{list_migrations, MigrationRepository};
pub use runner::{MigrationRunner, SetupResult};
