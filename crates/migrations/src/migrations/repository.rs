//! Migration Repository - File system operations for migrations
//!
//! Enumerates migration directories named `<14-digit-version>_<name>`,
//! creates new ones, and works out which of them are pending or last applied
//! given the versions recorded in the ledger.

use chrono::{Local, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::definitions::{Migration, DOWN_SCRIPT, UP_SCRIPT};
use crate::error::{MigrateError, MigrateResult};

static MIGRATION_DIR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{14})_(.+)$").expect("migration directory pattern is valid")
});

/// Format of the version prefix, local wall-clock time
pub const VERSION_FORMAT: &str = "%Y%m%d%H%M%S";

const UP_TEMPLATE: &str = "-- Your SQL goes here\n";
const DOWN_TEMPLATE: &str = "-- This file should undo anything in `up.sql`\n";

/// Disk view of one migrations directory
#[derive(Debug, Clone)]
pub struct MigrationRepository {
    dir: PathBuf,
}

impl MigrationRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// All migrations on disk, ascending by version
    pub fn list(&self) -> MigrateResult<Vec<Migration>> {
        list_migrations(&self.dir)
    }

    /// Create the migrations directory if it does not exist yet.
    /// Returns `true` when it was created.
    pub fn ensure_dir(&self) -> MigrateResult<bool> {
        if self.dir.is_dir() {
            return Ok(false);
        }
        fs::create_dir_all(&self.dir).map_err(|e| MigrateError::io(&self.dir, e))?;
        Ok(true)
    }

    /// Create a new migration stamped with the current local time
    pub fn generate(&self, name: &str) -> MigrateResult<Migration> {
        self.generate_at(name, Local::now().naive_local())
    }

    /// Create a new migration stamped with `timestamp`
    pub fn generate_at(&self, name: &str, timestamp: NaiveDateTime) -> MigrateResult<Migration> {
        if name.trim().is_empty() || name.contains(['/', '\\']) {
            return Err(MigrateError::InvalidName(name.to_string()));
        }

        let migration = Migration {
            version: timestamp.format(VERSION_FORMAT).to_string(),
            name: name.to_string(),
            path: PathBuf::new(),
        };
        let id = migration.id();
        // The directory must list back under the same version and name.
        if !MIGRATION_DIR_PATTERN.is_match(&id) {
            return Err(MigrateError::InvalidName(name.to_string()));
        }

        self.ensure_dir()?;
        let path = self.dir.join(id);
        let migration = Migration { path, ..migration };

        fs::create_dir(&migration.path).map_err(|e| MigrateError::io(&migration.path, e))?;
        for (script, template) in [(UP_SCRIPT, UP_TEMPLATE), (DOWN_SCRIPT, DOWN_TEMPLATE)] {
            let script_path = migration.path.join(script);
            fs::write(&script_path, template).map_err(|e| MigrateError::io(&script_path, e))?;
        }

        tracing::info!(migration = %migration, "Generated migration");
        Ok(migration)
    }
}

/// Enumerate migration directories under `dir`, ascending by version.
///
/// A missing directory yields no migrations. Plain files and directories whose
/// name does not match `<14 digits>_<name>` are skipped.
pub fn list_migrations(dir: &Path) -> MigrateResult<Vec<Migration>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|e| MigrateError::io(dir, e))?;
    let mut migrations = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| MigrateError::io(dir, e))?;
        let file_type = entry.file_type().map_err(|e| MigrateError::io(entry.path(), e))?;
        if !file_type.is_dir() {
            continue;
        }

        let file_name = entry.file_name();
        let Some(dir_name) = file_name.to_str() else {
            continue;
        };
        let Some(captures) = MIGRATION_DIR_PATTERN.captures(dir_name) else {
            tracing::trace!(entry = dir_name, "Skipping non-migration directory");
            continue;
        };

        migrations.push(Migration {
            version: captures[1].to_string(),
            name: captures[2].to_string(),
            path: entry.path(),
        });
    }

    migrations.sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.name.cmp(&b.name)));
    Ok(migrations)
}

/// Migrations on disk whose version is not in `applied`, keeping disk order
pub fn pending(all: Vec<Migration>, applied: &[String]) -> Vec<Migration> {
    let applied: HashSet<&str> = applied.iter().map(String::as_str).collect();
    all.into_iter()
        .filter(|m| !applied.contains(m.version.as_str()))
        .collect()
}

/// The migration matching the greatest applied version, if it is still on disk
pub fn last_applied(all: Vec<Migration>, applied: &[String]) -> Option<Migration> {
    let last_version = applied.iter().max()?;
    let found = all.into_iter().find(|m| &m.version == last_version);
    if found.is_none() {
        tracing::warn!(
            version = %last_version,
            "Last applied migration has no directory on disk; nothing to revert"
        );
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn mkdir(root: &Path, name: &str) {
        fs::create_dir_all(root.join(name)).unwrap();
    }

    fn migration(version: &str) -> Migration {
        Migration {
            version: version.to_string(),
            name: format!("m{}", version),
            path: PathBuf::from(version),
        }
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let migrations = list_migrations(&temp_dir.path().join("nope")).unwrap();
        assert!(migrations.is_empty());
    }

    #[test]
    fn test_list_sorts_by_version() {
        let temp_dir = TempDir::new().unwrap();
        mkdir(temp_dir.path(), "20240301000000_third");
        mkdir(temp_dir.path(), "20240101000000_first");
        mkdir(temp_dir.path(), "20240201000000_second");

        let migrations = list_migrations(temp_dir.path()).unwrap();
        let versions: Vec<_> = migrations.iter().map(|m| m.version.as_str()).collect();
        assert_eq!(
            versions,
            ["20240101000000", "20240201000000", "20240301000000"]
        );
        assert_eq!(migrations[0].name, "first");
        assert_eq!(
            migrations[0].path,
            temp_dir.path().join("20240101000000_first")
        );
    }

    #[test]
    fn test_list_skips_non_matching_entries() {
        let temp_dir = TempDir::new().unwrap();
        mkdir(temp_dir.path(), "20240101000000_valid");
        mkdir(temp_dir.path(), "2024010100000_short");
        mkdir(temp_dir.path(), "20240101000000");
        mkdir(temp_dir.path(), "20240101000000_");
        mkdir(temp_dir.path(), "notes");
        mkdir(temp_dir.path(), "x20240101000000_prefixed");
        fs::write(temp_dir.path().join("20240102000000_file"), "").unwrap();

        let migrations = list_migrations(temp_dir.path()).unwrap();
        assert_eq!(migrations.len(), 1);
        assert_eq!(migrations[0].id(), "20240101000000_valid");
    }

    #[test]
    fn test_name_keeps_underscores() {
        let temp_dir = TempDir::new().unwrap();
        mkdir(temp_dir.path(), "20240101000000_create_users_table");

        let migrations = list_migrations(temp_dir.path()).unwrap();
        assert_eq!(migrations[0].name, "create_users_table");
    }

    #[test]
    fn test_pending_is_disk_minus_applied() {
        let all = vec![
            migration("20240101000000"),
            migration("20240102000000"),
            migration("20240103000000"),
            migration("20240104000000"),
        ];
        let applied = vec![
            "20240101000000".to_string(),
            "20240102000000".to_string(),
            "20240103000000".to_string(),
        ];

        let pending = pending(all, &applied);
        assert_eq!(pending, vec![migration("20240104000000")]);
    }

    #[test]
    fn test_pending_fills_gaps_in_order() {
        let all = vec![
            migration("20240101000000"),
            migration("20240102000000"),
            migration("20240103000000"),
        ];
        let applied = vec!["20240102000000".to_string(), "20231231000000".to_string()];

        let versions: Vec<_> = pending(all, &applied)
            .into_iter()
            .map(|m| m.version)
            .collect();
        assert_eq!(versions, ["20240101000000", "20240103000000"]);
    }

    #[test]
    fn test_last_applied_picks_greatest_version() {
        let all = vec![
            migration("20240101000000"),
            migration("20240102000000"),
            migration("20240103000000"),
            migration("20240104000000"),
        ];
        let applied = vec![
            "20240101000000".to_string(),
            "20240103000000".to_string(),
            "20240102000000".to_string(),
        ];

        assert_eq!(
            last_applied(all, &applied),
            Some(migration("20240103000000"))
        );
    }

    #[test]
    fn test_last_applied_missing_on_disk() {
        let all = vec![migration("20240101000000")];
        let applied = vec!["20240101000000".to_string(), "20240102000000".to_string()];

        assert_eq!(last_applied(all, &applied), None);
    }

    #[test]
    fn test_last_applied_empty_ledger() {
        assert_eq!(last_applied(vec![migration("20240101000000")], &[]), None);
    }

    #[test]
    fn test_generate_creates_directory_and_scripts() {
        let temp_dir = TempDir::new().unwrap();
        let repository = MigrationRepository::new(temp_dir.path().join("migrations"));
        let timestamp = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(7, 8, 9)
            .unwrap();

        let migration = repository.generate_at("add_users", timestamp).unwrap();
        assert_eq!(migration.version, "20240305070809");
        assert_eq!(
            migration.path,
            temp_dir.path().join("migrations/20240305070809_add_users")
        );

        let up = fs::read_to_string(migration.path.join("up.sql")).unwrap();
        let down = fs::read_to_string(migration.path.join("down.sql")).unwrap();
        assert!(!up.trim().is_empty() && up.lines().all(|l| l.starts_with("--")));
        assert!(!down.trim().is_empty() && down.lines().all(|l| l.starts_with("--")));

        let listed = repository.list().unwrap();
        assert_eq!(listed, vec![migration]);
    }

    #[test]
    fn test_generate_uses_current_time() {
        let temp_dir = TempDir::new().unwrap();
        let repository = MigrationRepository::new(temp_dir.path());

        let migration = repository.generate("add_users").unwrap();
        assert_eq!(migration.version.len(), 14);
        assert!(migration.version.bytes().all(|b| b.is_ascii_digit()));
        assert!(migration
            .path
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .ends_with("_add_users"));
    }

    #[test]
    fn test_generate_rejects_unusable_names() {
        let temp_dir = TempDir::new().unwrap();
        let repository = MigrationRepository::new(temp_dir.path());

        for name in ["", "  ", "a/b", "a\\b"] {
            let err = repository.generate(name).unwrap_err();
            assert!(matches!(err, MigrateError::InvalidName(_)));
        }
    }

    #[test]
    fn test_generate_rejects_name_with_newline() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("migrations");
        let repository = MigrationRepository::new(&root);

        let err = repository.generate("a\nb").unwrap_err();
        assert!(matches!(err, MigrateError::InvalidName(_)));
        assert!(!root.exists());
        assert!(repository.list().unwrap().is_empty());
    }

    #[test]
    fn test_generate_refuses_existing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let repository = MigrationRepository::new(temp_dir.path());
        let timestamp = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        repository.generate_at("init", timestamp).unwrap();
        let err = repository.generate_at("init", timestamp).unwrap_err();
        assert!(matches!(err, MigrateError::Io { .. }));
    }
}
