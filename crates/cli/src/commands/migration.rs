use siquil_migrations::{MigrationConfig, MigrationRepository, MigrationRunner, MigrationStatus};

use super::{connect, report_failure};

pub async fn generate(config: &MigrationConfig, name: &str) -> anyhow::Result<()> {
    let migration = MigrationRepository::new(&config.migrations_dir).generate(name)?;
    println!("Created migration: {}", migration.id());
    Ok(())
}

pub async fn run(config: &MigrationConfig) -> anyhow::Result<()> {
    let database = connect().await?;
    let result = MigrationRunner::new(config, &database).run_pending().await;
    database.close().await;

    let applied = match result {
        Ok(applied) => applied,
        Err(error) => {
            report_failure(&error);
            return Err(error.into());
        }
    };

    if applied.is_empty() {
        println!("No pending migrations");
        return Ok(());
    }

    for migration in &applied {
        println!("Applied migration: {}", migration);
    }
    println!("\nApplied {} migration(s)", applied.len());
    Ok(())
}

pub async fn revert(config: &MigrationConfig) -> anyhow::Result<()> {
    let database = connect().await?;
    let result = MigrationRunner::new(config, &database).revert_last().await;
    database.close().await;

    match result? {
        Some(migration) => println!("Reverted migration: {}", migration),
        None => println!("No migrations to revert"),
    }
    Ok(())
}

pub async fn status(config: &MigrationConfig) -> anyhow::Result<()> {
    let database = connect().await?;
    let result = MigrationRunner::new(config, &database).status().await;
    database.close().await;
    let statuses = result?;

    println!("Migration Status:");
    println!("================");

    if statuses.is_empty() {
        println!("No migrations found");
        return Ok(());
    }

    let mut pending = 0;
    for status in &statuses {
        match status {
            MigrationStatus::Applied {
                migration,
                applied_at,
            } => println!("  [applied] {} ({})", migration, applied_at),
            MigrationStatus::Pending(migration) => {
                pending += 1;
                println!("  [pending] {}", migration);
            }
            MigrationStatus::Orphaned(record) => println!(
                "  [missing] {} (applied {}, directory not found)",
                record.version, record.applied_at
            ),
        }
    }
    println!("\n{} pending migration(s)", pending);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_generate_writes_into_configured_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config =
            MigrationConfig::default().with_migrations_dir(temp_dir.path().join("db/migrations"));

        generate(&config, "add_users").await.unwrap();

        let migrations = MigrationRepository::new(&config.migrations_dir).list().unwrap();
        assert_eq!(migrations.len(), 1);
        assert_eq!(migrations[0].name, "add_users");
        assert!(migrations[0].path.join("up.sql").is_file());
        assert!(migrations[0].path.join("down.sql").is_file());
    }

    #[tokio::test]
    async fn test_generate_rejects_path_in_name() {
        let temp_dir = TempDir::new().unwrap();
        let config = MigrationConfig::default().with_migrations_dir(temp_dir.path());

        let err = generate(&config, "../escape").await.unwrap_err();
        assert!(err.to_string().contains("Invalid migration name"));
    }
}
