use siquil_migrations::{MigrationConfig, MigrationRunner};

use super::{connect, report_failure};

pub async fn setup(config: &MigrationConfig) -> anyhow::Result<()> {
    let database = connect().await?;
    let result = MigrationRunner::new(config, &database).setup().await;
    database.close().await;

    let result = match result {
        Ok(result) => result,
        Err(error) => {
            report_failure(&error);
            return Err(error.into());
        }
    };

    if result.created_dir {
        println!(
            "Created migrations directory: {}",
            config.migrations_dir.display()
        );
    }
    println!("Migrations table ready");

    if result.applied.is_empty() {
        println!("No pending migrations");
        return Ok(());
    }

    for migration in &result.applied {
        println!("Applied migration: {}", migration);
    }
    println!("\nApplied {} migration(s)", result.applied.len());
    Ok(())
}

pub async fn reset(config: &MigrationConfig) -> anyhow::Result<()> {
    let database = connect().await?;
    println!("Dropping all tables...");
    let result = MigrationRunner::new(config, &database).reset().await;
    database.close().await;

    let applied = match result {
        Ok(applied) => applied,
        Err(error) => {
            report_failure(&error);
            return Err(error.into());
        }
    };

    println!("Migrations table recreated");
    if applied.is_empty() {
        println!("No migrations to run");
        return Ok(());
    }

    for migration in &applied {
        println!("Applied migration: {}", migration);
    }
    println!("\nApplied {} migration(s)", applied.len());
    Ok(())
}
