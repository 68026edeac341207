//! Database migration command.
//!
//! Migrations live in `crates/sync/migrations/` and are embedded at compile
//! time. The worker never runs them; this command is the only migration
//! path, so deploys stay explicit about schema changes.

use sqlx::PgPool;
use thiserror::Error;

/// Errors from the migrate command.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run sync database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the database is unreachable or a migration
/// fails.
pub async fn run() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    // Migrations only need the database; don't require the full worker env.
    let database_url = std::env::var("SYNC_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| MigrationError::MissingEnvVar("SYNC_DATABASE_URL"))?;

    tracing::info!("Connecting to sync database...");
    let pool = PgPool::connect(&database_url).await?;

    tracing::info!("Running sync migrations...");
    sqlx::migrate!("../sync/migrations").run(&pool).await?;

    tracing::info!("Sync migrations complete!");
    Ok(())
}
