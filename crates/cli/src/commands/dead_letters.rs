//! Dead-letter inspection command.
//!
//! Dead letters are terminal: the queue never retries them, so recovery is
//! always a human decision. This command surfaces the stored snapshots and
//! failure context so an operator can fix the underlying data and re-enter
//! the work through the normal intake paths.

use slabworks_sync::config::SyncConfig;
use slabworks_sync::db::{self, dead_letter};

/// List the most recent dead-letter entries.
///
/// # Errors
///
/// Returns an error if configuration loading or the database query fails.
pub async fn run(limit: i64) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = SyncConfig::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;

    let entries = dead_letter::list_recent(&pool, limit).await?;

    if entries.is_empty() {
        tracing::info!("No dead-letter entries");
        return Ok(());
    }

    #[allow(clippy::print_stdout)]
    for entry in entries {
        println!(
            "{}  queue_item={}  created_at={}",
            entry.id, entry.queue_item_id, entry.created_at
        );
        println!("  snapshot: {}", entry.item_snapshot);
        println!("  failure:  {}", entry.failure_context);
    }

    Ok(())
}
