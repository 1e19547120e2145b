//! Local queue store schema.
//!
//! Only the local store is migrated here; the primary store's schema is
//! owned by the web panel.

use sqlx::SqlitePool;
use tracing::info;

/// Run local-store schema setup. Called once when the store is opened.
pub async fn run_local_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    create_ban_queue_table(pool).await?;
    info!("Local queue store initialized");
    Ok(())
}

async fn create_ban_queue_table(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS ban_queue (
            dedup_key TEXT PRIMARY KEY,
            identity TEXT NOT NULL,
            ip TEXT NOT NULL,
            display_name TEXT NOT NULL,
            start_time INTEGER NOT NULL,
            duration_secs INTEGER NOT NULL,
            reason TEXT NOT NULL,
            actor_identity TEXT NOT NULL,
            actor_ip TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}
