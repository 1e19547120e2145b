//! Moderation audit trail.
//!
//! Enforced ban hits are recorded back to the primary store so the web panel
//! can show blocked connection attempts. This is an audit trail, not
//! authoritative state: callers log a failure and move on, nothing retries.

use sqlx::SqlitePool;
use tracing::info;

use crate::backend::BackendError;

/// Record a connection attempt that was blocked by an active ban.
pub async fn log_blocked_connection(
    pool: &SqlitePool,
    prefix: &str,
    identity: &str,
    display_name: &str,
    server_id: i64,
    now: i64,
) -> Result<(), BackendError> {
    sqlx::query(&format!(
        "INSERT INTO {prefix}_banlog (logged_at, identity, display_name, server_id)
         VALUES (?1, ?2, ?3, ?4)"
    ))
    .bind(now)
    .bind(identity)
    .bind(display_name)
    .bind(server_id)
    .execute(pool)
    .await
    .map_err(|e| BackendError(format!("Failed to log blocked connection: {}", e)))?;

    info!("Logged blocked connection: {} ({})", display_name, identity);
    Ok(())
}
