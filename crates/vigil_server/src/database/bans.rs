//! Ban queries against the primary store.
//!
//! A ban row matches a player either by identity or by IP. A row is active
//! while it has not been administratively removed and has not lapsed; a
//! zero duration is stored literally and never lapses.

use sqlx::{Row, SqlitePool};

use vigil_shared::PendingBan;

use crate::backend::BackendError;

/// Check whether an active ban matches the identity or IP.
pub async fn check_ban(
    pool: &SqlitePool,
    prefix: &str,
    identity: &str,
    ip: &str,
    now: i64,
) -> Result<bool, BackendError> {
    let row = sqlx::query(&format!(
        "SELECT 1 FROM {prefix}_bans
         WHERE ((identity <> '' AND identity = ?1) OR (ip <> '' AND ip = ?2))
           AND removed_at IS NULL
           AND (duration_secs = 0 OR start_time + duration_secs > ?3)
         LIMIT 1"
    ))
    .bind(identity)
    .bind(ip)
    .bind(now)
    .fetch_optional(pool)
    .await
    .map_err(|e| BackendError(format!("Failed to check ban status: {}", e)))?;

    Ok(row.is_some())
}

/// Insert a new ban row.
pub async fn insert_ban(
    pool: &SqlitePool,
    prefix: &str,
    ban: &PendingBan,
) -> Result<(), BackendError> {
    sqlx::query(&format!(
        "INSERT INTO {prefix}_bans
            (identity, ip, display_name, start_time, duration_secs, reason, actor_identity, actor_ip)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
    ))
    .bind(&ban.identity)
    .bind(&ban.ip)
    .bind(&ban.display_name)
    .bind(ban.start_time)
    .bind(ban.duration_secs)
    .bind(&ban.reason)
    .bind(&ban.actor_identity)
    .bind(&ban.actor_ip)
    .execute(pool)
    .await
    .map_err(|e| BackendError(format!("Failed to insert ban: {}", e)))?;

    Ok(())
}

/// Id of the newest active ban row matching the identity or IP.
pub async fn find_active_ban(
    pool: &SqlitePool,
    prefix: &str,
    identity: &str,
    ip: &str,
    now: i64,
) -> Result<Option<i64>, BackendError> {
    let row = sqlx::query(&format!(
        "SELECT id FROM {prefix}_bans
         WHERE ((identity <> '' AND identity = ?1) OR (ip <> '' AND ip = ?2))
           AND removed_at IS NULL
           AND (duration_secs = 0 OR start_time + duration_secs > ?3)
         ORDER BY id DESC
         LIMIT 1"
    ))
    .bind(identity)
    .bind(ip)
    .bind(now)
    .fetch_optional(pool)
    .await
    .map_err(|e| BackendError(format!("Failed to look up active ban: {}", e)))?;

    Ok(row.map(|r| r.get("id")))
}

/// Mark a ban row removed with an administrator reference, timestamp, and
/// reason.
pub async fn mark_removed(
    pool: &SqlitePool,
    prefix: &str,
    ban_id: i64,
    actor_identity: &str,
    reason: &str,
    now: i64,
) -> Result<(), BackendError> {
    sqlx::query(&format!(
        "UPDATE {prefix}_bans
            SET removed_at = ?1, removed_by = ?2, remove_reason = ?3
          WHERE id = ?4"
    ))
    .bind(now)
    .bind(actor_identity)
    .bind(reason)
    .bind(ban_id)
    .execute(pool)
    .await
    .map_err(|e| BackendError(format!("Failed to mark ban removed: {}", e)))?;

    Ok(())
}
