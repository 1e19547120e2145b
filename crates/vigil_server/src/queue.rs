//! Durable retry queue for ban writes that failed to reach the primary
//! store.
//!
//! The queue is keyed by the ban's dedup key and has upsert semantics: a
//! newer pending write for the same target replaces the older one, so a
//! flapping backend can never grow the queue without bound and a replay
//! always carries the latest intent. Rows live in a local SQLite database
//! owned exclusively by this module, independent of the primary backend, so
//! they survive process restarts.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use thiserror::Error;

use vigil_shared::PendingBan;

/// The local queue store itself failed. There is no further fallback tier:
/// callers log this as an operational error and do not retry the enqueue.
#[derive(Debug, Clone, Error)]
#[error("local queue store failed: {0}")]
pub struct QueueError(pub String);

#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Inserts or replaces the pending write for this ban's dedup key.
    async fn upsert(&self, ban: &PendingBan) -> Result<(), QueueError>;

    /// Every pending write, for a drain pass.
    async fn load_all(&self) -> Result<Vec<PendingBan>, QueueError>;

    /// Drops the pending write for a key. Missing keys are a no-op.
    async fn delete(&self, dedup_key: &str) -> Result<(), QueueError>;
}

pub type DynQueueStore = Arc<dyn QueueStore>;

/// Queue store over the local SQLite database.
pub struct SqliteQueueStore {
    pool: SqlitePool,
}

impl SqliteQueueStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn upsert(&self, ban: &PendingBan) -> Result<(), QueueError> {
        sqlx::query(
            "INSERT INTO ban_queue (dedup_key, identity, ip, display_name, start_time, duration_secs, reason, actor_identity, actor_ip)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(dedup_key) DO UPDATE SET
                identity = excluded.identity,
                ip = excluded.ip,
                display_name = excluded.display_name,
                start_time = excluded.start_time,
                duration_secs = excluded.duration_secs,
                reason = excluded.reason,
                actor_identity = excluded.actor_identity,
                actor_ip = excluded.actor_ip",
        )
        .bind(ban.dedup_key())
        .bind(&ban.identity)
        .bind(&ban.ip)
        .bind(&ban.display_name)
        .bind(ban.start_time)
        .bind(ban.duration_secs)
        .bind(&ban.reason)
        .bind(&ban.actor_identity)
        .bind(&ban.actor_ip)
        .execute(&self.pool)
        .await
        .map_err(|e| QueueError(format!("failed to queue ban write: {}", e)))?;

        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<PendingBan>, QueueError> {
        let rows = sqlx::query(
            "SELECT identity, ip, display_name, start_time, duration_secs, reason, actor_identity, actor_ip
             FROM ban_queue",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| QueueError(format!("failed to read ban queue: {}", e)))?;

        Ok(rows
            .into_iter()
            .map(|row| PendingBan {
                identity: row.get("identity"),
                ip: row.get("ip"),
                display_name: row.get("display_name"),
                start_time: row.get("start_time"),
                duration_secs: row.get("duration_secs"),
                reason: row.get("reason"),
                actor_identity: row.get("actor_identity"),
                actor_ip: row.get("actor_ip"),
            })
            .collect())
    }

    async fn delete(&self, dedup_key: &str) -> Result<(), QueueError> {
        sqlx::query("DELETE FROM ban_queue WHERE dedup_key = ?1")
            .bind(dedup_key)
            .execute(&self.pool)
            .await
            .map_err(|e| QueueError(format!("failed to remove queued ban write: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database;

    fn pending(identity: &str, reason: &str) -> PendingBan {
        PendingBan {
            identity: identity.to_string(),
            ip: "10.0.0.1".to_string(),
            display_name: "Player".to_string(),
            start_time: 1000,
            duration_secs: 600,
            reason: reason.to_string(),
            actor_identity: "STEAM_0:1:999".to_string(),
            actor_ip: "10.0.0.2".to_string(),
        }
    }

    async fn memory_store() -> SqliteQueueStore {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to open in-memory queue store");
        database::migrations::run_local_migrations(&pool)
            .await
            .expect("Failed to run local migrations");
        SqliteQueueStore::new(pool)
    }

    #[tokio::test]
    async fn test_upsert_then_load_round_trips() {
        let store = memory_store().await;
        let ban = pending("STEAM_0:1:234", "cheating");

        store.upsert(&ban).await.unwrap();

        let rows = store.load_all().await.unwrap();
        assert_eq!(rows, vec![ban]);
    }

    #[tokio::test]
    async fn test_second_upsert_replaces_first() {
        let store = memory_store().await;

        store.upsert(&pending("STEAM_0:1:234", "first")).await.unwrap();
        store.upsert(&pending("STEAM_0:1:234", "second")).await.unwrap();

        let rows = store.load_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].reason, "second");
    }

    #[tokio::test]
    async fn test_distinct_keys_accumulate() {
        let store = memory_store().await;

        store.upsert(&pending("STEAM_0:1:234", "a")).await.unwrap();
        store.upsert(&pending("STEAM_0:1:567", "b")).await.unwrap();
        // IP-only ban lands in its own namespace.
        store.upsert(&pending("", "c")).await.unwrap();

        assert_eq!(store.load_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_delete_removes_only_the_key() {
        let store = memory_store().await;

        store.upsert(&pending("STEAM_0:1:234", "a")).await.unwrap();
        store.upsert(&pending("STEAM_0:1:567", "b")).await.unwrap();

        store.delete("STEAM_0:1:234").await.unwrap();

        let rows = store.load_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].identity, "STEAM_0:1:567");
    }

    #[tokio::test]
    async fn test_delete_missing_key_is_noop() {
        let store = memory_store().await;
        store.delete("STEAM_0:1:234").await.unwrap();
        assert!(store.load_all().await.unwrap().is_empty());
    }
}
