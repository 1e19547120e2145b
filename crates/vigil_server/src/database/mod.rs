//! Database module - primary-store gateway and local-store setup.
//!
//! ## Module Structure
//! - `migrations` - Local queue store schema setup
//! - `bans` - Ban lookups, inserts, and removals against the primary store
//! - `admins` - Group and per-server admin queries
//!
//! The primary store's schema belongs to the web panel; this module only
//! reads and writes the fields the subsystem needs, always through bound
//! parameters. The local store's schema is owned here.

pub mod admins;
pub mod bans;
pub(crate) mod migrations;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use vigil_shared::PendingBan;

use crate::audit;
use crate::backend::{AdminRow, BackendError, BanBackend, GroupRow};

/// Opens the primary store. `VIGIL_DATABASE_PATH` overrides the configured
/// path.
pub async fn connect_primary(path: &str) -> Result<SqlitePool, sqlx::Error> {
    let path = std::env::var("VIGIL_DATABASE_PATH").unwrap_or_else(|_| path.to_string());
    SqlitePool::connect(&connection_string(&path)).await
}

/// Opens the local queue store and sets up its schema.
/// `VIGIL_QUEUE_PATH` overrides the configured path.
///
/// One connection: the queue sees little traffic, and an in-memory store
/// lives and dies with its connection.
pub async fn connect_local(path: &str) -> Result<SqlitePool, sqlx::Error> {
    let path = std::env::var("VIGIL_QUEUE_PATH").unwrap_or_else(|_| path.to_string());
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&connection_string(&path))
        .await?;
    migrations::run_local_migrations(&pool).await?;
    Ok(pool)
}

fn connection_string(path: &str) -> String {
    if path == ":memory:" {
        "sqlite::memory:".to_string()
    } else {
        format!("sqlite:{}?mode=rwc", path)
    }
}

/// [`BanBackend`] over the primary store.
///
/// The table prefix comes from validated configuration; values are always
/// bound, never interpolated.
pub struct SqlBackend {
    pool: SqlitePool,
    prefix: String,
}

impl SqlBackend {
    pub fn new(pool: SqlitePool, table_prefix: impl Into<String>) -> Self {
        Self {
            pool,
            prefix: table_prefix.into(),
        }
    }
}

#[async_trait]
impl BanBackend for SqlBackend {
    async fn is_banned(&self, identity: &str, ip: &str, now: i64) -> Result<bool, BackendError> {
        bans::check_ban(&self.pool, &self.prefix, identity, ip, now).await
    }

    async fn fetch_groups(&self) -> Result<Vec<GroupRow>, BackendError> {
        admins::fetch_groups(&self.pool, &self.prefix).await
    }

    async fn fetch_admins(
        &self,
        server_id: i64,
        require_site_login: bool,
    ) -> Result<Vec<AdminRow>, BackendError> {
        admins::fetch_admins(&self.pool, &self.prefix, server_id, require_site_login).await
    }

    async fn insert_ban(&self, ban: &PendingBan) -> Result<(), BackendError> {
        bans::insert_ban(&self.pool, &self.prefix, ban).await
    }

    async fn find_active_ban(
        &self,
        identity: &str,
        ip: &str,
        now: i64,
    ) -> Result<Option<i64>, BackendError> {
        bans::find_active_ban(&self.pool, &self.prefix, identity, ip, now).await
    }

    async fn mark_removed(
        &self,
        ban_id: i64,
        actor_identity: &str,
        reason: &str,
        now: i64,
    ) -> Result<(), BackendError> {
        bans::mark_removed(&self.pool, &self.prefix, ban_id, actor_identity, reason, now).await
    }

    async fn log_blocked_connection(
        &self,
        identity: &str,
        display_name: &str,
        server_id: i64,
        now: i64,
    ) -> Result<(), BackendError> {
        audit::log_blocked_connection(&self.pool, &self.prefix, identity, display_name, server_id, now)
            .await
    }
}
