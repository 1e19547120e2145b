//! Gateway to the primary relational store.
//!
//! Every read and write the subsystem performs against the authoritative
//! backend goes through [`BanBackend`]. The trait carries typed records, not
//! SQL: the concrete implementation lives in [`crate::database`], and tests
//! substitute an in-memory double. All failures surfaced here are treated as
//! transient and answered with a retry timer, never with a panic.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use vigil_shared::PendingBan;

/// A primary-store query failed: connection loss, timeout, or a driver
/// error. Always retriable.
#[derive(Debug, Clone, Error)]
#[error("backend query failed: {0}")]
pub struct BackendError(pub String);

/// Row from the group table, phase one of an admin reload.
#[derive(Debug, Clone)]
pub struct GroupRow {
    pub name: String,
    pub flags: String,
    pub immunity: i32,
}

/// Row from the per-server admin assignment query, phase two of an admin
/// reload. `group_name` is resolved against the phase-one map during the
/// merge.
#[derive(Debug, Clone)]
pub struct AdminRow {
    pub identity: String,
    pub flags: String,
    pub immunity: i32,
    pub group_name: Option<String>,
}

#[async_trait]
pub trait BanBackend: Send + Sync {
    /// Whether an active ban matches the connecting player: an identity ban,
    /// or an IP ban, that has not been removed and has not lapsed
    /// (duration 0 is permanent).
    async fn is_banned(&self, identity: &str, ip: &str, now: i64) -> Result<bool, BackendError>;

    async fn fetch_groups(&self) -> Result<Vec<GroupRow>, BackendError>;

    async fn fetch_admins(
        &self,
        server_id: i64,
        require_site_login: bool,
    ) -> Result<Vec<AdminRow>, BackendError>;

    async fn insert_ban(&self, ban: &PendingBan) -> Result<(), BackendError>;

    /// Id of the active, non-removed ban row matching the identity or IP.
    async fn find_active_ban(
        &self,
        identity: &str,
        ip: &str,
        now: i64,
    ) -> Result<Option<i64>, BackendError>;

    /// Marks a ban row removed with an administrator reference, timestamp,
    /// and reason.
    async fn mark_removed(
        &self,
        ban_id: i64,
        actor_identity: &str,
        reason: &str,
        now: i64,
    ) -> Result<(), BackendError>;

    /// Audit-trail record of an enforced ban hit. Best-effort: callers log
    /// failures and move on, this is not authoritative state.
    async fn log_blocked_connection(
        &self,
        identity: &str,
        display_name: &str,
        server_id: i64,
        now: i64,
    ) -> Result<(), BackendError>;
}

pub type DynBanBackend = Arc<dyn BanBackend>;
