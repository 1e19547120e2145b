use serde::{Deserialize, Serialize};

/// A ban write destined for the primary store.
///
/// The same record doubles as the correlation data carried through the async
/// insert and as the row persisted in the local retry queue when the insert
/// fails, so a replay always retries exactly what was first requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingBan {
    /// Canonical identity of the target. Empty for IP-only bans.
    pub identity: String,
    pub ip: String,
    pub display_name: String,
    /// Unix seconds when the ban takes effect.
    pub start_time: i64,
    /// Ban length in seconds. Zero means permanent.
    pub duration_secs: i64,
    pub reason: String,
    pub actor_identity: String,
    pub actor_ip: String,
}

impl PendingBan {
    /// Key used to collapse repeated pending writes for the same target.
    /// Identity when known, otherwise the IP in its own namespace.
    pub fn dedup_key(&self) -> String {
        if self.identity.is_empty() {
            format!("ip:{}", self.ip)
        } else {
            self.identity.clone()
        }
    }

    pub fn is_permanent(&self) -> bool {
        self.duration_secs == 0
    }

    /// Unix seconds when the ban lapses. Meaningful only for timed bans;
    /// permanent bans store a literal zero duration.
    pub fn ends(&self) -> i64 {
        self.start_time + self.duration_secs
    }
}

/// Synchronous decision for a connection attempt, made from cached state
/// only. `Allow` covers the unknown case: enforcement for a banned player
/// whose status is still being looked up happens by forcible disconnect once
/// the lookup resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionVerdict {
    Allow,
    Deny { reason: String },
}

impl ConnectionVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, ConnectionVerdict::Allow)
    }
}
