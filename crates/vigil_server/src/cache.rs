//! In-memory TTL cache for ban statuses and the admin roster.
//!
//! Expiry is checked lazily on read; nothing sweeps in the background and
//! nothing is evicted except by overwrite. An expired entry is still
//! returned, flagged, because a stale value can be a usable last resort when
//! the backend is unreachable. Callers decide per operation whether to trust
//! it.

use std::collections::HashMap;
use std::hash::Hash;

use tokio::time::{Duration, Instant};

use vigil_shared::AdminRecord;

/// Expiring key/value map. Absence of a key means "never cached, query the
/// source of truth"; presence with `expired = true` means "stale but usable
/// as a fallback".
pub struct TtlCache<K, V> {
    entries: HashMap<K, (V, Instant)>,
}

impl<K: Eq + Hash, V> TtlCache<K, V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Returns the cached value and whether it has expired.
    pub fn get(&self, key: &K) -> Option<(&V, bool)> {
        self.entries
            .get(key)
            .map(|(value, expires)| (value, Instant::now() > *expires))
    }

    /// Unconditionally overwrites, resetting the expiry clock.
    pub fn set(&mut self, key: K, value: V, ttl: Duration) {
        self.entries.insert(key, (value, Instant::now() + ttl));
    }
}

impl<K: Eq + Hash, V> Default for TtlCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Single expiring slot, used for the process-wide roster snapshot.
pub struct TtlSlot<V> {
    entry: Option<(V, Instant)>,
}

impl<V> TtlSlot<V> {
    pub fn new() -> Self {
        Self { entry: None }
    }

    pub fn get(&self) -> Option<(&V, bool)> {
        self.entry
            .as_ref()
            .map(|(value, expires)| (value, Instant::now() > *expires))
    }

    pub fn set(&mut self, value: V, ttl: Duration) {
        self.entry = Some((value, Instant::now() + ttl));
    }
}

impl<V> Default for TtlSlot<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// The two datasets this subsystem caches: per-identity ban status, keyed by
/// canonical identity, and the resolved admin roster as one wholesale slot.
#[derive(Default)]
pub struct ModCache {
    players: TtlCache<String, bool>,
    admins: TtlSlot<Vec<AdminRecord>>,
}

impl ModCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached banned status of a player: `(banned, expired)`.
    pub fn player_status(&self, identity: &str) -> Option<(bool, bool)> {
        self.players
            .get(&identity.to_string())
            .map(|(banned, expired)| (*banned, expired))
    }

    pub fn set_player_status(&mut self, identity: &str, banned: bool, ttl: Duration) {
        self.players.set(identity.to_string(), banned, ttl);
    }

    pub fn admins(&self) -> Option<(&[AdminRecord], bool)> {
        self.admins
            .get()
            .map(|(roster, expired)| (roster.as_slice(), expired))
    }

    pub fn set_admins(&mut self, roster: Vec<AdminRecord>, ttl: Duration) {
        self.admins.set(roster, ttl);
    }
}
