//! Services the host game server provides to this subsystem.
//!
//! The host owns the connection registry, the live admin registry, the
//! identity format, and the actual kick mechanism; this core only calls
//! them. The registry is write-only from here: admins are registered, never
//! read back.

use std::sync::Arc;

use vigil_shared::AdminRecord;

/// A connected player as seen by the host's connection registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveConnection {
    pub identity: String,
    pub ip: String,
    pub display_name: String,
}

pub trait HostServices: Send + Sync {
    /// Canonicalizes a raw platform login token. `None` means the token is
    /// malformed and cannot name a player.
    fn normalize_identity(&self, raw: &str) -> Option<String>;

    /// The live connection for a canonical identity, if the player is still
    /// on the server.
    fn find_live_connection(&self, identity: &str) -> Option<LiveConnection>;

    /// Resolves a command target by display name or identity.
    fn resolve_target(&self, query: &str) -> Option<LiveConnection>;

    fn force_disconnect(&self, identity: &str, message: &str);

    fn register_admin(&self, admin: &AdminRecord);
}

pub type DynHostServices = Arc<dyn HostServices>;
