use serde::{Deserialize, Serialize};

// ============================================================================
// ACCESS FLAGS
// ============================================================================
// Capability flags are single characters; an admin's flag string is the set
// of capabilities granted to them. Group flags are merged in by simple
// concatenation, so duplicates are tolerated and membership is what counts.

/// Generic admin access.
pub const FLAG_GENERIC: char = 'b';

/// Permission to kick players.
pub const FLAG_KICK: char = 'c';

/// Permission to ban players.
pub const FLAG_BAN: char = 'd';

/// Permission to remove bans. Also required for permanent bans.
pub const FLAG_UNBAN: char = 'e';

/// Remote console access.
pub const FLAG_RCON: char = 'm';

/// Full access. Implies every other flag.
pub const FLAG_ROOT: char = 'z';

/// A set of capability-flag characters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessFlags(String);

impl AccessFlags {
    pub fn new(flags: impl Into<String>) -> Self {
        Self(flags.into())
    }

    /// Whether the set grants the given capability. Root grants everything.
    pub fn has(&self, flag: char) -> bool {
        self.0.contains(flag) || self.0.contains(FLAG_ROOT)
    }

    /// Union with another set. Duplicates are kept; containment is what
    /// authorization checks look at.
    pub fn merge(&mut self, other: &AccessFlags) {
        self.0.push_str(&other.0);
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for AccessFlags {
    fn from(flags: &str) -> Self {
        Self(flags.to_string())
    }
}

impl std::fmt::Display for AccessFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
