use serde::{Deserialize, Serialize};

use crate::flags::AccessFlags;

/// A resolved admin user as published to the host's live registry.
///
/// Flags and immunity already include everything inherited from the admin's
/// group: flags are the union of personal and group flags, immunity is the
/// maximum of personal and group immunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRecord {
    pub identity: String,
    pub flags: AccessFlags,
    pub immunity: i32,
}

impl AdminRecord {
    pub fn new(identity: impl Into<String>, flags: impl Into<String>, immunity: i32) -> Self {
        Self {
            identity: identity.into(),
            flags: AccessFlags::new(flags),
            immunity,
        }
    }

    /// Fold a group's grants into this record.
    pub fn absorb_group(&mut self, group_flags: &AccessFlags, group_immunity: i32) {
        self.flags.merge(group_flags);
        self.immunity = self.immunity.max(group_immunity);
    }
}
