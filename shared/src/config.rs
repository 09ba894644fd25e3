use std::default::Default;

use crate::SyncRole;

/// Contains Config properties which will be used by [`Synk`](crate::Synk)
#[derive(Clone, Debug)]
pub struct SynkConfig {
    /// Which side of the synchronization this process is on. Role-restricted
    /// operations called on the other side fail with a usage error.
    pub role: SyncRole,
    /// Log a warning whenever a replica-side field is written locally. Such
    /// writes never reach the authority, which is usually a host bug.
    pub warn_on_replica_write: bool,
}

impl SynkConfig {
    pub fn authority() -> Self {
        Self {
            role: SyncRole::Authority,
            ..Self::default()
        }
    }

    pub fn replica() -> Self {
        Self {
            role: SyncRole::Replica,
            ..Self::default()
        }
    }
}

impl Default for SynkConfig {
    fn default() -> Self {
        Self {
            role: SyncRole::Authority,
            warn_on_replica_write: true,
        }
    }
}
