use std::fmt;

/// Which side of the synchronization a process is on. Chosen once at
/// startup and fixed for the lifetime of a [`Synk`](crate::Synk).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyncRole {
    /// Originates writes and broadcasts them (server)
    Authority,
    /// Mirrors received writes, never pushes upstream (client)
    Replica,
}

impl SyncRole {
    pub fn invert(self) -> Self {
        match self {
            SyncRole::Authority => SyncRole::Replica,
            SyncRole::Replica => SyncRole::Authority,
        }
    }
}

impl fmt::Display for SyncRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncRole::Authority => f.write_str("authority"),
            SyncRole::Replica => f.write_str("replica"),
        }
    }
}
