use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

/// Opaque identity of a host-defined object that owns synchronized fields.
///
/// Only ever used as a registry key; the core never inspects what it points
/// to. Both sides must agree on the key of a given instance, e.g. by carrying
/// a session id the host already has.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, PartialOrd, Ord)]
pub struct InstanceKey(u64);

impl InstanceKey {
    pub fn to_u64(&self) -> u64 {
        self.0
    }

    pub fn from_u64(value: u64) -> Self {
        InstanceKey(value)
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({})", self.0)
    }
}

/// Hands out [`InstanceKey`]s that are unique within this generator.
///
/// Keys are never recycled, so a registry entry that outlives its instance
/// can never be confused with a newer instance.
#[derive(Debug, Default)]
pub struct InstanceKeyGenerator {
    next: AtomicU64,
}

impl InstanceKeyGenerator {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    pub fn generate(&self) -> InstanceKey {
        InstanceKey(self.next.fetch_add(1, Ordering::Relaxed))
    }
}
