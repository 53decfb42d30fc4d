use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of a graph entity (module, slot, call, group, interface slot).
///
/// All entities of one graph draw from the same counter, so a `Uid` is
/// unambiguous across entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Uid(u64);

impl Uid {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
impl Uid {
    pub(crate) fn from_raw(value: u64) -> Self {
        Self(value)
    }
}

const MAX_UID: u64 = i64::MAX as u64;

/// Monotonic identifier source. IDs start at 0 and are never reused.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> Uid {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        debug_assert!(id <= MAX_UID, "identifier space exhausted");
        Uid(id)
    }

    /// Number of IDs handed out so far.
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}
