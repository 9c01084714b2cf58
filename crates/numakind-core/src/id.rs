//! Strongly-typed identifiers for arenas and partitions.

use std::fmt;

/// Identifies an arena inside the backing allocator engine.
///
/// Values are only meaningful to the engine that issued them. An id held
/// in a kind's arena map was returned by a successful
/// [`ArenaEngine::register_arena`](crate::ArenaEngine::register_arena).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaId(pub u32);

impl ArenaId {
    /// The raw engine-level index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ArenaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ArenaId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Opaque per-kind configuration forwarded to the engine when an arena
/// is registered (typically a NUMA affinity or partition index).
///
/// This layer never interprets the value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Partition(pub u32);

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Partition {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
