//! Kind and engine configuration.

use numakind_core::{KindError, Partition};

use crate::strategy::RoutingStrategy;

/// Parameters for creating one kind.
///
/// Equivalent to the positional arguments of
/// [`ArenaRouter::create`](crate::ArenaRouter::create); useful when kinds
/// are declared up front and created later.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KindConfig {
    /// Kind name. Must be non-empty.
    pub name: String,
    /// How allocations are routed to arenas.
    pub strategy: RoutingStrategy,
    /// Forwarded to the engine for every arena the kind registers.
    /// Default: `Partition(0)`.
    pub partition: Partition,
}

impl KindConfig {
    /// Config with the default partition.
    pub fn new(name: impl Into<String>, strategy: RoutingStrategy) -> Self {
        Self {
            name: name.into(),
            strategy,
            partition: Partition::default(),
        }
    }

    /// Replace the partition.
    pub fn with_partition(mut self, partition: Partition) -> Self {
        self.partition = partition;
        self
    }

    /// Check the config before any resources are touched.
    pub fn validate(&self) -> Result<(), KindError> {
        if self.name.is_empty() {
            return Err(KindError::EmptyName);
        }
        Ok(())
    }
}

/// Configuration for [`HeapEngine`](crate::HeapEngine).
#[derive(Clone, Debug)]
pub struct HeapConfig {
    /// Maximum number of arenas, counting the default arena.
    ///
    /// Registrations beyond this fail with `EngineError::ArenaLimit`.
    /// Default: 4096.
    pub max_arenas: usize,
}

impl HeapConfig {
    /// Default arena limit.
    pub const DEFAULT_MAX_ARENAS: usize = 4096;

    /// Arena limit actually enforced.
    ///
    /// Clamped to `[1, u32::MAX]`: the default arena always exists and
    /// ids are 32-bit.
    pub fn resolved_max_arenas(&self) -> usize {
        self.max_arenas.clamp(1, u32::MAX as usize)
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            max_arenas: Self::DEFAULT_MAX_ARENAS,
        }
    }
}
