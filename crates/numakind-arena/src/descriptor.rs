//! Kind descriptors: a kind's name, arena map, and routing strategy.
//!
//! The name and arena map of a live kind are owned together by one
//! [`LiveKind`] value, so every teardown path (failed creation, destroy,
//! drop) releases both or neither.

use numakind_core::{ArenaId, DescriptorState, Partition};

use crate::strategy::RoutingStrategy;

/// Everything a live kind owns. Immutable once installed.
#[derive(Debug)]
pub(crate) struct LiveKind {
    pub(crate) name: String,
    pub(crate) arenas: Box<[ArenaId]>,
    pub(crate) partition: Partition,
    pub(crate) strategy: RoutingStrategy,
}

#[derive(Debug)]
enum KindState {
    Uninitialized,
    Live(LiveKind),
    Destroyed,
}

/// A memory kind as seen by the routing layer.
///
/// Starts [`Uninitialized`](DescriptorState::Uninitialized). Becomes
/// live through [`ArenaRouter::create`](crate::ArenaRouter::create)
/// and is released by [`ArenaRouter::destroy`](crate::ArenaRouter::destroy).
/// While live it is read-only, so any number of threads may allocate
/// through a shared reference.
#[derive(Debug)]
pub struct KindDescriptor {
    state: KindState,
}

impl KindDescriptor {
    /// A fresh, uninitialized descriptor.
    pub const fn new() -> Self {
        Self {
            state: KindState::Uninitialized,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DescriptorState {
        match self.state {
            KindState::Uninitialized => DescriptorState::Uninitialized,
            KindState::Live(_) => DescriptorState::Live,
            KindState::Destroyed => DescriptorState::Destroyed,
        }
    }

    /// Whether the descriptor can route allocations.
    pub fn is_live(&self) -> bool {
        matches!(self.state, KindState::Live(_))
    }

    /// Kind name; `None` unless live.
    pub fn name(&self) -> Option<&str> {
        self.live().map(|k| k.name.as_str())
    }

    /// Arena map; empty unless live.
    pub fn arena_ids(&self) -> &[ArenaId] {
        match self.live() {
            Some(kind) => &kind.arenas[..],
            None => &[],
        }
    }

    /// Length of the arena map.
    pub fn arena_count(&self) -> usize {
        self.arena_ids().len()
    }

    /// Routing strategy; `None` unless live.
    pub fn strategy(&self) -> Option<RoutingStrategy> {
        self.live().map(|k| k.strategy)
    }

    /// Partition the kind's arenas were registered with; `None` unless live.
    pub fn partition(&self) -> Option<Partition> {
        self.live().map(|k| k.partition)
    }

    pub(crate) fn live(&self) -> Option<&LiveKind> {
        match &self.state {
            KindState::Live(kind) => Some(kind),
            _ => None,
        }
    }

    /// Uninitialized → Live. Callers check the state beforehand.
    pub(crate) fn install(&mut self, kind: LiveKind) {
        debug_assert!(matches!(self.state, KindState::Uninitialized));
        self.state = KindState::Live(kind);
    }

    /// Live → Destroyed, handing back the owned resources.
    ///
    /// Returns `None` and leaves the state alone when not live.
    pub(crate) fn take_live(&mut self) -> Option<LiveKind> {
        if !self.is_live() {
            return None;
        }
        match std::mem::replace(&mut self.state, KindState::Destroyed) {
            KindState::Live(kind) => Some(kind),
            _ => None,
        }
    }
}

impl Default for KindDescriptor {
    fn default() -> Self {
        Self::new()
    }
}
