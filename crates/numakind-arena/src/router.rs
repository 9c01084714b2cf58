//! The routing handle tying a backing engine to a CPU topology.

use numakind_core::{ArenaEngine, ArenaId, KindError, Topology};

use crate::descriptor::KindDescriptor;
use crate::topology::OsTopology;

/// Routes kind allocations to arenas of a backing engine.
///
/// The router is the explicit engine handle: kind lifecycle calls
/// ([`create`](Self::create), [`destroy`](Self::destroy)) and the
/// allocation facade ([`malloc`](Self::malloc) and friends) all go through
/// it. A descriptor must only be used with the router that created it.
pub struct ArenaRouter<E, T = OsTopology> {
    pub(crate) engine: E,
    pub(crate) topology: T,
}

impl<E: ArenaEngine> ArenaRouter<E, OsTopology> {
    /// Router that reads CPUs from the operating system.
    pub fn with_os_topology(engine: E) -> Self {
        Self::new(engine, OsTopology)
    }
}

impl<E: ArenaEngine, T: Topology> ArenaRouter<E, T> {
    /// Create a router over `engine` and `topology`.
    pub fn new(engine: E, topology: T) -> Self {
        Self { engine, topology }
    }

    /// The backing engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The CPU topology.
    pub fn topology(&self) -> &T {
        &self.topology
    }

    /// Resolve the arena the next allocation on `kind` would use, without
    /// allocating.
    ///
    /// `Ok(None)` means the engine's default placement. A descriptor that
    /// is not live yields [`KindError::UnresolvedArena`].
    pub fn resolve_arena(&self, kind: &KindDescriptor) -> Result<Option<ArenaId>, KindError> {
        let live = kind.live().ok_or(KindError::UnresolvedArena)?;
        live.strategy.resolve(&live.arenas, &self.topology)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::RoutingStrategy;
    use numakind_core::Partition;
    use numakind_test_utils::{MockEngine, MockTopology};

    #[test]
    fn uninitialized_kind_does_not_resolve() {
        let router = ArenaRouter::new(MockEngine::new(), MockTopology::new(2));
        let kind = KindDescriptor::new();
        assert_eq!(router.resolve_arena(&kind), Err(KindError::UnresolvedArena));
    }

    #[test]
    fn destroyed_passthrough_kind_does_not_resolve() {
        let router = ArenaRouter::new(MockEngine::new(), MockTopology::new(2));
        let mut kind = KindDescriptor::new();
        router
            .create(&mut kind, RoutingStrategy::Passthrough, Partition(0), "default")
            .unwrap();
        assert_eq!(router.resolve_arena(&kind), Ok(None));
        router.destroy(&mut kind);
        assert_eq!(router.resolve_arena(&kind), Err(KindError::UnresolvedArena));
    }
}
