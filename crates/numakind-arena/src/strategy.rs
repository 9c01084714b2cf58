//! Routing strategies: how a kind picks an arena for each call.
//!
//! A [`RoutingStrategy`] decides two things: how many arenas a kind
//! registers at creation, and which of them serves a given allocation.

use std::fmt;

use numakind_core::{ArenaId, KindError, Topology};

/// Arena routing policy of a kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RoutingStrategy {
    /// One arena per configured logical CPU, chosen by the calling
    /// thread's current CPU.
    PerCpu,
    /// A single arena serves every call.
    Bijective,
    /// No arenas of its own; the engine places allocations by its
    /// default policy.
    Passthrough,
}

impl RoutingStrategy {
    /// Arena-map length a kind with this strategy registers.
    pub fn arena_count(self, topology: &(impl Topology + ?Sized)) -> usize {
        match self {
            Self::PerCpu => topology.configured_cpus(),
            Self::Bijective => 1,
            Self::Passthrough => 0,
        }
    }

    /// Pick the arena for the current call.
    ///
    /// `Ok(None)` means no hint: the engine decides. The CPU id used for
    /// [`PerCpu`](Self::PerCpu) is a snapshot and may be stale by the
    /// time the engine runs.
    pub fn resolve(
        self,
        arenas: &[ArenaId],
        topology: &(impl Topology + ?Sized),
    ) -> Result<Option<ArenaId>, KindError> {
        match self {
            Self::PerCpu => {
                let cpu = topology.current_cpu();
                cpu.and_then(|cpu| arenas.get(cpu))
                    .copied()
                    .map(Some)
                    .ok_or(KindError::CpuResolutionOutOfRange {
                        cpu,
                        arena_count: arenas.len(),
                    })
            }
            Self::Bijective => arenas
                .first()
                .copied()
                .map(Some)
                .ok_or(KindError::UnresolvedArena),
            Self::Passthrough => Ok(None),
        }
    }
}

impl fmt::Display for RoutingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PerCpu => write!(f, "per-cpu"),
            Self::Bijective => write!(f, "bijective"),
            Self::Passthrough => write!(f, "passthrough"),
        }
    }
}
