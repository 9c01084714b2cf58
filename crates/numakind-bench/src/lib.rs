//! Benchmark profiles for numakind routing.
//!
//! - [`os_router`]: a [`HeapEngine`] behind the real OS topology
//! - [`pinned_router`]: a [`HeapEngine`] behind a [`MockTopology`] with a
//!   fixed CPU count, for results that do not depend on the host
//! - [`live_kind`]: a created kind for any routing strategy

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use numakind_arena::{ArenaRouter, HeapEngine, KindDescriptor, RoutingStrategy};
use numakind_core::{ArenaEngine, KindError, Partition, Topology};
use numakind_test_utils::MockTopology;

/// Request sizes exercised by the allocation benchmarks.
pub const SIZE_CLASSES: [usize; 4] = [16, 256, 4096, 65536];

/// Every routing strategy, in the order benchmarks report them.
pub const STRATEGIES: [RoutingStrategy; 3] = [
    RoutingStrategy::PerCpu,
    RoutingStrategy::Bijective,
    RoutingStrategy::Passthrough,
];

/// Router over the global-allocator engine and the host's CPUs.
pub fn os_router() -> ArenaRouter<HeapEngine> {
    ArenaRouter::with_os_topology(HeapEngine::default())
}

/// Router over the global-allocator engine with `cpus` simulated CPUs.
pub fn pinned_router(cpus: usize) -> ArenaRouter<HeapEngine, MockTopology> {
    ArenaRouter::new(HeapEngine::default(), MockTopology::new(cpus))
}

/// Create a kind named after its strategy.
pub fn live_kind<E: ArenaEngine, T: Topology>(
    router: &ArenaRouter<E, T>,
    strategy: RoutingStrategy,
) -> Result<KindDescriptor, KindError> {
    let mut kind = KindDescriptor::new();
    router.create(&mut kind, strategy, Partition(0), &strategy.to_string())?;
    Ok(kind)
}
