//! NUMA/CPU-aware arena routing for named memory kinds.
//!
//! A *kind* is a named allocation policy bound to zero or more arenas of a
//! backing allocator engine. This crate decides, per call, which arena
//! serves a kind's allocation and then delegates to the engine.
//!
//! # Architecture
//!
//! ```text
//! ArenaRouter<E: ArenaEngine, T: Topology>
//! ├── lifecycle: create / destroy       (registers / purges arenas)
//! ├── facade:    malloc / calloc / realloc / posix_memalign / free
//! └── resolve_arena ──> RoutingStrategy::{PerCpu, Bijective, Passthrough}
//!
//! KindDescriptor: Uninitialized ──> Live(LiveKind) ──> Destroyed
//! ```
//!
//! # Routing strategies
//!
//! - **PerCpu:** one arena per configured CPU, indexed by the calling
//!   thread's current CPU.
//! - **Bijective:** a single arena for every call.
//! - **Passthrough:** no arenas; the engine's default placement.
//!
//! [`HeapEngine`] is a ready-made engine over the global allocator and
//! [`OsTopology`] reads CPUs from the operating system. Both can be
//! replaced through the [`ArenaEngine`] and [`Topology`] traits.
//!
//! # Example
//!
//! ```
//! use numakind_arena::{ArenaRouter, HeapEngine, KindDescriptor, RoutingStrategy};
//! use numakind_core::Partition;
//!
//! let router = ArenaRouter::with_os_topology(HeapEngine::default());
//! let mut kind = KindDescriptor::new();
//! router.create(&mut kind, RoutingStrategy::Bijective, Partition(0), "scratch")?;
//!
//! let block = router.malloc(&kind, 64).expect("allocation");
//! // SAFETY: `block` came from this router and is freed once.
//! unsafe { router.free(&kind, block) };
//!
//! router.destroy(&mut kind);
//! # Ok::<(), numakind_core::KindError>(())
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod config;
pub mod descriptor;
mod facade;
pub mod heap;
mod lifecycle;
pub mod router;
pub mod strategy;
pub mod topology;

// Public re-exports for the primary API surface.
pub use config::{HeapConfig, KindConfig};
pub use descriptor::KindDescriptor;
pub use heap::{ArenaStats, HeapEngine, DEFAULT_ARENA};
pub use numakind_core::{ArenaEngine, ArenaId, DescriptorState, KindError, Partition, Topology};
pub use router::ArenaRouter;
pub use strategy::RoutingStrategy;
pub use topology::OsTopology;
