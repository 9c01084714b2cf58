//! Collaborator traits: the backing arena engine and the CPU topology.
//!
//! The routing layer owns no memory and discovers no hardware. Both are
//! reached through these traits so tests can substitute mocks for the
//! process-wide engine and for the scheduler's view of the current CPU.

use std::ptr::NonNull;
use std::sync::Arc;

use crate::error::EngineError;
use crate::id::{ArenaId, Partition};

/// A slab/arena allocator that routed allocations are delegated to.
///
/// `arena = None` on the allocation calls means "no hint": the engine
/// applies its own default placement. Allocation failures are reported
/// as `None` and never retried by the caller.
#[allow(unsafe_code)]
pub trait ArenaEngine: Send + Sync {
    /// Create a new arena configured with `partition`.
    fn register_arena(&self, partition: Partition) -> Result<ArenaId, EngineError>;

    /// Ask the engine to return unused arena memory to the OS.
    ///
    /// Callers treat this as fire-and-forget.
    fn purge_arena(&self, arena: ArenaId) -> Result<(), EngineError>;

    /// Allocate `size` bytes, optionally zero-filled.
    fn allocate(&self, size: usize, arena: Option<ArenaId>, zeroed: bool) -> Option<NonNull<u8>>;

    /// Allocate `size` bytes aligned to `alignment` (a power of two).
    fn allocate_aligned(
        &self,
        size: usize,
        arena: Option<ArenaId>,
        alignment: usize,
    ) -> Option<NonNull<u8>>;

    /// Resize the block at `ptr`, moving it into `arena` if needed.
    ///
    /// On `None` the original block is left intact.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this engine and not yet freed.
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        size: usize,
        arena: Option<ArenaId>,
    ) -> Option<NonNull<u8>>;

    /// Release the block at `ptr` back to its owning arena.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this engine and not yet freed.
    unsafe fn free(&self, ptr: NonNull<u8>);
}

#[allow(unsafe_code)]
impl<E: ArenaEngine + ?Sized> ArenaEngine for Arc<E> {
    fn register_arena(&self, partition: Partition) -> Result<ArenaId, EngineError> {
        (**self).register_arena(partition)
    }

    fn purge_arena(&self, arena: ArenaId) -> Result<(), EngineError> {
        (**self).purge_arena(arena)
    }

    fn allocate(&self, size: usize, arena: Option<ArenaId>, zeroed: bool) -> Option<NonNull<u8>> {
        (**self).allocate(size, arena, zeroed)
    }

    fn allocate_aligned(
        &self,
        size: usize,
        arena: Option<ArenaId>,
        alignment: usize,
    ) -> Option<NonNull<u8>> {
        (**self).allocate_aligned(size, arena, alignment)
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        size: usize,
        arena: Option<ArenaId>,
    ) -> Option<NonNull<u8>> {
        // SAFETY: forwarded verbatim; the caller upholds the contract.
        unsafe { (**self).reallocate(ptr, size, arena) }
    }

    unsafe fn free(&self, ptr: NonNull<u8>) {
        // SAFETY: forwarded verbatim; the caller upholds the contract.
        unsafe { (**self).free(ptr) }
    }
}

/// The scheduler's view of logical CPUs.
///
/// `current_cpu` is a snapshot: the thread may migrate immediately after
/// the call returns. Per-CPU routing tolerates that staleness.
pub trait Topology: Send + Sync {
    /// Number of logical CPUs configured on the system.
    fn configured_cpus(&self) -> usize;

    /// Logical CPU the calling thread is running on, if it can be read.
    fn current_cpu(&self) -> Option<usize>;
}
