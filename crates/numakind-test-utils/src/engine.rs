//! Recording arena engine with failure injection.
//!
//! [`MockEngine`] serves real memory from the global allocator so facade
//! tests can write through returned pointers, while logging every call
//! it receives. Registration, purge, and allocation failures can be
//! switched on to drive the routing layer's rollback and null paths.

#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::ptr::NonNull;
use std::sync::{Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
use numakind_core::{ArenaEngine, ArenaId, EngineError, Partition};

/// Alignment used for unaligned allocation requests.
const DEFAULT_ALIGN: usize = 16;

/// One call observed by a [`MockEngine`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineCall {
    Register {
        partition: Partition,
    },
    Purge {
        arena: ArenaId,
    },
    Allocate {
        size: usize,
        arena: Option<ArenaId>,
        zeroed: bool,
    },
    AllocateAligned {
        size: usize,
        arena: Option<ArenaId>,
        alignment: usize,
    },
    Reallocate {
        size: usize,
        arena: Option<ArenaId>,
    },
    Free,
}

#[derive(Clone, Copy, Debug)]
struct Block {
    layout: Layout,
    arena: Option<ArenaId>,
}

#[derive(Default)]
struct MockState {
    next_arena: u32,
    registration_attempts: usize,
    registered: Vec<(ArenaId, Partition)>,
    purged: Vec<ArenaId>,
    calls: Vec<EngineCall>,
    live: IndexMap<usize, Block>,
    unknown_frees: usize,
    fail_registration_at: Option<usize>,
    fail_purges: bool,
    fail_allocations: bool,
}

/// In-memory [`ArenaEngine`] that records calls and injects failures.
///
/// Arena ids are issued sequentially from 1; id 0 is never issued.
pub struct MockEngine {
    state: Mutex<MockState>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                next_arena: 1,
                ..MockState::default()
            }),
        }
    }

    /// Fail the `n`-th registration attempt (0-based) with
    /// [`EngineError::ArenaLimit`]. Later attempts succeed again.
    pub fn fail_registration_at(self, n: usize) -> Self {
        self.lock().fail_registration_at = Some(n);
        self
    }

    /// Make every purge return an error.
    pub fn fail_purges(self) -> Self {
        self.lock().fail_purges = true;
        self
    }

    /// Toggle engine-level out-of-memory for all allocation calls.
    pub fn set_fail_allocations(&self, fail: bool) {
        self.lock().fail_allocations = fail;
    }

    /// Arenas successfully registered, in order.
    pub fn registered(&self) -> Vec<(ArenaId, Partition)> {
        self.lock().registered.clone()
    }

    /// Purge requests received, in order (including failed ones).
    pub fn purged(&self) -> Vec<ArenaId> {
        self.lock().purged.clone()
    }

    /// Every call received, in order.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.lock().calls.clone()
    }

    /// Number of blocks allocated and not yet freed.
    pub fn live_blocks(&self) -> usize {
        self.lock().live.len()
    }

    /// Arena hint a live block was allocated with.
    ///
    /// Returns `None` if `ptr` is not a live block of this engine.
    pub fn arena_of(&self, ptr: NonNull<u8>) -> Option<Option<ArenaId>> {
        self.lock()
            .live
            .get(&(ptr.as_ptr() as usize))
            .map(|b| b.arena)
    }

    /// Number of `free` calls whose pointer was not a live block.
    pub fn unknown_frees(&self) -> usize {
        self.lock().unknown_frees
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[allow(unsafe_code)]
    fn alloc_block(
        state: &mut MockState,
        size: usize,
        align: usize,
        arena: Option<ArenaId>,
        zeroed: bool,
    ) -> Option<NonNull<u8>> {
        if state.fail_allocations {
            return None;
        }
        let layout = Layout::from_size_align(size.max(1), align).ok()?;
        // SAFETY: layout has non-zero size.
        let raw = unsafe {
            if zeroed {
                alloc::alloc_zeroed(layout)
            } else {
                alloc::alloc(layout)
            }
        };
        let ptr = NonNull::new(raw)?;
        state
            .live
            .insert(ptr.as_ptr() as usize, Block { layout, arena });
        Some(ptr)
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(unsafe_code)]
impl ArenaEngine for MockEngine {
    fn register_arena(&self, partition: Partition) -> Result<ArenaId, EngineError> {
        let mut state = self.lock();
        state.calls.push(EngineCall::Register { partition });
        let attempt = state.registration_attempts;
        state.registration_attempts += 1;
        if state.fail_registration_at == Some(attempt) {
            return Err(EngineError::ArenaLimit {
                limit: state.registered.len(),
            });
        }
        let id = ArenaId(state.next_arena);
        state.next_arena += 1;
        state.registered.push((id, partition));
        Ok(id)
    }

    fn purge_arena(&self, arena: ArenaId) -> Result<(), EngineError> {
        let mut state = self.lock();
        state.calls.push(EngineCall::Purge { arena });
        state.purged.push(arena);
        if state.fail_purges {
            return Err(EngineError::Unavailable {
                reason: "purge disabled".into(),
            });
        }
        if !state.registered.iter().any(|(id, _)| *id == arena) {
            return Err(EngineError::UnknownArena { arena });
        }
        Ok(())
    }

    fn allocate(&self, size: usize, arena: Option<ArenaId>, zeroed: bool) -> Option<NonNull<u8>> {
        let mut state = self.lock();
        state.calls.push(EngineCall::Allocate {
            size,
            arena,
            zeroed,
        });
        Self::alloc_block(&mut state, size, DEFAULT_ALIGN, arena, zeroed)
    }

    fn allocate_aligned(
        &self,
        size: usize,
        arena: Option<ArenaId>,
        alignment: usize,
    ) -> Option<NonNull<u8>> {
        let mut state = self.lock();
        state.calls.push(EngineCall::AllocateAligned {
            size,
            arena,
            alignment,
        });
        Self::alloc_block(&mut state, size, alignment, arena, false)
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        size: usize,
        arena: Option<ArenaId>,
    ) -> Option<NonNull<u8>> {
        let mut state = self.lock();
        state.calls.push(EngineCall::Reallocate { size, arena });
        let old = *state.live.get(&(ptr.as_ptr() as usize))?;
        let new = Self::alloc_block(&mut state, size, old.layout.align(), arena, false)?;
        let copy = old.layout.size().min(size);
        // SAFETY: both blocks are live, distinct, and at least `copy` bytes.
        unsafe {
            std::ptr::copy_nonoverlapping(ptr.as_ptr(), new.as_ptr(), copy);
            alloc::dealloc(ptr.as_ptr(), old.layout);
        }
        state.live.shift_remove(&(ptr.as_ptr() as usize));
        Some(new)
    }

    unsafe fn free(&self, ptr: NonNull<u8>) {
        let mut state = self.lock();
        state.calls.push(EngineCall::Free);
        match state.live.shift_remove(&(ptr.as_ptr() as usize)) {
            // SAFETY: the block was allocated by us with this layout.
            Some(block) => unsafe { alloc::dealloc(ptr.as_ptr(), block.layout) },
            None => state.unknown_frees += 1,
        }
    }
}

impl Drop for MockEngine {
    #[allow(unsafe_code)]
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (addr, block) in state.live.drain(..) {
            // SAFETY: every live entry is an outstanding allocation of ours.
            unsafe { alloc::dealloc(addr as *mut u8, block.layout) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_ids_are_sequential() {
        let engine = MockEngine::new();
        assert_eq!(engine.register_arena(Partition(2)), Ok(ArenaId(1)));
        assert_eq!(engine.register_arena(Partition(2)), Ok(ArenaId(2)));
        assert_eq!(engine.registered().len(), 2);
    }

    #[test]
    fn injected_registration_failure_hits_only_that_attempt() {
        let engine = MockEngine::new().fail_registration_at(1);
        assert!(engine.register_arena(Partition(0)).is_ok());
        assert!(engine.register_arena(Partition(0)).is_err());
        assert!(engine.register_arena(Partition(0)).is_ok());
    }

    #[test]
    #[allow(unsafe_code)]
    fn free_releases_block() {
        let engine = MockEngine::new();
        let p = engine.allocate(32, Some(ArenaId(1)), true).unwrap();
        assert_eq!(engine.arena_of(p), Some(Some(ArenaId(1))));
        unsafe { engine.free(p) };
        assert_eq!(engine.live_blocks(), 0);
        assert_eq!(engine.unknown_frees(), 0);
    }

    #[test]
    fn purge_of_unregistered_arena_is_an_error() {
        let engine = MockEngine::new();
        assert!(engine.purge_arena(ArenaId(9)).is_err());
        assert_eq!(engine.purged(), vec![ArenaId(9)]);
    }
}
