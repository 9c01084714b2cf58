//! In-process arena engine over the global allocator.
//!
//! [`HeapEngine`] gives every block a small header recording its size,
//! alignment, and owning arena, so `free` and `reallocate` attribute a
//! pointer without any lookup table:
//!
//! ```text
//! base                     user (returned, aligned)
//! |<-- padding -->|Header |<-- size bytes -->|
//! |<------- offset ------>|
//! ```
//!
//! Arena 0 is the default arena used when no hint is given. Registered
//! arenas are numbered from 1 and live for the lifetime of the engine;
//! they carry statistics and the partition they were registered with.

#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::mem;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::RwLock;

use indexmap::IndexMap;
use numakind_core::{ArenaEngine, ArenaId, EngineError, Partition};

use crate::config::HeapConfig;

/// Arena used for allocations without an arena hint.
pub const DEFAULT_ARENA: ArenaId = ArenaId(0);

/// Alignment of blocks from [`ArenaEngine::allocate`], matching `malloc`.
const MIN_ALIGN: usize = 16;

#[repr(C)]
#[derive(Clone, Copy)]
struct Header {
    size: usize,
    align: usize,
    arena: u32,
}

const HEADER_SIZE: usize = mem::size_of::<Header>();

/// Layout of the whole block and the offset of the user pointer in it.
fn block_layout(size: usize, align: usize) -> Option<(Layout, usize)> {
    let align = align.max(mem::align_of::<Header>());
    let offset = HEADER_SIZE.checked_next_multiple_of(align)?;
    let total = offset.checked_add(size.max(1))?;
    let layout = Layout::from_size_align(total, align).ok()?;
    Some((layout, offset))
}

/// Read the header in front of a user pointer.
///
/// # Safety
///
/// `ptr` must be a live block of a [`HeapEngine`].
unsafe fn header_of(ptr: NonNull<u8>) -> Header {
    // SAFETY: blocks are laid out with an aligned header right before
    // the user pointer.
    unsafe { ptr::read(ptr.as_ptr().sub(HEADER_SIZE).cast::<Header>()) }
}

#[derive(Debug, Default)]
struct ArenaSlot {
    partition: Partition,
    live_bytes: AtomicUsize,
    live_allocations: AtomicUsize,
    total_allocations: AtomicU64,
    purges: AtomicU64,
}

impl ArenaSlot {
    fn new(partition: Partition) -> Self {
        Self {
            partition,
            ..Self::default()
        }
    }

    fn record_alloc(&self, size: usize) {
        self.live_bytes.fetch_add(size, Ordering::Relaxed);
        self.live_allocations.fetch_add(1, Ordering::Relaxed);
        self.total_allocations.fetch_add(1, Ordering::Relaxed);
    }

    fn record_free(&self, size: usize) {
        self.live_bytes.fetch_sub(size, Ordering::Relaxed);
        self.live_allocations.fetch_sub(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ArenaStats {
        ArenaStats {
            partition: self.partition,
            live_bytes: self.live_bytes.load(Ordering::Relaxed),
            live_allocations: self.live_allocations.load(Ordering::Relaxed),
            total_allocations: self.total_allocations.load(Ordering::Relaxed),
            purges: self.purges.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time statistics for one arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaStats {
    /// Partition the arena was registered with.
    pub partition: Partition,
    /// Requested bytes currently allocated.
    pub live_bytes: usize,
    /// Blocks currently allocated.
    pub live_allocations: usize,
    /// Blocks ever allocated.
    pub total_allocations: u64,
    /// Purge requests received.
    pub purges: u64,
}

/// Arena engine backed by the global allocator.
///
/// Arena placement is bookkeeping only: blocks of every arena come from
/// the same global heap, and a purge is recorded but has nothing to
/// return because freed blocks go straight back to the global allocator.
pub struct HeapEngine {
    max_arenas: usize,
    arenas: RwLock<IndexMap<ArenaId, ArenaSlot>>,
}

impl HeapEngine {
    /// Engine containing only the default arena.
    pub fn new(config: HeapConfig) -> Self {
        let mut arenas = IndexMap::new();
        arenas.insert(DEFAULT_ARENA, ArenaSlot::new(Partition::default()));
        Self {
            max_arenas: config.resolved_max_arenas(),
            arenas: RwLock::new(arenas),
        }
    }

    /// Number of arenas, including the default arena.
    pub fn arena_count(&self) -> usize {
        self.arenas.read().map_or(0, |arenas| arenas.len())
    }

    /// Statistics for `arena`, or `None` if it does not exist.
    pub fn stats(&self, arena: ArenaId) -> Option<ArenaStats> {
        let arenas = self.arenas.read().ok()?;
        arenas.get(&arena).map(ArenaSlot::snapshot)
    }

    /// Arena that owns `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live block of this engine.
    pub unsafe fn owning_arena(&self, ptr: NonNull<u8>) -> ArenaId {
        // SAFETY: caller contract.
        ArenaId(unsafe { header_of(ptr) }.arena)
    }

    fn alloc_in(
        &self,
        size: usize,
        align: usize,
        arena: Option<ArenaId>,
        zeroed: bool,
    ) -> Option<NonNull<u8>> {
        let arena = arena.unwrap_or(DEFAULT_ARENA);
        let arenas = self.arenas.read().ok()?;
        let slot = arenas.get(&arena)?;
        let (layout, offset) = block_layout(size, align)?;

        // SAFETY: layout has non-zero size (offset >= HEADER_SIZE > 0).
        let base = NonNull::new(unsafe {
            if zeroed {
                alloc::alloc_zeroed(layout)
            } else {
                alloc::alloc(layout)
            }
        })?;
        // SAFETY: offset < layout.size(), and the header slot lies within
        // [base, base + offset) with Header alignment.
        let user = unsafe {
            let user = base.as_ptr().add(offset);
            ptr::write(
                user.sub(HEADER_SIZE).cast::<Header>(),
                Header {
                    size,
                    align: layout.align(),
                    arena: arena.0,
                },
            );
            NonNull::new_unchecked(user)
        };
        slot.record_alloc(size);
        Some(user)
    }
}

impl Default for HeapEngine {
    fn default() -> Self {
        Self::new(HeapConfig::default())
    }
}

impl ArenaEngine for HeapEngine {
    fn register_arena(&self, partition: Partition) -> Result<ArenaId, EngineError> {
        let mut arenas = self.arenas.write().map_err(|_| EngineError::Unavailable {
            reason: "arena table lock poisoned".into(),
        })?;
        if arenas.len() >= self.max_arenas {
            return Err(EngineError::ArenaLimit {
                limit: self.max_arenas,
            });
        }
        // Arenas are never removed, so the table length is the next free id.
        let id = ArenaId(arenas.len() as u32);
        arenas.insert(id, ArenaSlot::new(partition));
        Ok(id)
    }

    fn purge_arena(&self, arena: ArenaId) -> Result<(), EngineError> {
        let arenas = self.arenas.read().map_err(|_| EngineError::Unavailable {
            reason: "arena table lock poisoned".into(),
        })?;
        let slot = arenas
            .get(&arena)
            .ok_or(EngineError::UnknownArena { arena })?;
        slot.purges.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn allocate(&self, size: usize, arena: Option<ArenaId>, zeroed: bool) -> Option<NonNull<u8>> {
        self.alloc_in(size, MIN_ALIGN, arena, zeroed)
    }

    fn allocate_aligned(
        &self,
        size: usize,
        arena: Option<ArenaId>,
        alignment: usize,
    ) -> Option<NonNull<u8>> {
        if !alignment.is_power_of_two() {
            return None;
        }
        self.alloc_in(size, alignment, arena, false)
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        size: usize,
        arena: Option<ArenaId>,
    ) -> Option<NonNull<u8>> {
        // SAFETY: caller contract.
        let old = unsafe { header_of(ptr) };
        let new = self.alloc_in(size, old.align, arena, false)?;
        // SAFETY: both blocks are live and distinct; each holds at least
        // the number of bytes copied.
        unsafe {
            ptr::copy_nonoverlapping(ptr.as_ptr(), new.as_ptr(), old.size.min(size));
            self.free(ptr);
        }
        Some(new)
    }

    unsafe fn free(&self, ptr: NonNull<u8>) {
        // SAFETY: caller contract.
        let header = unsafe { header_of(ptr) };
        let Some((layout, offset)) = block_layout(header.size, header.align) else {
            return;
        };
        if let Ok(arenas) = self.arenas.read() {
            if let Some(slot) = arenas.get(&ArenaId(header.arena)) {
                slot.record_free(header.size);
            }
        }
        // SAFETY: base and layout are exactly those used at allocation.
        unsafe { alloc::dealloc(ptr.as_ptr().sub(offset), layout) };
    }
}
