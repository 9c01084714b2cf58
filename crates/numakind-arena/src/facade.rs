//! Allocation entry points: resolve an arena, then delegate to the engine.
//!
//! Failures come back as `None` (null) or a [`KindError`] and are never
//! retried here. Pointers handed to [`ArenaRouter::realloc`] and
//! [`ArenaRouter::free`] must come from the same router's engine.

#![allow(unsafe_code)]

use std::mem;
use std::ptr::NonNull;

use numakind_core::{ArenaEngine, ArenaId, KindError, Topology};
use tracing::trace;

use crate::descriptor::KindDescriptor;
use crate::router::ArenaRouter;

impl<E: ArenaEngine, T: Topology> ArenaRouter<E, T> {
    /// Allocate `size` bytes for `kind`.
    ///
    /// Returns `None` without allocating if no arena resolves, and passes
    /// the engine's result through otherwise.
    pub fn malloc(&self, kind: &KindDescriptor, size: usize) -> Option<NonNull<u8>> {
        let arena = self.route(kind)?;
        self.engine.allocate(size, arena, false)
    }

    /// Allocate `count * size` zeroed bytes for `kind`.
    ///
    /// An overflowing product returns `None` without reaching the engine.
    pub fn calloc(&self, kind: &KindDescriptor, count: usize, size: usize) -> Option<NonNull<u8>> {
        let arena = self.route(kind)?;
        let total = count.checked_mul(size)?;
        self.engine.allocate(total, arena, true)
    }

    /// Resize `ptr` to `size` bytes in `kind`'s current arena.
    ///
    /// - `size == 0` with a pointer frees it and returns `None`.
    /// - No pointer behaves like [`malloc`](Self::malloc).
    /// - If no arena resolves, `ptr` is left allocated and untouched and
    ///   `None` is returned; the caller still owns `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr`, if present, must have been returned by this router's engine
    /// and not yet freed.
    pub unsafe fn realloc(
        &self,
        kind: &KindDescriptor,
        ptr: Option<NonNull<u8>>,
        size: usize,
    ) -> Option<NonNull<u8>> {
        match ptr {
            Some(ptr) if size == 0 => {
                // SAFETY: caller contract.
                unsafe { self.free(kind, ptr) };
                None
            }
            None => self.malloc(kind, size),
            Some(ptr) => {
                let arena = self.route(kind)?;
                // SAFETY: caller contract.
                unsafe { self.engine.reallocate(ptr, size, arena) }
            }
        }
    }

    /// POSIX-style aligned allocation.
    ///
    /// `*memptr` is cleared before anything else and only set on success.
    pub fn posix_memalign(
        &self,
        kind: &KindDescriptor,
        memptr: &mut Option<NonNull<u8>>,
        alignment: usize,
        size: usize,
    ) -> Result<(), KindError> {
        *memptr = None;
        *memptr = Some(self.aligned_alloc(kind, alignment, size)?);
        Ok(())
    }

    /// Allocate `size` bytes aligned to `alignment`.
    ///
    /// `alignment` must be a power of two no smaller than a pointer;
    /// otherwise [`KindError::AlignmentError`] is returned before any
    /// arena is resolved.
    pub fn aligned_alloc(
        &self,
        kind: &KindDescriptor,
        alignment: usize,
        size: usize,
    ) -> Result<NonNull<u8>, KindError> {
        if alignment < mem::size_of::<*const ()>() || !alignment.is_power_of_two() {
            return Err(KindError::AlignmentError { alignment });
        }
        let arena = self.resolve_arena(kind)?;
        self.engine
            .allocate_aligned(size, arena, alignment)
            .ok_or(KindError::AllocationFailure { size, alignment })
    }

    /// Release `ptr`. The engine finds the owning arena itself.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this router's engine and not yet
    /// freed.
    pub unsafe fn free(&self, _kind: &KindDescriptor, ptr: NonNull<u8>) {
        // SAFETY: caller contract.
        unsafe { self.engine.free(ptr) }
    }

    fn route(&self, kind: &KindDescriptor) -> Option<Option<ArenaId>> {
        match self.resolve_arena(kind) {
            Ok(arena) => Some(arena),
            Err(error) => {
                trace!(kind = kind.name().unwrap_or(""), %error, "no arena resolved");
                None
            }
        }
    }
}
