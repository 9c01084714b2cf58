//! Allocation FFI: malloc, calloc, realloc, posix_memalign, free.
//!
//! Pointer-returning calls report every failure (stale handle, poisoned
//! table, unresolved arena, engine exhaustion, caught panic) as null.

use std::ffi::c_void;
use std::ptr::{self, NonNull};

use numakind_arena::{ArenaEngine, KindDescriptor};

use crate::kind::{kinds, router};
use crate::status::NumakindStatus;

/// Run `f` against the live kind behind `kind` under the table's read
/// lock. Returns null for unknown handles or a poisoned table.
fn with_kind(kind: u64, f: impl FnOnce(&KindDescriptor) -> Option<NonNull<u8>>) -> *mut c_void {
    let Ok(table) = kinds().read() else {
        return ptr::null_mut();
    };
    table
        .get(kind)
        .and_then(f)
        .map_or(ptr::null_mut(), |p| p.as_ptr().cast())
}

/// Allocate `size` bytes from `kind`'s resolved arena.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn numakind_malloc(kind: u64, size: usize) -> *mut c_void {
    ffi_guard_or!(ptr::null_mut(), {
        with_kind(kind, |descriptor| router().malloc(descriptor, size))
    })
}

/// Allocate zeroed storage for `count` elements of `size` bytes.
///
/// Returns null when `count * size` overflows.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn numakind_calloc(kind: u64, count: usize, size: usize) -> *mut c_void {
    ffi_guard_or!(ptr::null_mut(), {
        with_kind(kind, |descriptor| router().calloc(descriptor, count, size))
    })
}

/// Resize `ptr` to `size` bytes.
///
/// A null `ptr` allocates. A zero `size` frees `ptr` and returns null,
/// like [`numakind_free`], whether or not `kind` is still valid. Otherwise,
/// when the kind cannot be resolved, null is returned and `ptr` is left
/// allocated and unchanged.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn numakind_realloc(kind: u64, ptr: *mut c_void, size: usize) -> *mut c_void {
    ffi_guard_or!(ptr::null_mut(), {
        let block = NonNull::new(ptr.cast::<u8>());
        if let (Some(block), 0) = (block, size) {
            // SAFETY: ptr came from this library and is freed once per
            // caller contract.
            unsafe { router().engine().free(block) };
            return ptr::null_mut();
        }
        with_kind(kind, |descriptor| {
            // SAFETY: ptr came from this library and is live per caller contract.
            unsafe { router().realloc(descriptor, block, size) }
        })
    })
}

/// POSIX-style aligned allocation into `*memptr`.
///
/// `*memptr` is set to null before any other check and only overwritten
/// on success. `alignment` must be a power of two no smaller than a
/// pointer.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn numakind_posix_memalign(
    kind: u64,
    memptr: *mut *mut c_void,
    alignment: usize,
    size: usize,
) -> i32 {
    ffi_guard!({
        if memptr.is_null() {
            return NumakindStatus::InvalidArgument as i32;
        }
        // SAFETY: memptr is valid per caller contract.
        unsafe { *memptr = ptr::null_mut() };

        let table = ffi_lock!(kinds().read());
        let descriptor = match table.get(kind) {
            Some(d) => d,
            None => return NumakindStatus::InvalidHandle as i32,
        };
        let mut block = None;
        if let Err(e) = router().posix_memalign(descriptor, &mut block, alignment, size) {
            return NumakindStatus::from(&e) as i32;
        }
        if let Some(block) = block {
            // SAFETY: memptr is valid per caller contract.
            unsafe { *memptr = block.as_ptr().cast() };
        }
        NumakindStatus::Ok as i32
    })
}

/// Release `ptr`. Null is a no-op.
///
/// The owning arena is read from the block itself, so blocks stay
/// releasable after their kind has been destroyed and `kind` is not
/// consulted.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn numakind_free(_kind: u64, ptr: *mut c_void) {
    ffi_guard_or!((), {
        if let Some(block) = NonNull::new(ptr.cast::<u8>()) {
            // SAFETY: ptr came from this library and is freed once per
            // caller contract.
            unsafe { router().engine().free(block) };
        }
    })
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;
    use crate::kind::tests::create;
    use crate::kind::{
        numakind_destroy, numakind_resolve_arena, NumakindStrategy, NUMAKIND_NO_ARENA,
    };
    use numakind_core::ArenaId;

    #[test]
    fn malloc_then_free() {
        let h = create(NumakindStrategy::Bijective);
        let p = numakind_malloc(h, 64);
        assert!(!p.is_null());
        numakind_free(h, p);
        numakind_destroy(h);
    }

    #[test]
    fn stale_handle_allocates_nothing() {
        let h = create(NumakindStrategy::Bijective);
        numakind_destroy(h);
        assert!(numakind_malloc(h, 64).is_null());
        assert!(numakind_calloc(h, 4, 4).is_null());
        let mut p = ptr::dangling_mut::<c_void>();
        assert_eq!(
            numakind_posix_memalign(h, &mut p, 16, 64),
            NumakindStatus::InvalidHandle as i32
        );
        assert!(p.is_null());
    }

    #[test]
    fn calloc_zeroes_and_rejects_overflow() {
        let h = create(NumakindStrategy::Passthrough);
        let p = numakind_calloc(h, 10, 8);
        assert!(!p.is_null());
        let bytes = unsafe { std::slice::from_raw_parts(p.cast::<u8>(), 80) };
        assert!(bytes.iter().all(|&b| b == 0));
        numakind_free(h, p);

        assert!(numakind_calloc(h, usize::MAX, 2).is_null());
        numakind_destroy(h);
    }

    #[test]
    fn realloc_grows_preserving_contents() {
        let h = create(NumakindStrategy::Bijective);
        let p = numakind_realloc(h, ptr::null_mut(), 8);
        assert!(!p.is_null());
        unsafe { ptr::copy_nonoverlapping(b"numakind".as_ptr(), p.cast::<u8>(), 8) };

        let q = numakind_realloc(h, p, 4096);
        assert!(!q.is_null());
        let bytes = unsafe { std::slice::from_raw_parts(q.cast::<u8>(), 8) };
        assert_eq!(bytes, b"numakind");

        assert!(numakind_realloc(h, q, 0).is_null());
        numakind_destroy(h);
    }

    #[test]
    fn posix_memalign_validates_alignment() {
        let h = create(NumakindStrategy::Bijective);
        let mut p = ptr::dangling_mut::<c_void>();
        assert_eq!(
            numakind_posix_memalign(h, &mut p, 3, 64),
            NumakindStatus::AlignmentError as i32
        );
        assert!(p.is_null());

        assert_eq!(
            numakind_posix_memalign(h, &mut p, 4096, 64),
            NumakindStatus::Ok as i32
        );
        assert!(!p.is_null());
        assert_eq!(p as usize % 4096, 0);
        numakind_free(h, p);

        assert_eq!(
            numakind_posix_memalign(h, ptr::null_mut(), 16, 64),
            NumakindStatus::InvalidArgument as i32
        );
        numakind_destroy(h);
    }

    #[test]
    fn blocks_outlive_their_kind() {
        let h = create(NumakindStrategy::Bijective);
        let p = numakind_malloc(h, 128);
        assert!(!p.is_null());
        numakind_destroy(h);
        numakind_free(h, p);
    }

    #[test]
    fn realloc_to_zero_frees_after_destroy() {
        let h = create(NumakindStrategy::Bijective);
        let mut arena = NUMAKIND_NO_ARENA;
        assert_eq!(numakind_resolve_arena(h, &mut arena), NumakindStatus::Ok as i32);
        let arena = ArenaId(arena);

        let p = numakind_malloc(h, 64);
        assert!(!p.is_null());
        assert_eq!(router().engine().stats(arena).unwrap().live_allocations, 1);
        numakind_destroy(h);

        assert!(numakind_realloc(h, p, 0).is_null());
        let stats = router().engine().stats(arena).unwrap();
        assert_eq!(stats.live_allocations, 0);
        assert_eq!(stats.live_bytes, 0);
    }

    #[test]
    fn free_null_is_a_no_op() {
        numakind_free(0, ptr::null_mut());
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn power_of_two_alignments_are_honoured(shift in 3u32..13, size in 0usize..2048) {
                let h = create(NumakindStrategy::Bijective);
                let alignment = 1usize << shift;
                let mut p = ptr::null_mut();
                prop_assert_eq!(
                    numakind_posix_memalign(h, &mut p, alignment, size),
                    NumakindStatus::Ok as i32
                );
                prop_assert_eq!(p as usize % alignment, 0);
                numakind_free(h, p);
                numakind_destroy(h);
            }
        }
    }
}
