//! C ABI for numakind memory kinds.
//!
//! Kinds live in a process-wide handle table and are addressed from C by
//! opaque `u64` handles. Every entry point catches panics at the boundary
//! and reports them as [`NumakindStatus::Panicked`] (or a null pointer for
//! the allocation calls). A header is generated into `include/numakind.h`
//! by `build.rs`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

/// Run `$body` with panics caught, returning `Panicked` if one escapes.
macro_rules! ffi_guard {
    ($body:block) => {
        ffi_guard_or!($crate::status::NumakindStatus::Panicked as i32, $body)
    };
}

/// Run `$body` with panics caught, returning `$fallback` if one escapes.
macro_rules! ffi_guard_or {
    ($fallback:expr, $body:block) => {
        match ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| $body)) {
            Ok(value) => value,
            Err(_) => $fallback,
        }
    };
}

/// Acquire a lock guard or return `InternalError` from the enclosing
/// closure when the lock is poisoned.
macro_rules! ffi_lock {
    ($guard:expr) => {
        match $guard {
            Ok(guard) => guard,
            Err(_) => return $crate::status::NumakindStatus::InternalError as i32,
        }
    };
}

mod alloc;
mod handle;
mod kind;
mod status;

pub use alloc::{
    numakind_calloc, numakind_free, numakind_malloc, numakind_posix_memalign, numakind_realloc,
};
pub use kind::{
    numakind_arena_count, numakind_create, numakind_destroy, numakind_resolve_arena,
    NumakindStrategy, NUMAKIND_NO_ARENA,
};
pub use status::NumakindStatus;
