//! C-compatible status codes.
//!
//! [`NumakindStatus`] is a `repr(i32)` enum: `Ok` is zero and every error
//! is negative. The values are part of the ABI and never renumbered.

use numakind_core::KindError;

/// Status code returned by every status-returning FFI function.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NumakindStatus {
    /// Success.
    Ok = 0,
    /// Handle is invalid or the kind was already destroyed.
    InvalidHandle = -1,
    /// An argument is null, out of range, or not valid UTF-8.
    InvalidArgument = -2,
    /// Storage for the kind name or arena map could not be allocated.
    MallocFailure = -3,
    /// The engine refused to register one of the kind's arenas.
    ArenaRegistrationFailure = -4,
    /// Alignment is not a power of two or smaller than a pointer.
    AlignmentError = -5,
    /// The calling thread's CPU has no arena in a per-CPU kind.
    CpuResolutionOutOfRange = -6,
    /// The kind has no arena to route to.
    UnresolvedArena = -7,
    /// The engine could not satisfy an aligned allocation.
    AllocationFailure = -8,
    /// Internal error (e.g. a poisoned lock after a prior panic).
    InternalError = -20,
    /// A Rust panic was caught at the FFI boundary.
    Panicked = -128,
}

impl From<&KindError> for NumakindStatus {
    fn from(e: &KindError) -> Self {
        match e {
            KindError::MallocFailure => NumakindStatus::MallocFailure,
            KindError::ArenaRegistrationFailure { .. } => NumakindStatus::ArenaRegistrationFailure,
            KindError::AlignmentError { .. } => NumakindStatus::AlignmentError,
            KindError::CpuResolutionOutOfRange { .. } => NumakindStatus::CpuResolutionOutOfRange,
            KindError::UnresolvedArena => NumakindStatus::UnresolvedArena,
            KindError::AllocationFailure { .. } => NumakindStatus::AllocationFailure,
            KindError::EmptyName => NumakindStatus::InvalidArgument,
            // Descriptors created through the C ABI are always fresh.
            KindError::NotUninitialized { .. } => NumakindStatus::InternalError,
        }
    }
}
