//! Error types for kind lifecycle and allocation routing.
//!
//! [`KindError`] is the error surfaced to callers of the routing layer.
//! [`EngineError`] is what a backing [`ArenaEngine`](crate::ArenaEngine)
//! reports from arena management calls; it is wrapped, never flattened,
//! when a registration failure aborts kind creation.

use std::error::Error;
use std::fmt;

use crate::id::ArenaId;
use crate::state::DescriptorState;

/// Errors from kind creation, arena resolution, and aligned allocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KindError {
    /// Owned storage for the kind name or arena map could not be
    /// allocated (`NUMAKIND_ERROR_MALLOC`).
    MallocFailure,
    /// The engine refused to register one of the kind's arenas
    /// (`NUMAKIND_ERROR_ARENA_REGISTRATION`).
    ArenaRegistrationFailure {
        /// Arena-map slot whose registration failed.
        slot: usize,
        /// The engine's reason.
        source: EngineError,
    },
    /// Alignment is smaller than a pointer or not a power of two
    /// (`NUMAKIND_ERROR_ALIGNMENT`).
    AlignmentError {
        /// The rejected alignment.
        alignment: usize,
    },
    /// The calling thread's CPU has no slot in the arena map
    /// (`NUMAKIND_ERROR_GETCPU`).
    CpuResolutionOutOfRange {
        /// CPU reported by the topology, `None` if it could not be read.
        cpu: Option<usize>,
        /// Length of the arena map.
        arena_count: usize,
    },
    /// The descriptor holds no arena to route to
    /// (`NUMAKIND_ERROR_RUNTIME`).
    UnresolvedArena,
    /// The engine returned null for an aligned allocation
    /// (`NUMAKIND_ERROR_ALLOCATION`).
    AllocationFailure {
        /// Requested size in bytes.
        size: usize,
        /// Requested alignment in bytes.
        alignment: usize,
    },
    /// Kind names must be non-empty.
    EmptyName,
    /// `create` was called on a descriptor that is not Uninitialized.
    NotUninitialized {
        /// The state the descriptor was found in.
        state: DescriptorState,
    },
}

impl fmt::Display for KindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MallocFailure => write!(f, "failed to allocate kind storage"),
            Self::ArenaRegistrationFailure { slot, source } => {
                write!(f, "arena registration failed for slot {slot}: {source}")
            }
            Self::AlignmentError { alignment } => write!(
                f,
                "invalid alignment {alignment}: must be a power of two no smaller than a pointer"
            ),
            Self::CpuResolutionOutOfRange { cpu, arena_count } => match cpu {
                Some(cpu) => write!(
                    f,
                    "cpu {cpu} is outside the arena map (len {arena_count})"
                ),
                None => write!(
                    f,
                    "current cpu unavailable (arena map len {arena_count})"
                ),
            },
            Self::UnresolvedArena => write!(f, "kind has no arena to route to"),
            Self::AllocationFailure { size, alignment } => write!(
                f,
                "engine failed to allocate {size} bytes aligned to {alignment}"
            ),
            Self::EmptyName => write!(f, "kind name must not be empty"),
            Self::NotUninitialized { state } => {
                write!(f, "descriptor is {state}, expected uninitialized")
            }
        }
    }
}

impl Error for KindError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ArenaRegistrationFailure { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors reported by a backing engine's arena management calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineError {
    /// The engine cannot hold any more arenas.
    ArenaLimit {
        /// Maximum number of arenas the engine supports.
        limit: usize,
    },
    /// The arena id was never issued by this engine.
    UnknownArena {
        /// The unrecognised id.
        arena: ArenaId,
    },
    /// The engine is unusable, e.g. its internal lock was poisoned.
    Unavailable {
        /// Human-readable description.
        reason: String,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArenaLimit { limit } => write!(f, "arena limit of {limit} reached"),
            Self::UnknownArena { arena } => write!(f, "unknown arena {arena}"),
            Self::Unavailable { reason } => write!(f, "engine unavailable: {reason}"),
        }
    }
}

impl Error for EngineError {}
