//! Kind lifecycle FFI: create, destroy, and arena introspection.
//!
//! All kinds share one process-wide router over a [`HeapEngine`] and the
//! OS topology. The kind table sits behind an `RwLock`: allocation calls
//! hold the read side for the duration of the call, so a concurrent
//! destroy waits until in-flight allocations on that kind finish.

use std::ffi::{c_char, CStr};
use std::sync::{OnceLock, RwLock};

use numakind_arena::{ArenaRouter, HeapEngine, KindDescriptor, RoutingStrategy};
use numakind_core::Partition;

use crate::handle::KindTable;
use crate::status::NumakindStatus;

/// Written by [`numakind_resolve_arena`] for kinds that route to the
/// engine's default placement.
pub const NUMAKIND_NO_ARENA: u32 = u32::MAX;

/// Routing strategy selector for [`numakind_create`].
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NumakindStrategy {
    /// One arena per configured CPU.
    PerCpu = 0,
    /// A single arena for every call.
    Bijective = 1,
    /// No arenas; the engine's default placement.
    Passthrough = 2,
}

fn strategy_from_raw(raw: i32) -> Option<RoutingStrategy> {
    match raw {
        x if x == NumakindStrategy::PerCpu as i32 => Some(RoutingStrategy::PerCpu),
        x if x == NumakindStrategy::Bijective as i32 => Some(RoutingStrategy::Bijective),
        x if x == NumakindStrategy::Passthrough as i32 => Some(RoutingStrategy::Passthrough),
        _ => None,
    }
}

static KINDS: RwLock<KindTable> = RwLock::new(KindTable::new());
static ROUTER: OnceLock<ArenaRouter<HeapEngine>> = OnceLock::new();

pub(crate) fn kinds() -> &'static RwLock<KindTable> {
    &KINDS
}

pub(crate) fn router() -> &'static ArenaRouter<HeapEngine> {
    ROUTER.get_or_init(|| ArenaRouter::with_os_topology(HeapEngine::default()))
}

/// Create a kind and write its handle to `kind_out`.
///
/// `strategy` is a [`NumakindStrategy`] value and `name` a NUL-terminated
/// UTF-8 string. On failure nothing is written and any arenas registered
/// along the way have been purged.
///
/// Arenas are never returned to the process-wide engine, not even by
/// [`numakind_destroy`]. Every create consumes arenas from a fixed budget
/// of 4095 (one per configured CPU for per-CPU kinds, one for bijective
/// kinds, none for passthrough kinds). Once the budget is spent, create
/// fails with `ArenaRegistrationFailure` for the rest of the process.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn numakind_create(
    strategy: i32,
    partition: u32,
    name: *const c_char,
    kind_out: *mut u64,
) -> i32 {
    ffi_guard!({
        if name.is_null() || kind_out.is_null() {
            return NumakindStatus::InvalidArgument as i32;
        }
        let strategy = match strategy_from_raw(strategy) {
            Some(s) => s,
            None => return NumakindStatus::InvalidArgument as i32,
        };
        // SAFETY: name is a valid NUL-terminated string per caller contract.
        let name = match unsafe { CStr::from_ptr(name) }.to_str() {
            Ok(s) => s,
            Err(_) => return NumakindStatus::InvalidArgument as i32,
        };

        let router = router();
        let mut kind = KindDescriptor::new();
        if let Err(e) = router.create(&mut kind, strategy, Partition(partition), name) {
            return NumakindStatus::from(&e) as i32;
        }

        let inserted = match kinds().write() {
            Ok(mut table) => table.insert(kind),
            Err(_) => Err(kind),
        };
        match inserted {
            Ok(handle) => {
                // SAFETY: kind_out is valid per caller contract.
                unsafe { *kind_out = handle };
                NumakindStatus::Ok as i32
            }
            Err(mut orphan) => {
                router.destroy(&mut orphan);
                NumakindStatus::InternalError as i32
            }
        }
    })
}

/// Destroy a kind, purging its arenas.
///
/// Blocks allocated from the kind stay valid and may still be freed.
/// Destroying a stale or already-destroyed handle returns `InvalidHandle`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn numakind_destroy(kind: u64) -> i32 {
    ffi_guard!({
        let removed = ffi_lock!(kinds().write()).remove(kind);
        match removed {
            Some(mut descriptor) => {
                router().destroy(&mut descriptor);
                NumakindStatus::Ok as i32
            }
            None => NumakindStatus::InvalidHandle as i32,
        }
    })
}

/// Resolve the arena the calling thread would allocate from.
///
/// Writes [`NUMAKIND_NO_ARENA`] for passthrough kinds.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn numakind_resolve_arena(kind: u64, arena_out: *mut u32) -> i32 {
    ffi_guard!({
        if arena_out.is_null() {
            return NumakindStatus::InvalidArgument as i32;
        }
        let table = ffi_lock!(kinds().read());
        let descriptor = match table.get(kind) {
            Some(d) => d,
            None => return NumakindStatus::InvalidHandle as i32,
        };
        match router().resolve_arena(descriptor) {
            Ok(arena) => {
                let raw = arena.map_or(NUMAKIND_NO_ARENA, |a| a.0);
                // SAFETY: arena_out is valid per caller contract.
                unsafe { *arena_out = raw };
                NumakindStatus::Ok as i32
            }
            Err(e) => NumakindStatus::from(&e) as i32,
        }
    })
}

/// Number of arenas owned by a kind.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn numakind_arena_count(kind: u64, count_out: *mut usize) -> i32 {
    ffi_guard!({
        if count_out.is_null() {
            return NumakindStatus::InvalidArgument as i32;
        }
        let table = ffi_lock!(kinds().read());
        match table.get(kind) {
            Some(descriptor) => {
                // SAFETY: count_out is valid per caller contract.
                unsafe { *count_out = descriptor.arena_count() };
                NumakindStatus::Ok as i32
            }
            None => NumakindStatus::InvalidHandle as i32,
        }
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use numakind_core::Topology;
    use std::ffi::CString;

    pub(crate) fn create(strategy: NumakindStrategy) -> u64 {
        let name = CString::new("ffi-test").unwrap();
        let mut h = 0u64;
        assert_eq!(
            numakind_create(strategy as i32, 0, name.as_ptr(), &mut h),
            NumakindStatus::Ok as i32
        );
        h
    }

    #[test]
    fn create_destroy_round_trip() {
        let h = create(NumakindStrategy::Bijective);
        let mut count = 0usize;
        assert_eq!(numakind_arena_count(h, &mut count), NumakindStatus::Ok as i32);
        assert_eq!(count, 1);
        assert_eq!(numakind_destroy(h), NumakindStatus::Ok as i32);
    }

    #[test]
    fn double_destroy_returns_invalid_handle() {
        let h = create(NumakindStrategy::Bijective);
        assert_eq!(numakind_destroy(h), NumakindStatus::Ok as i32);
        assert_eq!(numakind_destroy(h), NumakindStatus::InvalidHandle as i32);
        let mut count = 0usize;
        assert_eq!(
            numakind_arena_count(h, &mut count),
            NumakindStatus::InvalidHandle as i32
        );
    }

    #[test]
    fn per_cpu_kind_covers_configured_cpus() {
        let h = create(NumakindStrategy::PerCpu);
        let mut count = 0usize;
        numakind_arena_count(h, &mut count);
        assert_eq!(count, router().topology().configured_cpus());
        numakind_destroy(h);
    }

    #[test]
    fn passthrough_resolves_to_no_arena() {
        let h = create(NumakindStrategy::Passthrough);
        let mut arena = 0u32;
        assert_eq!(numakind_resolve_arena(h, &mut arena), NumakindStatus::Ok as i32);
        assert_eq!(arena, NUMAKIND_NO_ARENA);
        numakind_destroy(h);
    }

    #[test]
    fn bijective_resolves_to_a_real_arena() {
        let h = create(NumakindStrategy::Bijective);
        let mut arena = NUMAKIND_NO_ARENA;
        assert_eq!(numakind_resolve_arena(h, &mut arena), NumakindStatus::Ok as i32);
        assert_ne!(arena, NUMAKIND_NO_ARENA);
        numakind_destroy(h);
    }

    #[test]
    fn rejects_bad_arguments() {
        let name = CString::new("bad").unwrap();
        let mut h = 0u64;
        assert_eq!(
            numakind_create(7, 0, name.as_ptr(), &mut h),
            NumakindStatus::InvalidArgument as i32
        );
        assert_eq!(
            numakind_create(0, 0, std::ptr::null(), &mut h),
            NumakindStatus::InvalidArgument as i32
        );
        assert_eq!(
            numakind_create(0, 0, name.as_ptr(), std::ptr::null_mut()),
            NumakindStatus::InvalidArgument as i32
        );
        assert_eq!(h, 0);
    }

    #[test]
    fn empty_name_is_rejected() {
        let name = CString::new("").unwrap();
        let mut h = 0u64;
        assert_eq!(
            numakind_create(NumakindStrategy::Bijective as i32, 0, name.as_ptr(), &mut h),
            NumakindStatus::InvalidArgument as i32
        );
    }

    #[test]
    fn null_out_pointers_are_rejected() {
        let h = create(NumakindStrategy::Bijective);
        assert_eq!(
            numakind_resolve_arena(h, std::ptr::null_mut()),
            NumakindStatus::InvalidArgument as i32
        );
        assert_eq!(
            numakind_arena_count(h, std::ptr::null_mut()),
            NumakindStatus::InvalidArgument as i32
        );
        numakind_destroy(h);
    }

    #[test]
    fn zero_handle_is_invalid() {
        assert_eq!(numakind_destroy(0), NumakindStatus::InvalidHandle as i32);
    }

    #[test]
    fn strategy_values_are_stable() {
        assert_eq!(strategy_from_raw(0), Some(RoutingStrategy::PerCpu));
        assert_eq!(strategy_from_raw(1), Some(RoutingStrategy::Bijective));
        assert_eq!(strategy_from_raw(2), Some(RoutingStrategy::Passthrough));
        assert_eq!(strategy_from_raw(-1), None);
    }
}
