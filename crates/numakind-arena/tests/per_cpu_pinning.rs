//! Integration test: threads on distinct CPUs resolve distinct arenas.
//!
//! One variant pins real OS threads with `sched_setaffinity` (Linux only,
//! skipped when fewer than two CPUs are usable). The other drives the
//! same routing through `MockTopology` pins and runs everywhere.

use std::sync::Arc;

use numakind_arena::{ArenaRouter, HeapEngine, KindDescriptor, Partition, RoutingStrategy};
use numakind_test_utils::MockTopology;

#[cfg(target_os = "linux")]
#[test]
fn os_pinned_threads_resolve_distinct_arenas() {
    use numakind_arena::topology::pin_current_thread;
    use numakind_arena::Topology;

    let router = Arc::new(ArenaRouter::with_os_topology(HeapEngine::default()));
    let mut kind = KindDescriptor::new();
    router
        .create(&mut kind, RoutingStrategy::PerCpu, Partition(0), "per-cpu")
        .unwrap();
    assert_eq!(kind.arena_count(), router.topology().configured_cpus());
    let kind = Arc::new(kind);

    let (tx, rx) = crossbeam_channel::unbounded();
    let handles: Vec<_> = (0..kind.arena_count())
        .map(|cpu| {
            let (router, kind, tx) = (router.clone(), kind.clone(), tx.clone());
            std::thread::spawn(move || {
                if pin_current_thread(cpu).is_err() {
                    return;
                }
                let arena = router.resolve_arena(&kind).unwrap().unwrap();
                let block = router.malloc(&kind, 32).unwrap();
                let owner = unsafe { router.engine().owning_arena(block) };
                unsafe { router.free(&kind, block) };
                tx.send((cpu, arena, owner)).unwrap();
            })
        })
        .collect();
    drop(tx);
    for handle in handles {
        handle.join().unwrap();
    }

    let resolved: Vec<_> = rx.iter().collect();
    if resolved.len() < 2 {
        eprintln!("skipping: fewer than two CPUs accept pinning");
        return;
    }
    for &(cpu, arena, owner) in &resolved {
        assert_eq!(arena, kind.arena_ids()[cpu]);
        assert_eq!(owner, arena);
    }
    let mut arenas: Vec<_> = resolved.iter().map(|&(_, arena, _)| arena).collect();
    arenas.sort();
    arenas.dedup();
    assert_eq!(arenas.len(), resolved.len());
}

#[test]
fn mock_pinned_threads_resolve_distinct_arenas() {
    const CPUS: usize = 8;
    let router = Arc::new(ArenaRouter::new(
        HeapEngine::default(),
        MockTopology::new(CPUS),
    ));
    let mut kind = KindDescriptor::new();
    router
        .create(&mut kind, RoutingStrategy::PerCpu, Partition(0), "per-cpu")
        .unwrap();
    let kind = Arc::new(kind);

    let (tx, rx) = crossbeam_channel::bounded(CPUS);
    std::thread::scope(|s| {
        for cpu in 0..CPUS {
            let (router, kind, tx) = (&router, &kind, tx.clone());
            s.spawn(move || {
                let _pin = MockTopology::pin(cpu);
                tx.send((cpu, router.resolve_arena(kind).unwrap()))
                    .unwrap();
            });
        }
    });
    drop(tx);

    let mut seen: Vec<_> = rx.iter().collect();
    seen.sort();
    assert_eq!(seen.len(), CPUS);
    for (cpu, arena) in &seen {
        assert_eq!(*arena, Some(kind.arena_ids()[*cpu]));
    }
    let mut arenas: Vec<_> = seen.into_iter().map(|(_, a)| a).collect();
    arenas.dedup();
    assert_eq!(arenas.len(), CPUS);
}

#[test]
fn bijective_ignores_the_calling_cpu() {
    let router = ArenaRouter::new(HeapEngine::default(), MockTopology::new(4));
    let mut kind = KindDescriptor::new();
    router
        .create(&mut kind, RoutingStrategy::Bijective, Partition(0), "single")
        .unwrap();

    let expected = Some(kind.arena_ids()[0]);
    for cpu in 0..4 {
        let _pin = MockTopology::pin(cpu);
        assert_eq!(router.resolve_arena(&kind), Ok(expected));
    }
}
