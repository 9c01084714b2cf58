//! Test utilities and mock collaborators for numakind development.
//!
//! Provides a recording [`MockEngine`] with failure injection and a
//! [`MockTopology`] whose "current CPU" is pinned per thread, so per-CPU
//! routing can be exercised deterministically on any machine.

#![deny(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};

use numakind_core::Topology;

mod engine;

pub use engine::{EngineCall, MockEngine};

thread_local! {
    static PINNED_CPU: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Topology with a configurable CPU count and per-thread pinned CPU ids.
///
/// Threads that never call [`MockTopology::pin`] report `default_cpu`.
pub struct MockTopology {
    cpus: AtomicUsize,
    default_cpu: Option<usize>,
}

impl MockTopology {
    /// `cpus` configured CPUs; unpinned threads run on CPU 0.
    pub fn new(cpus: usize) -> Self {
        Self {
            cpus: AtomicUsize::new(cpus),
            default_cpu: Some(0),
        }
    }

    /// Unpinned threads cannot read their current CPU.
    pub fn without_current_cpu(cpus: usize) -> Self {
        Self {
            cpus: AtomicUsize::new(cpus),
            default_cpu: None,
        }
    }

    /// Change the reported CPU count, e.g. to simulate hotplug after a
    /// kind was created.
    pub fn set_configured_cpus(&self, cpus: usize) {
        self.cpus.store(cpus, Ordering::Relaxed);
    }

    /// Report `cpu` as the current CPU on this thread until the guard drops.
    pub fn pin(cpu: usize) -> PinGuard {
        let previous = PINNED_CPU.with(|c| c.replace(Some(cpu)));
        PinGuard { previous }
    }
}

impl Topology for MockTopology {
    fn configured_cpus(&self) -> usize {
        self.cpus.load(Ordering::Relaxed)
    }

    fn current_cpu(&self) -> Option<usize> {
        PINNED_CPU.with(Cell::get).or(self.default_cpu)
    }
}

/// Restores the thread's previous pin on drop.
#[must_use]
pub struct PinGuard {
    previous: Option<usize>,
}

impl Drop for PinGuard {
    fn drop(&mut self) {
        PINNED_CPU.with(|c| c.set(self.previous));
    }
}
