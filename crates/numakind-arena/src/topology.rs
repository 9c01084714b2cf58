//! Operating-system CPU topology.

#![allow(unsafe_code)]

use numakind_core::Topology;

/// Reads CPU counts and the calling thread's CPU from the OS.
///
/// On platforms without `sched_getcpu` the current CPU is unknown, so
/// per-CPU kinds fail to resolve there.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsTopology;

impl Topology for OsTopology {
    fn configured_cpus(&self) -> usize {
        configured_cpus()
    }

    fn current_cpu(&self) -> Option<usize> {
        current_cpu()
    }
}

#[cfg(unix)]
fn configured_cpus() -> usize {
    // SAFETY: sysconf has no preconditions.
    let n = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_CONF) };
    if n > 0 {
        n as usize
    } else {
        available_parallelism()
    }
}

#[cfg(not(unix))]
fn configured_cpus() -> usize {
    available_parallelism()
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(target_os = "linux")]
fn current_cpu() -> Option<usize> {
    // SAFETY: sched_getcpu has no preconditions; -1 signals failure.
    let cpu = unsafe { libc::sched_getcpu() };
    usize::try_from(cpu).ok()
}

#[cfg(not(target_os = "linux"))]
fn current_cpu() -> Option<usize> {
    None
}

/// Restrict the calling thread to a single logical CPU.
#[cfg(target_os = "linux")]
pub fn pin_current_thread(cpu: usize) -> std::io::Result<()> {
    if cpu >= libc::CPU_SETSIZE as usize {
        return Err(std::io::Error::from(std::io::ErrorKind::InvalidInput));
    }
    // SAFETY: cpu_set_t is plain data and zero is the empty set; pid 0
    // targets the calling thread.
    let rc = unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_SET(cpu, &mut set);
        libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set)
    };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}
