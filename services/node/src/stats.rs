//! Process and system memory sampling.

use serde::Serialize;
use sysinfo::{Pid, ProcessesToUpdate, System};

/// One memory sample, in bytes.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryReport {
    /// Resident set size of this process.
    pub resident_bytes: u64,
    /// Virtual memory of this process.
    pub virtual_bytes: u64,
    /// Memory in use across the whole machine.
    pub system_used_bytes: u64,
    /// Total machine memory.
    pub system_total_bytes: u64,
}

/// Refreshes `system` and reads the current numbers for this process.
pub fn sample(system: &mut System) -> MemoryReport {
    system.refresh_memory();
    let pid = Pid::from_u32(std::process::id());
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    let (resident_bytes, virtual_bytes) = system
        .process(pid)
        .map(|process| (process.memory(), process.virtual_memory()))
        .unwrap_or((0, 0));

    MemoryReport {
        resident_bytes,
        virtual_bytes,
        system_used_bytes: system.used_memory(),
        system_total_bytes: system.total_memory(),
    }
}
