//! Host and process figures shown on the status page.
//!
//! Memory is reported in whole megabytes:
//! - `max_mb`: cgroup memory limit when one applies, otherwise physical memory
//! - `free_mb`: free memory under that limit, otherwise available memory
//! - `total_mb`: resident memory of this process

use sysinfo::{ProcessesToUpdate, System};

const MB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemorySnapshot {
    pub max_mb: u64,
    pub free_mb: u64,
    pub total_mb: u64,
}

/// Logical processor count.
pub fn available_processors() -> usize {
    num_cpus::get()
}

pub fn memory_snapshot() -> MemorySnapshot {
    let mut sys = System::new();
    sys.refresh_memory();

    let (max, free) = match sys.cgroup_limits() {
        Some(limits) => (limits.total_memory, limits.free_memory),
        None => (sys.total_memory(), sys.available_memory()),
    };

    let resident = match sysinfo::get_current_pid() {
        Ok(pid) => {
            sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
            sys.process(pid).map(|p| p.memory()).unwrap_or(0)
        }
        Err(_) => 0,
    };

    MemorySnapshot {
        max_mb: max / MB,
        free_mb: free / MB,
        total_mb: resident / MB,
    }
}

/// Physical memory of the host, in bytes.
pub fn host_memory_bytes() -> u64 {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.total_memory()
}

/// Format bytes to human-readable format
pub fn format_size(bytes: u64) -> String {
    let units = ["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < units.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, units[unit_index])
}
