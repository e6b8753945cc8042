use serde::Serialize;
use std::fmt;

/// Page fault counters, for the process and its waited-for children.
#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq, Eq)]
pub struct PageFaults {
    pub minor_faults: u64,
    pub major_faults: u64,
    pub child_minor_faults: u64,
    pub child_major_faults: u64,
}

/// Cumulative IO counters.
#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq, Eq)]
pub struct IoCounters {
    /// Read syscalls issued
    pub read_count: u64,
    /// Write syscalls issued
    pub write_count: u64,
    /// Bytes fetched from the storage layer
    pub read_bytes: u64,
    /// Bytes sent to the storage layer
    pub write_bytes: u64,
}

/// Memory usage in bytes.
#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq, Eq)]
pub struct MemoryInfo {
    /// Resident set size
    pub rss: u64,
    /// Virtual memory size
    pub vms: u64,
    /// Swapped-out memory, where the OS reports it
    pub swap: Option<u64>,
}

/// One memory mapping, or the sum of all of them when grouped.
///
/// Every size is in bytes.
#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
pub struct MemoryMap {
    /// Mapped file or pseudo-path; empty for a grouped summary
    pub path: String,
    pub size: u64,
    pub rss: u64,
    pub pss: u64,
    pub shared_clean: u64,
    pub shared_dirty: u64,
    pub private_clean: u64,
    pub private_dirty: u64,
    pub referenced: u64,
    pub anonymous: u64,
    pub swap: u64,
}

impl MemoryMap {
    /// Sums every mapping into a single entry with an empty path.
    pub fn grouped<'a>(maps: impl IntoIterator<Item = &'a MemoryMap>) -> MemoryMap {
        maps.into_iter().fold(MemoryMap::default(), |mut acc, m| {
            acc.size += m.size;
            acc.rss += m.rss;
            acc.pss += m.pss;
            acc.shared_clean += m.shared_clean;
            acc.shared_dirty += m.shared_dirty;
            acc.private_clean += m.private_clean;
            acc.private_dirty += m.private_dirty;
            acc.referenced += m.referenced;
            acc.anonymous += m.anonymous;
            acc.swap += m.swap;
            acc
        })
    }
}

/// Context switch counters.
#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq, Eq)]
pub struct CtxSwitches {
    pub voluntary: u64,
    pub involuntary: u64,
}

/// CPU time consumed, in seconds.
#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq)]
pub struct CpuTimes {
    pub user: f64,
    pub system: f64,
}

impl CpuTimes {
    pub fn total(&self) -> f64 {
        self.user + self.system
    }
}

/// Resources a process limit can apply to.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RlimitResource {
    CpuTime,
    FileSize,
    DataSize,
    StackSize,
    CoreFileSize,
    ResidentSet,
    Processes,
    OpenFiles,
    LockedMemory,
    AddressSpace,
    FileLocks,
    PendingSignals,
    MsgqueueSize,
    NicePriority,
    RealtimePriority,
    RealtimeTimeout,
}

/// A soft/hard limit pair. `None` means unlimited.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Rlimit {
    pub resource: RlimitResource,
    pub soft: Option<u64>,
    pub hard: Option<u64>,
    /// Current usage, filled only when requested and the resource is measurable
    pub used: Option<u64>,
}

/// Scheduler state of a process.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    Running,
    Sleep,
    DiskSleep,
    Stop,
    Idle,
    Zombie,
    Wait,
    Lock,
    Dead,
    Unknown,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessState::Running => "running",
            ProcessState::Sleep => "sleep",
            ProcessState::DiskSleep => "disk-sleep",
            ProcessState::Stop => "stop",
            ProcessState::Idle => "idle",
            ProcessState::Zombie => "zombie",
            ProcessState::Wait => "wait",
            ProcessState::Lock => "lock",
            ProcessState::Dead => "dead",
            ProcessState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouped_memory_maps_sum_fields() {
        let maps = vec![
            MemoryMap { path: "/usr/lib/libc.so".into(), size: 4096, rss: 1024, swap: 8, ..Default::default() },
            MemoryMap { path: "[heap]".into(), size: 8192, rss: 2048, anonymous: 2048, ..Default::default() },
        ];

        let grouped = MemoryMap::grouped(&maps);
        assert_eq!(grouped.path, "");
        assert_eq!(grouped.size, 12288);
        assert_eq!(grouped.rss, 3072);
        assert_eq!(grouped.anonymous, 2048);
        assert_eq!(grouped.swap, 8);
    }

    #[test]
    fn test_cpu_times_total() {
        let times = CpuTimes { user: 1.5, system: 0.25 };
        assert_eq!(times.total(), 1.75);
    }
}
