use serde::Serialize;

use crate::models::process::{Pid, Tags};
use crate::models::stats::{
    CpuTimes, CtxSwitches, IoCounters, MemoryInfo, MemoryMap, PageFaults, ProcessState, Rlimit,
};

/// Everything gathered from one process handle in one poll.
///
/// Fields are `None` when the accessor failed or the platform does not
/// provide them.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ProcessSample {
    pub pid: Pid,
    pub tags: Tags,
    pub name: String,
    pub cmdline: Option<String>,
    pub username: Option<String>,
    pub ppid: Option<Pid>,
    pub status: Option<Vec<ProcessState>>,
    /// Milliseconds since the Unix epoch
    pub create_time: Option<i64>,

    pub cpu_times: Option<CpuTimes>,
    /// Empty on the first poll of a handle
    pub cpu_percent: Option<f64>,

    pub memory: Option<MemoryInfo>,
    pub memory_percent: Option<f32>,
    pub memory_maps: Option<Vec<MemoryMap>>,

    pub io: Option<IoCounters>,
    pub page_faults: Option<PageFaults>,
    pub ctx_switches: Option<CtxSwitches>,
    pub num_fds: Option<u32>,
    pub num_threads: Option<u32>,
    pub rlimits: Option<Vec<Rlimit>>,
}

