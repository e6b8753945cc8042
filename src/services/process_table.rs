use crate::error::ProcessError;
use crate::models::{
    CpuTimes, CtxSwitches, IoCounters, MemoryInfo, MemoryMap, PageFaults, Pid, ProcessEntry,
    ProcessState, Rlimit,
};

/// The host process table.
///
/// Every per-PID query goes to the OS (or the fake) afresh and reports the raw
/// value. Errors are always [`ProcessError::Unavailable`].
pub trait ProcessTable: Send + Sync {
    /// Scans every visible process.
    fn processes(&self) -> Vec<ProcessEntry>;

    /// Whether `user` names an account on this host.
    fn user_exists(&self, user: &str) -> bool;

    /// Logical CPUs, used to bound CPU percent.
    fn cpu_count(&self) -> usize;

    /// Fails unless `pid` is currently in the table.
    fn ensure_exists(&self, pid: Pid) -> Result<(), ProcessError>;

    fn name(&self, pid: Pid) -> Result<String, ProcessError>;
    fn cmdline(&self, pid: Pid) -> Result<String, ProcessError>;
    fn username(&self, pid: Pid) -> Result<String, ProcessError>;
    /// Milliseconds since the Unix epoch
    fn create_time(&self, pid: Pid) -> Result<i64, ProcessError>;
    fn ppid(&self, pid: Pid) -> Result<Pid, ProcessError>;
    fn status(&self, pid: Pid) -> Result<Vec<ProcessState>, ProcessError>;

    fn cpu_times(&self, pid: Pid) -> Result<CpuTimes, ProcessError>;
    fn memory_info(&self, pid: Pid) -> Result<MemoryInfo, ProcessError>;
    fn memory_percent(&self, pid: Pid) -> Result<f32, ProcessError>;
    fn memory_maps(&self, pid: Pid) -> Result<Vec<MemoryMap>, ProcessError>;

    fn page_faults(&self, pid: Pid) -> Result<PageFaults, ProcessError>;
    fn io_counters(&self, pid: Pid) -> Result<IoCounters, ProcessError>;
    fn num_ctx_switches(&self, pid: Pid) -> Result<CtxSwitches, ProcessError>;
    fn num_fds(&self, pid: Pid) -> Result<u32, ProcessError>;
    fn num_threads(&self, pid: Pid) -> Result<u32, ProcessError>;
    fn rlimits(&self, pid: Pid, include_used: bool) -> Result<Vec<Rlimit>, ProcessError>;
}
