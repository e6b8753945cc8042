use std::time::Duration;

use crate::error::ProcessError;
use crate::models::{Pid, ProcessSample};
use crate::services::process::Process;

/// Gathers a [`ProcessSample`] from a process handle.
#[derive(Debug, Clone, Default)]
pub struct StatsCollector {
    /// Also read per-mapping memory usage (costly on large processes)
    pub memory_maps: bool,
    /// Also read resource limits with current usage
    pub rlimits: bool,
    /// Poll period passed to `cpu_percent`
    pub interval: Duration,
}

impl StatsCollector {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    /// Reads every field of `process`.
    ///
    /// Fails only when the process name cannot be read, which means the
    /// process is gone and the handle should be dropped. Any other field that
    /// fails is left empty.
    pub fn collect_stats(&self, process: &mut dyn Process) -> Result<ProcessSample, ProcessError> {
        let name = process.name()?;
        let pid = process.pid();

        let cpu_percent = match process.cpu_percent(self.interval) {
            Ok(percent) => Some(percent),
            Err(e) if e.is_baseline_not_ready() => None,
            Err(e) => {
                log::debug!("cpu percent for pid {}: {}", pid, e);
                None
            }
        };

        let sample = ProcessSample {
            pid,
            tags: process.tags().clone(),
            name,
            cmdline: field(pid, "cmdline", process.cmdline()),
            username: field(pid, "username", process.username()),
            ppid: field(pid, "ppid", process.ppid()),
            status: field(pid, "status", process.status()),
            create_time: field(pid, "create_time", process.create_time()),
            cpu_times: field(pid, "cpu_times", process.cpu_times()),
            cpu_percent,
            memory: field(pid, "memory_info", process.memory_info()),
            memory_percent: field(pid, "memory_percent", process.memory_percent()),
            memory_maps: if self.memory_maps {
                field(pid, "memory_maps", process.memory_maps(false))
            } else {
                None
            },
            io: field(pid, "io_counters", process.io_counters()),
            page_faults: field(pid, "page_faults", process.page_faults()),
            ctx_switches: field(pid, "num_ctx_switches", process.num_ctx_switches()),
            num_fds: field(pid, "num_fds", process.num_fds()),
            num_threads: field(pid, "num_threads", process.num_threads()),
            rlimits: if self.rlimits {
                field(pid, "rlimit_usage", process.rlimit_usage(true))
            } else {
                None
            },
        };

        Ok(sample)
    }
}

fn field<V>(pid: Pid, what: &str, result: Result<V, ProcessError>) -> Option<V> {
    result
        .map_err(|e| log::trace!("{} for pid {}: {}", what, pid, e))
        .ok()
}
