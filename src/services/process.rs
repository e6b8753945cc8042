use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::ProcessError;
use crate::models::{
    CpuTimes, CtxSwitches, IoCounters, MemoryInfo, MemoryMap, PageFaults, Pid, ProcessState,
    Rlimit, Tags,
};
use crate::services::cpu::{CpuReading, CpuSampler};
use crate::services::process_table::ProcessTable;

/// A view onto one running OS process.
///
/// All accessors except [`Process::pid`] and the tag accessors query the OS
/// each time they are called. Once the process has exited they fail with
/// [`ProcessError::Unavailable`] and the handle should be dropped: the PID
/// may already belong to some other process.
pub trait Process: Send {
    fn pid(&self) -> Pid;

    /// Tags set by the collector on this handle.
    fn tags(&self) -> &Tags;
    fn tags_mut(&mut self) -> &mut Tags;

    fn page_faults(&self) -> Result<PageFaults, ProcessError>;
    fn io_counters(&self) -> Result<IoCounters, ProcessError>;
    fn memory_info(&self) -> Result<MemoryInfo, ProcessError>;
    /// With `grouped`, all mappings are summed into a single entry.
    fn memory_maps(&self, grouped: bool) -> Result<Vec<MemoryMap>, ProcessError>;
    fn name(&self) -> Result<String, ProcessError>;
    fn cmdline(&self) -> Result<String, ProcessError>;
    fn num_ctx_switches(&self) -> Result<CtxSwitches, ProcessError>;
    fn num_fds(&self) -> Result<u32, ProcessError>;
    fn num_threads(&self) -> Result<u32, ProcessError>;
    fn memory_percent(&self) -> Result<f32, ProcessError>;
    fn cpu_times(&self) -> Result<CpuTimes, ProcessError>;
    fn rlimit_usage(&self, include_used: bool) -> Result<Vec<Rlimit>, ProcessError>;
    fn username(&self) -> Result<String, ProcessError>;
    /// Milliseconds since the Unix epoch
    fn create_time(&self) -> Result<i64, ProcessError>;
    fn ppid(&self) -> Result<Pid, ProcessError>;
    fn status(&self) -> Result<Vec<ProcessState>, ProcessError>;

    /// CPU usage since the previous call on this handle, in percent of one
    /// CPU.
    ///
    /// The first call only records a baseline and returns
    /// [`ProcessError::CpuBaselineNotReady`]. `_interval` is accepted for
    /// symmetry with blocking samplers but never waited on; the caller's poll
    /// period is the sampling window.
    fn cpu_percent(&mut self, interval: Duration) -> Result<f64, ProcessError>;
}

/// Process handle backed by a [`ProcessTable`].
pub struct Proc<T: ProcessTable> {
    pid: Pid,
    tags: Tags,
    cpu: CpuSampler,
    table: Arc<T>,
}

impl<T: ProcessTable> Proc<T> {
    /// Fails when `pid` is not (or no longer) in the table.
    pub fn new(table: Arc<T>, pid: Pid) -> Result<Self, ProcessError> {
        table.ensure_exists(pid)?;
        Ok(Self {
            pid,
            tags: Tags::new(),
            cpu: CpuSampler::new(),
            table,
        })
    }
}

impl<T: ProcessTable> Process for Proc<T> {
    fn pid(&self) -> Pid {
        self.pid
    }

    fn tags(&self) -> &Tags {
        &self.tags
    }

    fn tags_mut(&mut self) -> &mut Tags {
        &mut self.tags
    }

    fn page_faults(&self) -> Result<PageFaults, ProcessError> {
        self.table.page_faults(self.pid)
    }

    fn io_counters(&self) -> Result<IoCounters, ProcessError> {
        self.table.io_counters(self.pid)
    }

    fn memory_info(&self) -> Result<MemoryInfo, ProcessError> {
        self.table.memory_info(self.pid)
    }

    fn memory_maps(&self, grouped: bool) -> Result<Vec<MemoryMap>, ProcessError> {
        let maps = self.table.memory_maps(self.pid)?;
        if grouped {
            Ok(vec![MemoryMap::grouped(&maps)])
        } else {
            Ok(maps)
        }
    }

    fn name(&self) -> Result<String, ProcessError> {
        self.table.name(self.pid)
    }

    fn cmdline(&self) -> Result<String, ProcessError> {
        self.table.cmdline(self.pid)
    }

    fn num_ctx_switches(&self) -> Result<CtxSwitches, ProcessError> {
        self.table.num_ctx_switches(self.pid)
    }

    fn num_fds(&self) -> Result<u32, ProcessError> {
        self.table.num_fds(self.pid)
    }

    fn num_threads(&self) -> Result<u32, ProcessError> {
        self.table.num_threads(self.pid)
    }

    fn memory_percent(&self) -> Result<f32, ProcessError> {
        self.table.memory_percent(self.pid)
    }

    fn cpu_times(&self) -> Result<CpuTimes, ProcessError> {
        self.table.cpu_times(self.pid)
    }

    fn rlimit_usage(&self, include_used: bool) -> Result<Vec<Rlimit>, ProcessError> {
        self.table.rlimits(self.pid, include_used)
    }

    fn username(&self) -> Result<String, ProcessError> {
        self.table.username(self.pid)
    }

    fn create_time(&self) -> Result<i64, ProcessError> {
        self.table.create_time(self.pid)
    }

    fn ppid(&self) -> Result<Pid, ProcessError> {
        self.table.ppid(self.pid)
    }

    fn status(&self) -> Result<Vec<ProcessState>, ProcessError> {
        self.table.status(self.pid)
    }

    fn cpu_percent(&mut self, _interval: Duration) -> Result<f64, ProcessError> {
        // a failed read leaves the sampler where it was
        let times = self.table.cpu_times(self.pid)?;
        match self.cpu.sample(times.total(), Instant::now(), self.table.cpu_count()) {
            CpuReading::Baseline => Err(ProcessError::CpuBaselineNotReady),
            CpuReading::Percent(percent) => Ok(percent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fake_table::{FakeRecord, FakeTable};
    use std::thread;

    fn table_with(pid: i32) -> Arc<FakeTable> {
        let table = Arc::new(FakeTable::new(2));
        table.insert(FakeRecord::new(pid, "nginx", "nginx -g daemon off;"));
        table
    }

    fn assert_unavailable<V: std::fmt::Debug>(result: Result<V, ProcessError>) {
        match result {
            Err(ProcessError::Unavailable { .. }) => {}
            other => panic!("expected unavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_new_fails_for_missing_pid() {
        let table = table_with(100);
        assert_unavailable(Proc::new(table, Pid::new(101)).map(|p| p.pid()));
    }

    #[test]
    fn test_accessors_fail_after_exit() {
        let table = table_with(100);
        let mut proc = Proc::new(table.clone(), Pid::new(100)).unwrap();
        assert_eq!(proc.name().unwrap(), "nginx");

        table.remove(Pid::new(100));

        assert_eq!(proc.pid(), Pid::new(100));
        assert_unavailable(proc.page_faults());
        assert_unavailable(proc.io_counters());
        assert_unavailable(proc.memory_info());
        assert_unavailable(proc.memory_maps(true));
        assert_unavailable(proc.memory_maps(false));
        assert_unavailable(proc.name());
        assert_unavailable(proc.cmdline());
        assert_unavailable(proc.num_ctx_switches());
        assert_unavailable(proc.num_fds());
        assert_unavailable(proc.num_threads());
        assert_unavailable(proc.memory_percent());
        assert_unavailable(proc.cpu_times());
        assert_unavailable(proc.rlimit_usage(true));
        assert_unavailable(proc.username());
        assert_unavailable(proc.create_time());
        assert_unavailable(proc.ppid());
        assert_unavailable(proc.status());
        assert_unavailable(proc.cpu_percent(Duration::ZERO));
    }

    #[test]
    fn test_access_denied_is_unavailable() {
        let table = table_with(100);
        let proc = Proc::new(table.clone(), Pid::new(100)).unwrap();
        table.deny(Pid::new(100));

        assert_unavailable(proc.io_counters());
        assert_unavailable(proc.num_fds());
    }

    #[test]
    fn test_first_cpu_percent_is_baseline_not_ready() {
        let table = table_with(100);
        let mut proc = Proc::new(table.clone(), Pid::new(100)).unwrap();

        // elapsed time before the first call does not matter
        thread::sleep(Duration::from_millis(10));
        table.add_cpu_time(Pid::new(100), 5.0);

        let err = proc.cpu_percent(Duration::from_secs(10)).unwrap_err();
        assert!(err.is_baseline_not_ready());
    }

    #[test]
    fn test_second_cpu_percent_is_bounded() {
        let table = table_with(100);
        let mut proc = Proc::new(table.clone(), Pid::new(100)).unwrap();
        assert!(proc.cpu_percent(Duration::ZERO).is_err());

        thread::sleep(Duration::from_millis(5));
        table.add_cpu_time(Pid::new(100), 0.004);

        let percent = proc.cpu_percent(Duration::ZERO).unwrap();
        assert!((0.0..=200.0).contains(&percent), "percent out of range: {}", percent);

        // a third call keeps working against the new baseline
        thread::sleep(Duration::from_millis(5));
        let percent = proc.cpu_percent(Duration::ZERO).unwrap();
        assert_eq!(percent, 0.0);
    }

    #[test]
    fn test_failed_cpu_read_does_not_baseline() {
        let table = table_with(100);
        let mut proc = Proc::new(table.clone(), Pid::new(100)).unwrap();

        table.deny(Pid::new(100));
        assert_unavailable(proc.cpu_percent(Duration::ZERO));

        table.allow(Pid::new(100));
        assert!(proc.cpu_percent(Duration::ZERO).unwrap_err().is_baseline_not_ready());
    }

    #[test]
    fn test_recreated_handle_rebaselines() {
        let table = table_with(100);
        let mut proc = Proc::new(table.clone(), Pid::new(100)).unwrap();
        assert!(proc.cpu_percent(Duration::ZERO).is_err());
        assert!(proc.cpu_percent(Duration::ZERO).is_ok());

        let mut again = Proc::new(table, Pid::new(100)).unwrap();
        assert!(again.cpu_percent(Duration::ZERO).unwrap_err().is_baseline_not_ready());
    }

    #[test]
    fn test_tags_are_shared_not_copied() {
        let table = table_with(100);
        let mut proc = Proc::new(table, Pid::new(100)).unwrap();
        assert!(proc.tags().is_empty());

        proc.tags_mut().insert("pattern".to_string(), "nginx".to_string());
        proc.tags_mut().insert("env".to_string(), "prod".to_string());

        assert_eq!(proc.tags().get("pattern").map(String::as_str), Some("nginx"));
        assert_eq!(proc.tags().len(), 2);
    }

    #[test]
    fn test_memory_maps_grouped() {
        let table = Arc::new(FakeTable::new(1));
        table.insert(FakeRecord::new(7, "redis", "redis-server").with_memory_maps(vec![
            MemoryMap { path: "[heap]".into(), rss: 100, ..Default::default() },
            MemoryMap { path: "[stack]".into(), rss: 20, ..Default::default() },
        ]));
        let proc = Proc::new(table, Pid::new(7)).unwrap();

        assert_eq!(proc.memory_maps(false).unwrap().len(), 2);
        let grouped = proc.memory_maps(true).unwrap();
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].rss, 120);
    }
}
