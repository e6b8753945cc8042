use std::sync::{Mutex, MutexGuard};
use sysinfo::{ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System, UpdateKind, Users};

use crate::error::ProcessError;
use crate::models::{
    CpuTimes, CtxSwitches, IoCounters, MemoryInfo, MemoryMap, PageFaults, Pid, ProcessEntry,
    ProcessState, Rlimit,
};
use crate::services::process_table::ProcessTable;

#[cfg(target_os = "linux")]
use crate::services::linux as os;
#[cfg(not(target_os = "linux"))]
use crate::services::unsupported as os;

/// The host's process table.
///
/// Portable fields come from sysinfo, refreshed for the queried PID on every
/// call. Fields sysinfo does not expose are read from `/proc` on Linux and
/// reported as unsupported elsewhere.
pub struct SystemTable {
    system: Mutex<System>,
    cpus: usize,
}

impl SystemTable {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
            cpus: num_cpus::get(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, System> {
        self.system.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn with_process<V>(
        &self,
        pid: Pid,
        kind: ProcessRefreshKind,
        f: impl FnOnce(&sysinfo::Process, &System) -> V,
    ) -> Result<V, ProcessError> {
        let sys_pid = to_sysinfo(pid).ok_or_else(|| ProcessError::not_found(pid))?;

        let mut guard = self.lock();
        guard.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[sys_pid]),
            true,
            kind.without_tasks(),
        );

        let sys: &System = &guard;
        let process = sys
            .process(sys_pid)
            .filter(|p| p.thread_kind().is_none())
            .ok_or_else(|| ProcessError::not_found(pid))?;
        Ok(f(process, sys))
    }
}

impl Default for SystemTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable for SystemTable {
    fn processes(&self) -> Vec<ProcessEntry> {
        let mut sys = self.lock();
        sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing()
                .without_tasks()
                .with_cmd(UpdateKind::Always)
                .with_user(UpdateKind::OnlyIfNotSet),
        );
        let users = Users::new_with_refreshed_list();

        // threads cached by earlier refreshes stay in the table
        sys.processes()
            .iter()
            .filter(|(_, process)| process.thread_kind().is_none())
            .map(|(pid, process)| ProcessEntry {
                pid: from_sysinfo(*pid),
                parent: process.parent().map(from_sysinfo),
                name: process.name().to_string_lossy().into_owned(),
                cmdline: joined_cmd(process),
                user: process
                    .user_id()
                    .and_then(|uid| users.get_user_by_id(uid))
                    .map(|user| user.name().to_string()),
            })
            .collect()
    }

    fn user_exists(&self, user: &str) -> bool {
        Users::new_with_refreshed_list()
            .list()
            .iter()
            .any(|u| u.name() == user)
    }

    fn cpu_count(&self) -> usize {
        self.cpus
    }

    fn ensure_exists(&self, pid: Pid) -> Result<(), ProcessError> {
        self.with_process(pid, ProcessRefreshKind::nothing(), |_, _| ())?;

        // /proc/<tid> resolves for threads too
        #[cfg(target_os = "linux")]
        os::ensure_group_leader(pid)?;

        Ok(())
    }

    fn name(&self, pid: Pid) -> Result<String, ProcessError> {
        self.with_process(pid, ProcessRefreshKind::nothing(), |p, _| {
            p.name().to_string_lossy().into_owned()
        })
    }

    fn cmdline(&self, pid: Pid) -> Result<String, ProcessError> {
        self.with_process(
            pid,
            ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
            |p, _| joined_cmd(p),
        )
    }

    fn username(&self, pid: Pid) -> Result<String, ProcessError> {
        let uid = self
            .with_process(
                pid,
                ProcessRefreshKind::nothing().with_user(UpdateKind::Always),
                |p, _| p.user_id().cloned(),
            )?
            .ok_or_else(|| ProcessError::unsupported(pid))?;

        Users::new_with_refreshed_list()
            .get_user_by_id(&uid)
            .map(|user| user.name().to_string())
            .ok_or_else(|| ProcessError::not_found(pid))
    }

    fn create_time(&self, pid: Pid) -> Result<i64, ProcessError> {
        #[cfg(target_os = "linux")]
        return os::create_time(pid);

        // sysinfo only has whole seconds
        #[cfg(not(target_os = "linux"))]
        self.with_process(pid, ProcessRefreshKind::nothing(), |p, _| {
            p.start_time() as i64 * 1000
        })
    }

    fn ppid(&self, pid: Pid) -> Result<Pid, ProcessError> {
        self.with_process(pid, ProcessRefreshKind::nothing(), |p, _| {
            p.parent().map(from_sysinfo).unwrap_or_default()
        })
    }

    fn status(&self, pid: Pid) -> Result<Vec<ProcessState>, ProcessError> {
        self.with_process(pid, ProcessRefreshKind::nothing(), |p, _| {
            vec![state_from_sysinfo(p.status())]
        })
    }

    fn cpu_times(&self, pid: Pid) -> Result<CpuTimes, ProcessError> {
        #[cfg(target_os = "linux")]
        return os::cpu_times(pid);

        // sysinfo only reports user and system time combined
        #[cfg(not(target_os = "linux"))]
        self.with_process(pid, ProcessRefreshKind::nothing().with_cpu(), |p, _| CpuTimes {
            user: p.accumulated_cpu_time() as f64 / 1000.0,
            system: 0.0,
        })
    }

    fn memory_info(&self, pid: Pid) -> Result<MemoryInfo, ProcessError> {
        let (rss, vms) = self.with_process(pid, ProcessRefreshKind::nothing().with_memory(), |p, _| {
            (p.memory(), p.virtual_memory())
        })?;
        Ok(MemoryInfo {
            rss,
            vms,
            swap: os::swap(pid).ok(),
        })
    }

    fn memory_percent(&self, pid: Pid) -> Result<f32, ProcessError> {
        let rss = self.with_process(pid, ProcessRefreshKind::nothing().with_memory(), |p, _| {
            p.memory()
        })?;

        let mut sys = self.lock();
        sys.refresh_memory();
        let total = sys.total_memory();
        if total == 0 {
            return Ok(0.0);
        }
        Ok((rss as f64 / total as f64 * 100.0) as f32)
    }

    fn memory_maps(&self, pid: Pid) -> Result<Vec<MemoryMap>, ProcessError> {
        os::memory_maps(pid)
    }

    fn page_faults(&self, pid: Pid) -> Result<PageFaults, ProcessError> {
        os::page_faults(pid)
    }

    fn io_counters(&self, pid: Pid) -> Result<IoCounters, ProcessError> {
        #[cfg(target_os = "linux")]
        return os::io_counters(pid);

        #[cfg(not(target_os = "linux"))]
        self.with_process(pid, ProcessRefreshKind::nothing().with_disk_usage(), |p, _| {
            let usage = p.disk_usage();
            IoCounters {
                read_count: 0,
                write_count: 0,
                read_bytes: usage.total_read_bytes,
                write_bytes: usage.total_written_bytes,
            }
        })
    }

    fn num_ctx_switches(&self, pid: Pid) -> Result<CtxSwitches, ProcessError> {
        os::num_ctx_switches(pid)
    }

    fn num_fds(&self, pid: Pid) -> Result<u32, ProcessError> {
        os::num_fds(pid)
    }

    fn num_threads(&self, pid: Pid) -> Result<u32, ProcessError> {
        os::num_threads(pid)
    }

    fn rlimits(&self, pid: Pid, include_used: bool) -> Result<Vec<Rlimit>, ProcessError> {
        os::rlimits(pid, include_used)
    }
}

fn to_sysinfo(pid: Pid) -> Option<sysinfo::Pid> {
    u32::try_from(pid.as_i32()).ok().map(sysinfo::Pid::from_u32)
}

fn from_sysinfo(pid: sysinfo::Pid) -> Pid {
    Pid::new(pid.as_u32() as i32)
}

fn joined_cmd(process: &sysinfo::Process) -> String {
    process
        .cmd()
        .iter()
        .map(|s| s.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

fn state_from_sysinfo(status: ProcessStatus) -> ProcessState {
    match status {
        ProcessStatus::Run => ProcessState::Running,
        ProcessStatus::Sleep => ProcessState::Sleep,
        ProcessStatus::Idle => ProcessState::Idle,
        ProcessStatus::Stop | ProcessStatus::Tracing => ProcessState::Stop,
        ProcessStatus::Zombie => ProcessState::Zombie,
        ProcessStatus::Dead => ProcessState::Dead,
        ProcessStatus::UninterruptibleDiskSleep => ProcessState::DiskSleep,
        ProcessStatus::LockBlocked => ProcessState::Lock,
        ProcessStatus::Waking | ProcessStatus::Wakekill | ProcessStatus::Parked => ProcessState::Wait,
        _ => ProcessState::Unknown,
    }
}
