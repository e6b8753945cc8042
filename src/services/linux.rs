//! `/proc` readers for fields sysinfo does not expose.

use procfs::process::{LimitValue, Limits, MMapPath, Process as ProcfsProcess};
use procfs::ProcError;
use std::io;

use crate::error::{ProcessError, UnavailableReason};
use crate::models::{
    CpuTimes, CtxSwitches, IoCounters, MemoryMap, PageFaults, Pid, Rlimit, RlimitResource,
};

fn open(pid: Pid) -> Result<ProcfsProcess, ProcessError> {
    ProcfsProcess::new(pid.as_i32()).map_err(|e| unavailable(pid, e))
}

fn unavailable(pid: Pid, err: ProcError) -> ProcessError {
    match err {
        ProcError::NotFound(_) => ProcessError::not_found(pid),
        ProcError::PermissionDenied(_) => ProcessError::access_denied(pid),
        ProcError::Io(e, _) => ProcessError::Unavailable {
            pid,
            reason: UnavailableReason::Io(e),
        },
        other => ProcessError::Unavailable {
            pid,
            reason: UnavailableReason::Io(io::Error::other(other.to_string())),
        },
    }
}

/// Fails for thread IDs, which `/proc` also answers for.
pub fn ensure_group_leader(pid: Pid) -> Result<(), ProcessError> {
    let status = open(pid)?.status().map_err(|e| unavailable(pid, e))?;
    if status.tgid != pid.as_i32() {
        return Err(ProcessError::not_found(pid));
    }
    Ok(())
}

/// Start time in milliseconds since the epoch, at clock-tick resolution.
pub fn create_time(pid: Pid) -> Result<i64, ProcessError> {
    let stat = open(pid)?.stat().map_err(|e| unavailable(pid, e))?;
    let boot = procfs::boot_time_secs().map_err(|e| unavailable(pid, e))?;
    let ticks = procfs::ticks_per_second();
    Ok((boot * 1000 + stat.starttime * 1000 / ticks) as i64)
}

pub fn cpu_times(pid: Pid) -> Result<CpuTimes, ProcessError> {
    let stat = open(pid)?.stat().map_err(|e| unavailable(pid, e))?;
    let ticks = procfs::ticks_per_second() as f64;
    Ok(CpuTimes {
        user: stat.utime as f64 / ticks,
        system: stat.stime as f64 / ticks,
    })
}

pub fn swap(pid: Pid) -> Result<u64, ProcessError> {
    let status = open(pid)?.status().map_err(|e| unavailable(pid, e))?;
    Ok(status.vmswap.unwrap_or(0) * 1024)
}

pub fn page_faults(pid: Pid) -> Result<PageFaults, ProcessError> {
    let stat = open(pid)?.stat().map_err(|e| unavailable(pid, e))?;
    Ok(PageFaults {
        minor_faults: stat.minflt,
        major_faults: stat.majflt,
        child_minor_faults: stat.cminflt,
        child_major_faults: stat.cmajflt,
    })
}

pub fn io_counters(pid: Pid) -> Result<IoCounters, ProcessError> {
    let io = open(pid)?.io().map_err(|e| unavailable(pid, e))?;
    Ok(IoCounters {
        read_count: io.syscr,
        write_count: io.syscw,
        read_bytes: io.read_bytes,
        write_bytes: io.write_bytes,
    })
}

pub fn num_ctx_switches(pid: Pid) -> Result<CtxSwitches, ProcessError> {
    let status = open(pid)?.status().map_err(|e| unavailable(pid, e))?;
    Ok(CtxSwitches {
        voluntary: status.voluntary_ctxt_switches.unwrap_or(0),
        involuntary: status.nonvoluntary_ctxt_switches.unwrap_or(0),
    })
}

pub fn num_fds(pid: Pid) -> Result<u32, ProcessError> {
    let count = open(pid)?.fd_count().map_err(|e| unavailable(pid, e))?;
    Ok(count as u32)
}

pub fn num_threads(pid: Pid) -> Result<u32, ProcessError> {
    let stat = open(pid)?.stat().map_err(|e| unavailable(pid, e))?;
    Ok(stat.num_threads.max(0) as u32)
}

pub fn memory_maps(pid: Pid) -> Result<Vec<MemoryMap>, ProcessError> {
    let maps = open(pid)?.smaps().map_err(|e| unavailable(pid, e))?;

    let mut out = Vec::new();
    for map in maps {
        let field = |key: &str| map.extension.map.get(key).copied().unwrap_or(0);
        out.push(MemoryMap {
            path: map_path(&map.pathname),
            size: map.address.1.saturating_sub(map.address.0),
            rss: field("Rss"),
            pss: field("Pss"),
            shared_clean: field("Shared_Clean"),
            shared_dirty: field("Shared_Dirty"),
            private_clean: field("Private_Clean"),
            private_dirty: field("Private_Dirty"),
            referenced: field("Referenced"),
            anonymous: field("Anonymous"),
            swap: field("Swap"),
        });
    }
    Ok(out)
}

fn map_path(path: &MMapPath) -> String {
    match path {
        MMapPath::Path(p) => p.display().to_string(),
        MMapPath::Heap => "[heap]".to_string(),
        MMapPath::Stack => "[stack]".to_string(),
        MMapPath::Vdso => "[vdso]".to_string(),
        MMapPath::Anonymous => String::new(),
        MMapPath::Other(s) => s.clone(),
        other => format!("{:?}", other),
    }
}

pub fn rlimits(pid: Pid, include_used: bool) -> Result<Vec<Rlimit>, ProcessError> {
    let process = open(pid)?;
    let limits = process.limits().map_err(|e| unavailable(pid, e))?;
    let mut rlimits = limit_table(&limits);

    if include_used {
        let stat = process.stat().map_err(|e| unavailable(pid, e))?;
        let status = process.status().map_err(|e| unavailable(pid, e))?;
        let fds = process.fd_count().map_err(|e| unavailable(pid, e))?;
        let ticks = procfs::ticks_per_second();

        for limit in rlimits.iter_mut() {
            limit.used = match limit.resource {
                RlimitResource::CpuTime => Some((stat.utime + stat.stime) / ticks),
                RlimitResource::AddressSpace => Some(stat.vsize),
                RlimitResource::ResidentSet => Some(stat.rss * procfs::page_size()),
                RlimitResource::OpenFiles => Some(fds as u64),
                RlimitResource::DataSize => status.vmdata.map(|kb| kb * 1024),
                RlimitResource::StackSize => status.vmstk.map(|kb| kb * 1024),
                RlimitResource::LockedMemory => status.vmlck.map(|kb| kb * 1024),
                _ => None,
            };
        }
    }

    Ok(rlimits)
}

fn limit_table(limits: &Limits) -> Vec<Rlimit> {
    let entry = |resource, limit: &procfs::process::Limit| Rlimit {
        resource,
        soft: value(&limit.soft_limit),
        hard: value(&limit.hard_limit),
        used: None,
    };

    vec![
        entry(RlimitResource::CpuTime, &limits.max_cpu_time),
        entry(RlimitResource::FileSize, &limits.max_file_size),
        entry(RlimitResource::DataSize, &limits.max_data_size),
        entry(RlimitResource::StackSize, &limits.max_stack_size),
        entry(RlimitResource::CoreFileSize, &limits.max_core_file_size),
        entry(RlimitResource::ResidentSet, &limits.max_resident_set),
        entry(RlimitResource::Processes, &limits.max_processes),
        entry(RlimitResource::OpenFiles, &limits.max_open_files),
        entry(RlimitResource::LockedMemory, &limits.max_locked_memory),
        entry(RlimitResource::AddressSpace, &limits.max_address_space),
        entry(RlimitResource::FileLocks, &limits.max_file_locks),
        entry(RlimitResource::PendingSignals, &limits.max_pending_signals),
        entry(RlimitResource::MsgqueueSize, &limits.max_msgqueue_size),
        entry(RlimitResource::NicePriority, &limits.max_nice_priority),
        entry(RlimitResource::RealtimePriority, &limits.max_realtime_priority),
        entry(RlimitResource::RealtimeTimeout, &limits.max_realtime_timeout),
    ]
}

fn value(limit: &LimitValue) -> Option<u64> {
    match limit {
        LimitValue::Unlimited => None,
        LimitValue::Value(v) => Some(*v),
    }
}
