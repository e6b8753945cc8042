//! Stand-ins for the `/proc` readers on hosts without procfs.

use crate::error::ProcessError;
use crate::models::{CtxSwitches, MemoryMap, PageFaults, Pid, Rlimit};

pub fn swap(pid: Pid) -> Result<u64, ProcessError> {
    Err(ProcessError::unsupported(pid))
}

pub fn page_faults(pid: Pid) -> Result<PageFaults, ProcessError> {
    Err(ProcessError::unsupported(pid))
}

pub fn num_ctx_switches(pid: Pid) -> Result<CtxSwitches, ProcessError> {
    Err(ProcessError::unsupported(pid))
}

pub fn num_fds(pid: Pid) -> Result<u32, ProcessError> {
    Err(ProcessError::unsupported(pid))
}

pub fn num_threads(pid: Pid) -> Result<u32, ProcessError> {
    Err(ProcessError::unsupported(pid))
}

pub fn memory_maps(pid: Pid) -> Result<Vec<MemoryMap>, ProcessError> {
    Err(ProcessError::unsupported(pid))
}

pub fn rlimits(pid: Pid, _include_used: bool) -> Result<Vec<Rlimit>, ProcessError> {
    Err(ProcessError::unsupported(pid))
}
