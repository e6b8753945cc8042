//! In-memory process table for tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use crate::error::ProcessError;
use crate::models::{
    CpuTimes, CtxSwitches, IoCounters, MemoryInfo, MemoryMap, PageFaults, Pid, ProcessEntry,
    ProcessState, Rlimit,
};
use crate::services::process_table::ProcessTable;

/// A synthetic process.
#[derive(Debug, Clone)]
pub struct FakeRecord {
    pub pid: Pid,
    pub parent: Option<Pid>,
    pub name: String,
    pub cmdline: String,
    pub user: Option<String>,
    pub create_time: i64,
    pub status: Vec<ProcessState>,
    pub cpu_times: CpuTimes,
    pub memory: MemoryInfo,
    pub memory_percent: f32,
    pub memory_maps: Vec<MemoryMap>,
    pub io: IoCounters,
    pub page_faults: PageFaults,
    pub ctx_switches: CtxSwitches,
    pub num_fds: u32,
    pub num_threads: u32,
    pub rlimits: Vec<Rlimit>,
    /// Every accessor fails with access denied while set
    pub denied: bool,
}

impl FakeRecord {
    pub fn new(pid: i32, name: &str, cmdline: &str) -> Self {
        Self {
            pid: Pid::new(pid),
            parent: None,
            name: name.to_string(),
            cmdline: cmdline.to_string(),
            user: None,
            create_time: 0,
            status: vec![ProcessState::Sleep],
            cpu_times: CpuTimes::default(),
            memory: MemoryInfo::default(),
            memory_percent: 0.0,
            memory_maps: Vec::new(),
            io: IoCounters::default(),
            page_faults: PageFaults::default(),
            ctx_switches: CtxSwitches::default(),
            num_fds: 0,
            num_threads: 1,
            rlimits: Vec::new(),
            denied: false,
        }
    }

    pub fn with_parent(mut self, parent: i32) -> Self {
        self.parent = Some(Pid::new(parent));
        self
    }

    pub fn with_user(mut self, user: &str) -> Self {
        self.user = Some(user.to_string());
        self
    }

    pub fn with_memory(mut self, memory: MemoryInfo) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_memory_maps(mut self, maps: Vec<MemoryMap>) -> Self {
        self.memory_maps = maps;
        self
    }

    pub fn with_rlimits(mut self, rlimits: Vec<Rlimit>) -> Self {
        self.rlimits = rlimits;
        self
    }

    fn entry(&self) -> ProcessEntry {
        ProcessEntry {
            pid: self.pid,
            parent: self.parent,
            name: self.name.clone(),
            cmdline: self.cmdline.clone(),
            user: self.user.clone(),
        }
    }
}

#[derive(Default)]
struct FakeInner {
    records: BTreeMap<Pid, FakeRecord>,
    users: BTreeSet<String>,
}

/// Process table backed by a map of [`FakeRecord`]s.
pub struct FakeTable {
    inner: Mutex<FakeInner>,
    cpus: usize,
}

impl FakeTable {
    pub fn new(cpus: usize) -> Self {
        Self {
            inner: Mutex::new(FakeInner::default()),
            cpus,
        }
    }

    /// Adds or replaces a record. Its user, if any, becomes a known account.
    pub fn insert(&self, record: FakeRecord) {
        let mut inner = self.lock();
        if let Some(user) = &record.user {
            inner.users.insert(user.clone());
        }
        inner.records.insert(record.pid, record);
    }

    pub fn remove(&self, pid: Pid) -> Option<FakeRecord> {
        self.lock().records.remove(&pid)
    }

    pub fn add_user(&self, user: &str) {
        self.lock().users.insert(user.to_string());
    }

    /// Charges `seconds` of user CPU time to `pid`.
    pub fn add_cpu_time(&self, pid: Pid, seconds: f64) {
        if let Some(record) = self.lock().records.get_mut(&pid) {
            record.cpu_times.user += seconds;
        }
    }

    pub fn deny(&self, pid: Pid) {
        self.set_denied(pid, true);
    }

    pub fn allow(&self, pid: Pid) {
        self.set_denied(pid, false);
    }

    fn set_denied(&self, pid: Pid, denied: bool) {
        if let Some(record) = self.lock().records.get_mut(&pid) {
            record.denied = denied;
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn with_record<V>(&self, pid: Pid, f: impl FnOnce(&FakeRecord) -> V) -> Result<V, ProcessError> {
        let inner = self.lock();
        match inner.records.get(&pid) {
            None => Err(ProcessError::not_found(pid)),
            Some(record) if record.denied => Err(ProcessError::access_denied(pid)),
            Some(record) => Ok(f(record)),
        }
    }
}

impl ProcessTable for FakeTable {
    fn processes(&self) -> Vec<ProcessEntry> {
        self.lock().records.values().map(FakeRecord::entry).collect()
    }

    fn user_exists(&self, user: &str) -> bool {
        self.lock().users.contains(user)
    }

    fn cpu_count(&self) -> usize {
        self.cpus
    }

    fn ensure_exists(&self, pid: Pid) -> Result<(), ProcessError> {
        if self.lock().records.contains_key(&pid) {
            Ok(())
        } else {
            Err(ProcessError::not_found(pid))
        }
    }

    fn name(&self, pid: Pid) -> Result<String, ProcessError> {
        self.with_record(pid, |r| r.name.clone())
    }

    fn cmdline(&self, pid: Pid) -> Result<String, ProcessError> {
        self.with_record(pid, |r| r.cmdline.clone())
    }

    fn username(&self, pid: Pid) -> Result<String, ProcessError> {
        self.with_record(pid, |r| r.user.clone())?
            .ok_or_else(|| ProcessError::not_found(pid))
    }

    fn create_time(&self, pid: Pid) -> Result<i64, ProcessError> {
        self.with_record(pid, |r| r.create_time)
    }

    fn ppid(&self, pid: Pid) -> Result<Pid, ProcessError> {
        self.with_record(pid, |r| r.parent.unwrap_or_default())
    }

    fn status(&self, pid: Pid) -> Result<Vec<ProcessState>, ProcessError> {
        self.with_record(pid, |r| r.status.clone())
    }

    fn cpu_times(&self, pid: Pid) -> Result<CpuTimes, ProcessError> {
        self.with_record(pid, |r| r.cpu_times)
    }

    fn memory_info(&self, pid: Pid) -> Result<MemoryInfo, ProcessError> {
        self.with_record(pid, |r| r.memory)
    }

    fn memory_percent(&self, pid: Pid) -> Result<f32, ProcessError> {
        self.with_record(pid, |r| r.memory_percent)
    }

    fn memory_maps(&self, pid: Pid) -> Result<Vec<MemoryMap>, ProcessError> {
        self.with_record(pid, |r| r.memory_maps.clone())
    }

    fn page_faults(&self, pid: Pid) -> Result<PageFaults, ProcessError> {
        self.with_record(pid, |r| r.page_faults)
    }

    fn io_counters(&self, pid: Pid) -> Result<IoCounters, ProcessError> {
        self.with_record(pid, |r| r.io)
    }

    fn num_ctx_switches(&self, pid: Pid) -> Result<CtxSwitches, ProcessError> {
        self.with_record(pid, |r| r.ctx_switches)
    }

    fn num_fds(&self, pid: Pid) -> Result<u32, ProcessError> {
        self.with_record(pid, |r| r.num_fds)
    }

    fn num_threads(&self, pid: Pid) -> Result<u32, ProcessError> {
        self.with_record(pid, |r| r.num_threads)
    }

    fn rlimits(&self, pid: Pid, include_used: bool) -> Result<Vec<Rlimit>, ProcessError> {
        self.with_record(pid, |r| {
            r.rlimits
                .iter()
                .map(|limit| Rlimit {
                    used: if include_used { limit.used } else { None },
                    ..*limit
                })
                .collect()
        })
    }
}
