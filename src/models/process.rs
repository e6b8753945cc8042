use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Tags attached to a process handle by the collector.
pub type Tags = HashMap<String, String>;

/// OS process identifier.
///
/// Only unique for the lifetime of the process it names; the kernel hands the
/// same number out again once that process has exited.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Pid(i32);

impl Pid {
    pub const fn new(pid: i32) -> Self {
        Self(pid)
    }

    pub fn as_i32(self) -> i32 {
        self.0
    }
}

impl From<i32> for Pid {
    fn from(pid: i32) -> Self {
        Self(pid)
    }
}

impl From<Pid> for i32 {
    fn from(pid: Pid) -> Self {
        pid.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Pid {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i32>().map(Pid)
    }
}

/// One row of a process table scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: Pid,
    /// Parent PID, if the OS reports one
    pub parent: Option<Pid>,
    /// Short process name (comm on Linux)
    pub name: String,
    /// Executable and arguments joined by single spaces
    pub cmdline: String,
    /// Owning user name, when it resolves
    pub user: Option<String>,
}
