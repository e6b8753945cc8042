use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::models::Pid;

/// Why a process could not be queried.
#[derive(Error, Debug)]
pub enum UnavailableReason {
    #[error("no such process")]
    NotFound,

    #[error("permission denied")]
    AccessDenied,

    #[error("not supported on this platform")]
    Unsupported,

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Failures raised by process handle accessors.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The process exited, cannot be read, or the field is not available on
    /// this OS. The handle should be dropped.
    #[error("process {pid} unavailable: {reason}")]
    Unavailable {
        pid: Pid,
        #[source]
        reason: UnavailableReason,
    },

    /// First `cpu_percent` call on a handle. Carries an implied value of 0.0.
    #[error("must call cpu_percent twice to compute percent cpu")]
    CpuBaselineNotReady,
}

impl ProcessError {
    pub fn not_found(pid: Pid) -> Self {
        ProcessError::Unavailable { pid, reason: UnavailableReason::NotFound }
    }

    pub fn access_denied(pid: Pid) -> Self {
        ProcessError::Unavailable { pid, reason: UnavailableReason::AccessDenied }
    }

    pub fn unsupported(pid: Pid) -> Self {
        ProcessError::Unavailable { pid, reason: UnavailableReason::Unsupported }
    }

    pub fn is_baseline_not_ready(&self) -> bool {
        matches!(self, ProcessError::CpuBaselineNotReady)
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, ProcessError::Unavailable { .. })
    }

    /// The value that goes with this error: 0.0 for a baseline that is not
    /// ready yet, `None` for everything else.
    pub fn value_or_zero(&self) -> Option<f64> {
        self.is_baseline_not_ready().then_some(0.0)
    }
}

/// Failures raised while resolving a selector into PIDs.
#[derive(Error, Debug)]
pub enum SelectorError {
    #[error("failed to read pid file {path}: {source}")]
    PidFileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid pid {content:?} in pid file {path}")]
    PidFileParse { path: PathBuf, content: String },

    #[error("invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unknown user {0:?}")]
    UnknownUser(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_signal_is_distinct_from_unavailable() {
        let baseline = ProcessError::CpuBaselineNotReady;
        assert!(baseline.is_baseline_not_ready());
        assert!(!baseline.is_unavailable());
        assert_eq!(baseline.value_or_zero(), Some(0.0));

        let gone = ProcessError::not_found(Pid::new(42));
        assert!(gone.is_unavailable());
        assert_eq!(gone.value_or_zero(), None);
        assert_eq!(gone.to_string(), "process 42 unavailable: no such process");
    }
}
