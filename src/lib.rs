//! Process matching and per-process resource sampling.
//!
//! [`services::PidFinder`] turns a [`models::Selector`] into PIDs,
//! [`services::Process`] reads one process's resource usage, and
//! [`state::ProcessTracker`] keeps a handle per matched PID across polls so
//! CPU percent can be computed between them.

pub mod cli;
pub mod error;
pub mod models;
pub mod services;
pub mod state;

pub use error::{ProcessError, SelectorError, UnavailableReason};
pub use models::{Pid, ProcessSample, Selector, Tags};
pub use services::{PidFinder, Proc, Process, ProcessTable, SystemTable, TableFinder};
pub use state::ProcessTracker;
