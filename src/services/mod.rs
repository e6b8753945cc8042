pub mod cpu;
pub mod finder;
pub mod process;
pub mod process_table;
pub mod stats_collector;
pub mod system_table;

#[cfg(any(test, feature = "test-utils"))]
pub mod fake_table;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(not(target_os = "linux"))]
mod unsupported;

pub use cpu::{CpuReading, CpuSampler};
pub use finder::{PidFinder, TableFinder};
pub use process::{Proc, Process};
pub use process_table::ProcessTable;
pub use stats_collector::StatsCollector;
pub use system_table::SystemTable;

/// Handle onto a live OS process.
pub type SystemProcess = Proc<SystemTable>;
