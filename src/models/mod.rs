pub mod process;
pub mod sample;
pub mod selector;
pub mod stats;

pub use process::{Pid, ProcessEntry, Tags};
pub use sample::ProcessSample;
pub use selector::Selector;
pub use stats::{
    CpuTimes, CtxSwitches, IoCounters, MemoryInfo, MemoryMap, PageFaults, ProcessState, Rlimit,
    RlimitResource,
};
