use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::Selector;
use crate::services::StatsCollector;

/// procstat - per-process resource sampler
///
/// Finds processes by pid file, name, user or command line and prints one
/// JSON sample per matched process every poll.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Pid file to read
    #[arg(long, env = "PROCSTAT_PID_FILE", value_delimiter = ',')]
    pub pid_file: Vec<PathBuf>,

    /// Regex over the process name; repeat the flag for several
    #[arg(short = 'p', long, env = "PROCSTAT_PATTERN")]
    pub pattern: Vec<String>,

    /// Owning user name
    #[arg(short = 'u', long, env = "PROCSTAT_USER", value_delimiter = ',')]
    pub user: Vec<String>,

    /// Regex over the full command line
    #[arg(short = 'f', long, env = "PROCSTAT_FULL_PATTERN")]
    pub full_pattern: Vec<String>,

    /// Regex over the parent's command line; matches its direct children
    #[arg(short = 'c', long, env = "PROCSTAT_CHILD_PATTERN")]
    pub child_pattern: Vec<String>,

    /// Seconds between polls
    #[arg(short, long, env = "PROCSTAT_INTERVAL", default_value_t = 10)]
    pub interval: u64,

    /// Number of polls before exiting, 0 to run until interrupted
    #[arg(short = 'n', long, env = "PROCSTAT_COUNT", default_value_t = 0)]
    pub count: u64,

    /// Include per-mapping memory usage
    #[arg(long)]
    pub memory_maps: bool,

    /// Include resource limits and their usage
    #[arg(long)]
    pub rlimits: bool,
}

impl CommandArgs {
    /// Selectors in flag order: pid files, patterns, users, full patterns,
    /// child patterns.
    pub fn selectors(&self) -> Vec<Selector> {
        let mut selectors = Vec::new();
        selectors.extend(self.pid_file.iter().cloned().map(Selector::PidFile));
        selectors.extend(self.pattern.iter().cloned().map(Selector::Pattern));
        selectors.extend(self.user.iter().cloned().map(Selector::User));
        selectors.extend(self.full_pattern.iter().cloned().map(Selector::FullPattern));
        selectors.extend(self.child_pattern.iter().cloned().map(Selector::ChildPattern));
        selectors
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.interval.max(1))
    }

    pub fn stats_collector(&self) -> StatsCollector {
        StatsCollector {
            memory_maps: self.memory_maps,
            rlimits: self.rlimits,
            interval: self.poll_interval(),
        }
    }
}
