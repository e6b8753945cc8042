use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::error::SelectorError;
use crate::models::{Pid, ProcessEntry, Selector};
use crate::services::process_table::ProcessTable;

/// Resolves selectors into the PIDs that currently satisfy them.
///
/// Patterns use `regex` crate syntax and match anywhere in the subject
/// (`nginx` matches `nginx: worker`; anchor with `^...$` for an exact match).
/// Every call scans the process table once and returns PIDs sorted and
/// deduplicated. A PID may have exited by the time a handle is built for it.
pub trait PidFinder {
    /// Reads a single PID from `path`. The PID is not checked for existence.
    fn by_pid_file(&self, path: &Path) -> Result<Vec<Pid>, SelectorError>;
    /// Matches the process name.
    fn by_pattern(&self, pattern: &str) -> Result<Vec<Pid>, SelectorError>;
    /// Matches the owning user name.
    fn by_user(&self, user: &str) -> Result<Vec<Pid>, SelectorError>;
    /// Matches the full command line.
    fn by_full_pattern(&self, pattern: &str) -> Result<Vec<Pid>, SelectorError>;
    /// Direct children of processes whose full command line matches.
    fn by_child_pattern(&self, pattern: &str) -> Result<Vec<Pid>, SelectorError>;

    fn find(&self, selector: &Selector) -> Result<Vec<Pid>, SelectorError> {
        match selector {
            Selector::PidFile(path) => self.by_pid_file(path),
            Selector::Pattern(p) => self.by_pattern(p),
            Selector::User(u) => self.by_user(u),
            Selector::FullPattern(p) => self.by_full_pattern(p),
            Selector::ChildPattern(p) => self.by_child_pattern(p),
        }
    }
}

/// [`PidFinder`] over a [`ProcessTable`].
pub struct TableFinder<T: ProcessTable> {
    table: Arc<T>,
}

impl<T: ProcessTable> TableFinder<T> {
    pub fn new(table: Arc<T>) -> Self {
        Self { table }
    }

    fn matching(
        &self,
        pattern: &str,
        subject: fn(&ProcessEntry) -> &str,
    ) -> Result<Vec<Pid>, SelectorError> {
        let regex = compile(pattern)?;
        Ok(sorted(
            self.table
                .processes()
                .iter()
                .filter(|p| regex.is_match(subject(p)))
                .map(|p| p.pid),
        ))
    }
}

impl<T: ProcessTable> PidFinder for TableFinder<T> {
    fn by_pid_file(&self, path: &Path) -> Result<Vec<Pid>, SelectorError> {
        let content = fs::read_to_string(path).map_err(|source| SelectorError::PidFileRead {
            path: path.to_path_buf(),
            source,
        })?;

        match content.trim().parse::<i32>() {
            Ok(pid) if pid > 0 => Ok(vec![Pid::new(pid)]),
            _ => Err(SelectorError::PidFileParse {
                path: path.to_path_buf(),
                content: content.trim().to_string(),
            }),
        }
    }

    fn by_pattern(&self, pattern: &str) -> Result<Vec<Pid>, SelectorError> {
        self.matching(pattern, |p| p.name.as_str())
    }

    fn by_user(&self, user: &str) -> Result<Vec<Pid>, SelectorError> {
        if !self.table.user_exists(user) {
            return Err(SelectorError::UnknownUser(user.to_string()));
        }

        Ok(sorted(
            self.table
                .processes()
                .iter()
                .filter(|p| p.user.as_deref() == Some(user))
                .map(|p| p.pid),
        ))
    }

    fn by_full_pattern(&self, pattern: &str) -> Result<Vec<Pid>, SelectorError> {
        self.matching(pattern, |p| p.cmdline.as_str())
    }

    fn by_child_pattern(&self, pattern: &str) -> Result<Vec<Pid>, SelectorError> {
        let regex = compile(pattern)?;
        let processes = self.table.processes();

        let parents: BTreeSet<Pid> = processes
            .iter()
            .filter(|p| regex.is_match(&p.cmdline))
            .map(|p| p.pid)
            .collect();

        if parents.is_empty() {
            return Ok(Vec::new());
        }

        Ok(sorted(
            processes
                .iter()
                .filter(|p| p.parent.is_some_and(|ppid| parents.contains(&ppid)))
                .map(|p| p.pid),
        ))
    }
}

fn compile(pattern: &str) -> Result<Regex, SelectorError> {
    Regex::new(pattern).map_err(|source| SelectorError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

fn sorted(pids: impl Iterator<Item = Pid>) -> Vec<Pid> {
    pids.collect::<BTreeSet<_>>().into_iter().collect()
}
