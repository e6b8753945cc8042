use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::SelectorError;
use crate::models::{Pid, ProcessSample, Selector, Tags};
use crate::services::{PidFinder, Proc, Process, ProcessTable, StatsCollector};

/// What a [`ProcessTracker::reconcile`] call changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Reconciled {
    /// PIDs that got a new handle
    pub added: Vec<Pid>,
    /// PIDs whose handle was dropped because no selector reports them anymore
    pub removed: Vec<Pid>,
    /// PIDs reported by a selector that exited before a handle could be built
    pub vanished: Vec<Pid>,
}

/// Runs every selector and unions the results.
///
/// Each PID carries one tag per selector that found it. Selectors that fail
/// are returned alongside and do not stop the others.
pub fn find_all(
    finder: &dyn PidFinder,
    selectors: &[Selector],
) -> (BTreeMap<Pid, Tags>, Vec<(Selector, SelectorError)>) {
    let mut found: BTreeMap<Pid, Tags> = BTreeMap::new();
    let mut errors = Vec::new();

    for selector in selectors {
        match finder.find(selector) {
            Ok(pids) => {
                for pid in pids {
                    found
                        .entry(pid)
                        .or_default()
                        .insert(selector.tag_key().to_string(), selector.tag_value());
                }
            }
            Err(e) => errors.push((selector.clone(), e)),
        }
    }

    (found, errors)
}

/// Process handles the collector currently follows, one per live PID.
pub struct ProcessTracker<T: ProcessTable> {
    table: Arc<T>,
    processes: BTreeMap<Pid, Proc<T>>,
}

impl<T: ProcessTable> ProcessTracker<T> {
    pub fn new(table: Arc<T>) -> Self {
        Self {
            table,
            processes: BTreeMap::new(),
        }
    }

    /// Makes the tracked set equal to `found`.
    ///
    /// Existing handles are kept as they are, so their CPU baseline survives.
    /// New PIDs get a fresh handle tagged with `found`'s tags.
    pub fn reconcile(&mut self, found: BTreeMap<Pid, Tags>) -> Reconciled {
        let mut result = Reconciled::default();

        self.processes.retain(|pid, _| {
            let keep = found.contains_key(pid);
            if !keep {
                result.removed.push(*pid);
            }
            keep
        });

        for (pid, tags) in found {
            if self.processes.contains_key(&pid) {
                continue;
            }
            match Proc::new(self.table.clone(), pid) {
                Ok(mut proc) => {
                    proc.tags_mut().extend(tags);
                    self.processes.insert(pid, proc);
                    result.added.push(pid);
                }
                Err(e) => {
                    log::debug!("skipping pid {}: {}", pid, e);
                    result.vanished.push(pid);
                }
            }
        }

        result
    }

    /// Drops the handle for `pid`. Returns whether one was tracked.
    pub fn discard(&mut self, pid: Pid) -> bool {
        self.processes.remove(&pid).is_some()
    }

    pub fn get(&self, pid: Pid) -> Option<&Proc<T>> {
        self.processes.get(&pid)
    }

    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut Proc<T>> {
        self.processes.get_mut(&pid)
    }

    pub fn pids(&self) -> Vec<Pid> {
        self.processes.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// One collection cycle: resolve selectors, reconcile, sample every
    /// handle. Handles whose process is gone are dropped.
    pub fn poll(
        &mut self,
        finder: &dyn PidFinder,
        selectors: &[Selector],
        collector: &StatsCollector,
    ) -> Vec<ProcessSample> {
        let (found, errors) = find_all(finder, selectors);
        for (selector, e) in errors {
            log::warn!("selector {}: {}", selector, e);
        }

        let changes = self.reconcile(found);
        if !changes.added.is_empty() || !changes.removed.is_empty() {
            log::info!(
                "tracking {} processes (+{} -{})",
                self.processes.len(),
                changes.added.len(),
                changes.removed.len()
            );
        }

        let mut samples = Vec::with_capacity(self.processes.len());
        let mut gone = Vec::new();
        for (pid, proc) in self.processes.iter_mut() {
            match collector.collect_stats(proc) {
                Ok(sample) => samples.push(sample),
                Err(e) => {
                    log::debug!("dropping pid {}: {}", pid, e);
                    gone.push(*pid);
                }
            }
        }
        for pid in gone {
            self.discard(pid);
        }

        samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fake_table::{FakeRecord, FakeTable};
    use crate::services::TableFinder;
    use std::time::Duration;

    fn setup() -> (Arc<FakeTable>, TableFinder<FakeTable>, ProcessTracker<FakeTable>) {
        let table = Arc::new(FakeTable::new(2));
        table.insert(FakeRecord::new(10, "redis-server", "redis-server *:6379").with_user("redis"));
        table.insert(FakeRecord::new(20, "nginx", "nginx: master process").with_user("root"));
        table.insert(FakeRecord::new(21, "nginx", "nginx: worker process").with_parent(20).with_user("www-data"));
        let finder = TableFinder::new(table.clone());
        let tracker = ProcessTracker::new(table.clone());
        (table, finder, tracker)
    }

    fn pids(raw: &[i32]) -> Vec<Pid> {
        raw.iter().copied().map(Pid::new).collect()
    }

    #[test]
    fn test_find_all_unions_and_tags() {
        let (_table, finder, _) = setup();
        let selectors = vec![
            Selector::Pattern("nginx".into()),
            Selector::User("redis".into()),
            Selector::ChildPattern("master".into()),
            Selector::User("ghost".into()),
        ];

        let (found, errors) = find_all(&finder, &selectors);
        assert_eq!(found.keys().copied().collect::<Vec<_>>(), pids(&[10, 20, 21]));
        assert_eq!(found[&Pid::new(21)].get("pattern").map(String::as_str), Some("nginx"));
        assert_eq!(found[&Pid::new(21)].get("child_pattern").map(String::as_str), Some("master"));
        assert_eq!(found[&Pid::new(10)].get("user").map(String::as_str), Some("redis"));

        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0].1, SelectorError::UnknownUser(_)));
    }

    #[test]
    fn test_reconcile_adds_and_removes() {
        let (table, finder, mut tracker) = setup();
        let selectors = vec![Selector::Pattern("nginx|redis".into())];

        let (found, _) = find_all(&finder, &selectors);
        let changes = tracker.reconcile(found);
        assert_eq!(changes.added, pids(&[10, 20, 21]));
        assert!(changes.removed.is_empty());
        assert_eq!(tracker.len(), 3);

        table.remove(Pid::new(21));
        table.insert(FakeRecord::new(22, "nginx", "nginx: worker process").with_parent(20));

        let (found, _) = find_all(&finder, &selectors);
        let changes = tracker.reconcile(found);
        assert_eq!(changes.added, pids(&[22]));
        assert_eq!(changes.removed, pids(&[21]));
        assert_eq!(tracker.pids(), pids(&[10, 20, 22]));
        assert_eq!(
            tracker.get(Pid::new(22)).unwrap().tags().get("pattern").map(String::as_str),
            Some("nginx|redis")
        );
    }

    #[test]
    fn test_reconcile_skips_pids_that_exit_before_construction() {
        let (_table, _finder, mut tracker) = setup();
        let mut found = BTreeMap::new();
        found.insert(Pid::new(10), Tags::new());
        found.insert(Pid::new(4242), Tags::new());

        let changes = tracker.reconcile(found);
        assert_eq!(changes.added, pids(&[10]));
        assert_eq!(changes.vanished, pids(&[4242]));
        assert!(tracker.get(Pid::new(4242)).is_none());
    }

    #[test]
    fn test_retained_handle_keeps_cpu_baseline() {
        let (_table, finder, mut tracker) = setup();
        let selectors = vec![Selector::Pattern("redis".into())];
        let collector = StatsCollector::new(Duration::from_secs(10));

        let first = tracker.poll(&finder, &selectors, &collector);
        assert_eq!(first.len(), 1);
        assert!(first[0].cpu_percent.is_none());

        let second = tracker.poll(&finder, &selectors, &collector);
        assert_eq!(second.len(), 1);
        assert!(second[0].cpu_percent.is_some());
    }

    #[test]
    fn test_poll_drops_exited_processes() {
        let (table, finder, mut tracker) = setup();
        let (_dir, path) = write_pid_file(20);
        let selectors = vec![Selector::PidFile(path)];
        let collector = StatsCollector::default();

        let samples = tracker.poll(&finder, &selectors, &collector);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].tags.get("pidfile").map(String::is_empty), Some(false));

        // the pid file still names 20, but the process is gone
        table.remove(Pid::new(20));
        let samples = tracker.poll(&finder, &selectors, &collector);
        assert!(samples.is_empty());
        assert!(tracker.is_empty());
    }

    fn write_pid_file(pid: i32) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.pid");
        std::fs::write(&path, format!("{}\n", pid)).unwrap();
        (dir, path)
    }
}
