use std::io::Write;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use procstat::{Pid, PidFinder, Proc, Process, ProcessError, SelectorError, SystemTable, TableFinder};

fn me() -> Pid {
    Pid::new(process::id() as i32)
}

#[test]
fn test_handle_for_current_process() {
    let table = Arc::new(SystemTable::new());
    let mut proc = Proc::new(table.clone(), me()).unwrap();

    assert_eq!(proc.pid(), me());
    assert!(!proc.name().unwrap().is_empty());
    assert!(proc.memory_percent().unwrap() >= 0.0);

    let err = proc.cpu_percent(Duration::from_secs(1)).unwrap_err();
    assert!(err.is_baseline_not_ready());

    // burn a little CPU so the second reading has something to see
    let mut acc = 0u64;
    for i in 0..2_000_000u64 {
        acc = acc.wrapping_add(i * i);
    }
    assert!(acc > 0);
    thread::sleep(Duration::from_millis(20));

    let percent = proc.cpu_percent(Duration::from_secs(1)).unwrap();
    let ceiling = 100.0 * table_cpus() as f64;
    assert!((0.0..=ceiling).contains(&percent), "percent = {}", percent);
}

fn table_cpus() -> usize {
    use procstat::ProcessTable;
    SystemTable::new().cpu_count()
}

#[test]
fn test_missing_pid_cannot_be_tracked() {
    let table = Arc::new(SystemTable::new());
    match Proc::new(table, Pid::new(999_999_999)) {
        Err(ProcessError::Unavailable { pid, .. }) => assert_eq!(pid, Pid::new(999_999_999)),
        Err(e) => panic!("unexpected error {}", e),
        Ok(_) => panic!("handle built for a missing pid"),
    }
}

#[test]
fn test_current_process_is_found_by_pid_file() {
    let finder = TableFinder::new(Arc::new(SystemTable::new()));
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "{}", me()).unwrap();

    assert_eq!(finder.by_pid_file(file.path()).unwrap(), vec![me()]);
}

#[test]
fn test_pid_file_with_garbage() {
    let finder = TableFinder::new(Arc::new(SystemTable::new()));
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "pid=1234").unwrap();

    assert!(matches!(
        finder.by_pid_file(file.path()),
        Err(SelectorError::PidFileParse { .. })
    ));
}

#[test]
fn test_unmatched_pattern_is_empty() {
    let finder = TableFinder::new(Arc::new(SystemTable::new()));
    assert!(finder.by_pattern("nonexistent-xyz").unwrap().is_empty());
    assert!(finder.by_full_pattern("nonexistent-xyz --no-such-flag").unwrap().is_empty());
}

#[test]
fn test_current_process_is_found_by_full_pattern() {
    let table = Arc::new(SystemTable::new());
    let cmdline = Proc::new(table.clone(), me()).unwrap().cmdline().unwrap();
    let first = cmdline.split(' ').next().unwrap_or_default().to_string();
    let finder = TableFinder::new(table);

    let pids = finder.by_full_pattern(&regex::escape(&first)).unwrap();
    assert!(pids.contains(&me()));
}

#[cfg(target_os = "linux")]
fn own_threads() -> Vec<Pid> {
    std::fs::read_dir("/proc/self/task")
        .unwrap()
        .filter_map(|entry| entry.ok()?.file_name().to_str()?.parse().ok())
        .map(Pid::new)
        .filter(|tid| *tid != me())
        .collect()
}

#[cfg(target_os = "linux")]
#[test]
fn test_threads_are_not_reported_as_processes() {
    let (stop, parked) = std::sync::mpsc::channel::<()>();
    let worker = thread::spawn(move || {
        let _ = parked.recv();
    });

    let tids = own_threads();
    assert!(!tids.is_empty());

    let table = Arc::new(SystemTable::new());
    let cmdline = Proc::new(table.clone(), me()).unwrap().cmdline().unwrap();
    let finder = TableFinder::new(table.clone());
    let pattern = regex::escape(&cmdline);

    let full = finder.by_full_pattern(&pattern).unwrap();
    let children = finder.by_child_pattern(&pattern).unwrap();
    assert!(full.contains(&me()));
    for tid in &tids {
        assert!(!full.contains(tid), "thread {} matched by full pattern", tid);
        assert!(!children.contains(tid), "thread {} reported as a child", tid);
        assert!(Proc::new(table.clone(), *tid).is_err(), "handle built for thread {}", tid);
    }

    drop(stop);
    worker.join().unwrap();
}

#[cfg(unix)]
#[test]
fn test_spawned_child_is_found_by_child_pattern() {
    let mut child = process::Command::new("sleep").arg("30").spawn().unwrap();
    let child_pid = Pid::new(child.id() as i32);

    let table = Arc::new(SystemTable::new());
    let cmdline = Proc::new(table.clone(), me()).unwrap().cmdline().unwrap();
    let finder = TableFinder::new(table);
    let children = finder.by_child_pattern(&regex::escape(&cmdline));

    child.kill().unwrap();
    child.wait().unwrap();

    assert_eq!(children.unwrap(), vec![child_pid]);
}
