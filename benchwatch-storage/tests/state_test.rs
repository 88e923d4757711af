//! State document behavior across independent handles, as seen by
//! separate processes sharing one report directory.

use benchwatch_storage::{RunningMode, StateFile, TaskState};

#[test]
fn two_handles_see_each_others_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("benchwatch.state");
    let a = StateFile::new(&path);
    let b = StateFile::new(&path);

    a.force_benchmark_rounds("abc123", "glmark2", 5).unwrap();
    assert_eq!(b.load().unwrap().scheduled_rounds("abc123", "glmark2"), 5);

    b.set_running_mode(RunningMode::Pause).unwrap();
    assert_eq!(a.load().unwrap().mode, RunningMode::Pause);
}

#[test]
fn mutations_reload_under_the_lock() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("benchwatch.state");
    let a = StateFile::new(&path);
    let b = StateFile::new(&path);

    // A stale in-memory snapshot on `a` must not clobber `b`'s write:
    // the transform always runs against the freshly reloaded document.
    let _stale: TaskState = a.load().unwrap();
    b.force_benchmark_rounds("abc123", "glmark2", 3).unwrap();
    a.force_benchmark_rounds("abc123", "x11perf", 2).unwrap();

    let state = a.load().unwrap();
    assert_eq!(state.scheduled_rounds("abc123", "glmark2"), 3);
    assert_eq!(state.scheduled_rounds("abc123", "x11perf"), 2);
}

#[test]
fn concurrent_writers_have_last_writer_wins_semantics() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("benchwatch.state");

    let mut handles = Vec::new();
    for i in 0..4u32 {
        let path = path.clone();
        handles.push(std::thread::spawn(move || {
            let file = StateFile::new(&path);
            file.force_benchmark_rounds("abc123", &format!("bench{i}"), 2)
                .unwrap();
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    // Every writer's entry survives: each mutation reloaded before writing.
    let state = StateFile::new(&path).load().unwrap();
    for i in 0..4u32 {
        assert_eq!(state.scheduled_rounds("abc123", &format!("bench{i}")), 2);
    }
}
