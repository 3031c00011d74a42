//! Lifecycle controller behavior against a real store and file sink.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;

use launchpad_core::{
    persistence::{self, FileSink},
    ports::EPHEMERAL_PORTS,
    AppRecord, AppStatus, Launcher, LifecycleController, LifecycleError, RandomPorts,
    Registration, RegistryStore, PortSource, StartFailure, StartOutcome, StopOutcome,
};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RecordingLauncher {
    launched: Mutex<Vec<(String, u16)>>,
}

impl Launcher for RecordingLauncher {
    fn launch(&self, record: &AppRecord, port: u16) -> std::io::Result<()> {
        self.launched
            .lock()
            .unwrap()
            .push((record.name.to_string(), port));
        Ok(())
    }
}

/// Replays a fixed sequence of draws, then repeats the last one.
struct ScriptedPorts(Mutex<VecDeque<u16>>);

impl ScriptedPorts {
    fn new(ports: &[u16]) -> Self {
        Self(Mutex::new(ports.iter().copied().collect()))
    }
}

impl PortSource for ScriptedPorts {
    fn draw(&self) -> u16 {
        let mut queue = self.0.lock().unwrap();
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().copied().unwrap_or(0)
        }
    }
}

struct Harness {
    _dir: TempDir,
    state_file: PathBuf,
    launcher: Arc<RecordingLauncher>,
    controller: Arc<LifecycleController>,
}

fn harness_with(ports: Arc<dyn PortSource>) -> Harness {
    let dir = TempDir::new().expect("tempdir");
    let state_file = dir.path().join("apps.json");
    let store = RegistryStore::new(vec![], Arc::new(FileSink::new(&state_file))).expect("store");
    let launcher = Arc::new(RecordingLauncher::default());
    let controller = Arc::new(LifecycleController::new(
        Arc::new(store),
        launcher.clone(),
        ports,
    ));
    Harness {
        _dir: dir,
        state_file,
        launcher,
        controller,
    }
}

fn harness() -> Harness {
    harness_with(Arc::new(RandomPorts))
}

fn registration(name: &str) -> Registration {
    Registration {
        name: name.to_string(),
        path: PathBuf::from(format!("apps/{name}.js")),
        team: "platform".to_string(),
        log_request: true,
    }
}

// ---------------------------------------------------------------------------
// 1. Register
// ---------------------------------------------------------------------------

#[test]
fn duplicate_registration_is_rejected() {
    let h = harness();
    h.controller.register(registration("api")).expect("first register");

    let err = h.controller.register(registration("api")).unwrap_err();
    assert!(matches!(err, LifecycleError::AlreadyExists { .. }), "got: {err}");

    let count = h
        .controller
        .list()
        .iter()
        .filter(|r| r.name.as_str() == "api")
        .count();
    assert_eq!(count, 1);
    assert_eq!(h.launcher.launched.lock().unwrap().len(), 1, "no second launch");
}

#[test]
fn registered_ports_are_ephemeral_and_unique() {
    let h = harness();
    for i in 0..50 {
        h.controller
            .register(registration(&format!("app-{i}")))
            .expect("register");
    }

    let records = h.controller.list();
    let ports: Vec<u16> = records.iter().map(|r| r.port.expect("running port")).collect();
    assert!(ports.iter().all(|p| EPHEMERAL_PORTS.contains(p)));
    assert_eq!(ports.iter().collect::<HashSet<_>>().len(), ports.len());
}

#[test]
fn collision_with_running_app_redraws() {
    let h = harness_with(Arc::new(ScriptedPorts::new(&[50000, 50000, 50000, 50001])));
    assert_eq!(h.controller.register(registration("a")).unwrap(), 50000);
    assert_eq!(h.controller.register(registration("b")).unwrap(), 50001);
}

#[test]
fn exhausted_port_budget_fails_registration() {
    let h = harness_with(Arc::new(ScriptedPorts::new(&[50000])));
    h.controller.register(registration("a")).expect("register a");

    let err = h.controller.register(registration("b")).unwrap_err();
    assert!(matches!(err, LifecycleError::PortExhausted { .. }), "got: {err}");
    assert!(h.controller.store().get("b").is_err());
}

#[test]
fn registration_is_persisted() {
    let h = harness();
    h.controller.register(registration("api")).expect("register");

    let on_disk = persistence::load_at(&h.state_file).expect("load");
    assert_eq!(on_disk, h.controller.list());
    assert_eq!(on_disk[0].status, AppStatus::Running);
}

// ---------------------------------------------------------------------------
// 2. Start / stop
// ---------------------------------------------------------------------------

#[test]
fn start_on_running_app_is_idempotent() {
    let h = harness();
    let port = h.controller.register(registration("api")).expect("register");

    let outcome = h.controller.start("api").expect("start");
    assert_eq!(outcome, StartOutcome::AlreadyRunning { port: Some(port) });
    assert_eq!(h.controller.store().get("api").unwrap().port, Some(port));
    assert_eq!(h.launcher.launched.lock().unwrap().len(), 1);
}

#[test]
fn stop_then_start_cycles_status() {
    let h = harness();
    h.controller.register(registration("api")).expect("register");

    assert_eq!(h.controller.stop("api").unwrap(), StopOutcome::Stopped);
    let stopped = h.controller.store().get("api").unwrap();
    assert_eq!(stopped.status, AppStatus::Stopped);
    assert_eq!(stopped.port, None);

    assert_eq!(h.controller.stop("api").unwrap(), StopOutcome::AlreadyStopped);

    let StartOutcome::Started { port } = h.controller.start("api").unwrap() else {
        panic!("expected a fresh start");
    };
    let running = h.controller.store().get("api").unwrap();
    assert_eq!(running.status, AppStatus::Running);
    assert_eq!(running.port, Some(port));
    assert!(EPHEMERAL_PORTS.contains(&port));

    let on_disk = persistence::load_at(&h.state_file).expect("load");
    assert_eq!(on_disk[0], running);
}

#[test]
fn unknown_names_are_not_found() {
    let h = harness();
    assert!(matches!(
        h.controller.start("ghost"),
        Err(LifecycleError::NotFound { .. })
    ));
    assert!(matches!(
        h.controller.stop("ghost"),
        Err(LifecycleError::NotFound { .. })
    ));
}

// ---------------------------------------------------------------------------
// 3. Start multiple
// ---------------------------------------------------------------------------

#[test]
fn start_multiple_isolates_failures_and_keeps_order() {
    let h = harness();
    h.controller.register(registration("a")).expect("register a");
    h.controller.register(registration("b")).expect("register b");
    h.controller.stop("a").expect("stop a");
    h.controller.stop("b").expect("stop b");

    let report = h.controller.start_multiple(&["a", "missing", "a", "b"]);

    let started: Vec<_> = report.started.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(started, ["a", "b"]);

    let failed: Vec<_> = report.failed.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(failed, ["missing", "a"]);
    assert!(matches!(
        report.failed[0].1,
        StartFailure::Error(LifecycleError::NotFound { .. })
    ));
    assert!(matches!(report.failed[1].1, StartFailure::AlreadyRunning));
}

// ---------------------------------------------------------------------------
// 4. Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_start_and_stop_end_consistent() {
    let h = harness();
    h.controller.register(registration("api")).expect("register");

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let controller = h.controller.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    if i % 2 == 0 {
                        controller.start("api").expect("start");
                    } else {
                        controller.stop("api").expect("stop");
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker panicked");
    }

    let record = h.controller.store().get("api").expect("get");
    match record.status {
        AppStatus::Running => assert!(record.port.is_some_and(|p| EPHEMERAL_PORTS.contains(&p))),
        AppStatus::Stopped => assert_eq!(record.port, None),
        AppStatus::Registered => panic!("registered is never re-entered"),
    }

    // The last snapshot written matches the final in-memory state.
    let on_disk = persistence::load_at(&h.state_file).expect("load");
    assert_eq!(on_disk, vec![record]);
}

#[test]
fn concurrent_registrations_of_one_name_admit_exactly_one() {
    let h = harness();
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let controller = h.controller.clone();
            thread::spawn(move || controller.register(registration("api")).is_ok())
        })
        .collect();
    let winners = handles
        .into_iter()
        .map(|h| h.join().expect("worker panicked"))
        .filter(|ok| *ok)
        .count();
    assert_eq!(winners, 1);
    assert_eq!(h.controller.list().len(), 1);
}
