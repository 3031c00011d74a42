use std::fs;
use std::net::TcpListener;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::sleep;
use std::time::Duration;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn launchpad_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("launchpad"));
    cmd.env("NO_COLOR", "1")
        .env_remove("LAUNCHPAD_URL")
        .env_remove("LAUNCHPAD_STATE")
        .env_remove("PORT");
    cmd
}

fn seed_state(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("apps.json");
    fs::write(
        &path,
        r#"[
  {"name":"web","path":"web.js","team":"frontend","logRequest":true,"status":"running","port":50001},
  {"name":"jobs","path":"jobs.js","team":"backend","status":"stopped"}
]"#,
    )
    .expect("seed state file");
    path
}

// ---------------------------------------------------------------------------
// list (offline)
// ---------------------------------------------------------------------------

#[test]
fn list_prints_table_from_state_file() {
    let dir = TempDir::new().expect("tempdir");
    let state = seed_state(&dir);

    launchpad_cmd()
        .arg("list")
        .arg("--state-file")
        .arg(&state)
        .assert()
        .success()
        .stdout(contains("2 apps | 1 running"))
        .stdout(contains("web"))
        .stdout(contains("50001"))
        .stdout(contains("jobs"))
        .stdout(contains("stopped"));
}

#[test]
fn list_json_emits_records() {
    let dir = TempDir::new().expect("tempdir");
    let state = seed_state(&dir);

    let assert = launchpad_cmd()
        .args(["list", "--json", "--state-file"])
        .arg(&state)
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let records: serde_json::Value = serde_json::from_str(&stdout).expect("json output");

    assert_eq!(records[0]["name"], "web");
    assert_eq!(records[0]["port"], 50001);
    assert_eq!(records[1]["logRequest"], false);
    assert!(records[1].get("port").is_none());
}

#[test]
fn list_reads_state_file_from_env() {
    let dir = TempDir::new().expect("tempdir");
    let state = seed_state(&dir);

    launchpad_cmd()
        .arg("list")
        .env("LAUNCHPAD_STATE", &state)
        .assert()
        .success()
        .stdout(contains("2 apps"));
}

#[test]
fn list_without_state_file_is_not_an_error() {
    let dir = TempDir::new().expect("tempdir");

    launchpad_cmd()
        .arg("list")
        .arg("--state-file")
        .arg(dir.path().join("missing.json"))
        .assert()
        .success()
        .stdout(contains("No state file"));
}

#[test]
fn list_rejects_corrupt_state_file() {
    let dir = TempDir::new().expect("tempdir");
    let state = dir.path().join("apps.json");
    fs::write(&state, "{ not json").expect("write");

    launchpad_cmd()
        .arg("list")
        .arg("--state-file")
        .arg(&state)
        .assert()
        .failure()
        .stderr(contains("failed to load registry"));
}

// ---------------------------------------------------------------------------
// client commands
// ---------------------------------------------------------------------------

#[test]
fn start_many_requires_at_least_one_name() {
    launchpad_cmd().arg("start-many").assert().failure();
}

#[test]
fn info_reports_unreachable_daemon() {
    // Bind then drop to get a port nothing listens on.
    let port = free_port();
    launchpad_cmd()
        .args(["info", "--server"])
        .arg(format!("http://127.0.0.1:{port}"))
        .assert()
        .failure()
        .stderr(contains("could not reach launchpad"));
}

#[cfg(unix)]
#[test]
fn serve_and_drive_full_lifecycle() {
    let dir = TempDir::new().expect("tempdir");
    let state = dir.path().join("apps.json");
    let port = free_port();
    let server = format!("http://127.0.0.1:{port}");
    let _daemon = Daemon::spawn(&state, port);
    wait_until_ready(&server);

    launchpad_cmd()
        .args(["register", "shop", "shop.sh", "--team", "web", "--server", &server])
        .assert()
        .success()
        .stdout(contains("registered 'shop' on port"));

    launchpad_cmd()
        .args(["register", "shop", "shop.sh", "--team", "web", "--server", &server])
        .assert()
        .failure()
        .stderr(contains("App with this name already registered"));

    launchpad_cmd()
        .args(["start", "shop", "--server", &server])
        .assert()
        .success()
        .stdout(contains("App is already running"));

    launchpad_cmd()
        .args(["stop", "shop", "--server", &server])
        .assert()
        .success()
        .stdout(contains("stopped 'shop'"));

    launchpad_cmd()
        .args(["start-many", "shop", "ghost", "--server", &server])
        .assert()
        .failure()
        .stdout(contains("App 'shop' started successfully"))
        .stdout(contains("App 'ghost' not found"));

    launchpad_cmd()
        .args(["info", "--server", &server])
        .assert()
        .success()
        .stdout(contains("1 apps | 1 running"));

    launchpad_cmd()
        .args(["start", "ghost", "--server", &server])
        .assert()
        .failure()
        .stderr(contains("App not found"));

    // A name with URL syntax in it must address itself, not a prefix.
    launchpad_cmd()
        .args(["register", "shop?x", "shop.sh", "--team", "web", "--server", &server])
        .assert()
        .success();
    launchpad_cmd()
        .args(["stop", "shop?x", "--server", &server])
        .assert()
        .success()
        .stdout(contains("stopped 'shop?x'"));

    let assert = launchpad_cmd()
        .args(["info", "--json", "--server", &server])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let records: serde_json::Value = serde_json::from_str(&stdout).expect("json output");
    assert_eq!(records[0]["name"], "shop");
    assert_eq!(records[0]["status"], "running");
    assert_eq!(records[1]["name"], "shop?x");
    assert_eq!(records[1]["status"], "stopped");

    launchpad_cmd()
        .args(["start", "shop?x", "--server", &server])
        .assert()
        .success()
        .stdout(contains("started 'shop?x' on port"));
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("addr").port()
}

struct Daemon(Child);

impl Daemon {
    fn spawn(state: &Path, port: u16) -> Self {
        let child = launchpad_cmd()
            .args(["serve", "--bind", "127.0.0.1", "--interpreter", "sh", "--port"])
            .arg(port.to_string())
            .arg("--state-file")
            .arg(state)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn daemon");
        Self(child)
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn wait_until_ready(server: &str) {
    for _ in 0..100 {
        if ureq::get(&format!("{server}/info")).call().is_ok() {
            return;
        }
        sleep(Duration::from_millis(50));
    }
    panic!("daemon at {server} did not become ready");
}
