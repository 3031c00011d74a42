//! Launch-and-detach process spawning.
//!
//! A launched app is handed its port as `--port <port>`. No handle is kept:
//! a short-lived reaper thread waits on the child so it never lingers as a
//! zombie, and logs how it exited.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::types::AppRecord;

/// Starts the executable behind a record.
pub trait Launcher: Send + Sync {
    /// Spawn `record` listening on `port`. Returns once spawn succeeded or failed.
    fn launch(&self, record: &AppRecord, port: u16) -> std::io::Result<()>;
}

/// Spawns real child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessLauncher {
    /// Program that runs each app's `path` (e.g. `node`). `None` executes `path` directly.
    interpreter: Option<PathBuf>,
}

impl ProcessLauncher {
    pub fn new(interpreter: Option<PathBuf>) -> Self {
        Self { interpreter }
    }

    /// The command [`Launcher::launch`] would run, without spawning it.
    pub fn command(&self, record: &AppRecord, port: u16) -> Command {
        let mut cmd = match &self.interpreter {
            Some(interpreter) => {
                let mut cmd = Command::new(interpreter);
                cmd.arg(&record.path);
                cmd
            }
            None => Command::new(&record.path),
        };
        cmd.arg("--port").arg(port.to_string());
        cmd
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&self, record: &AppRecord, port: u16) -> std::io::Result<()> {
        let mut child = self
            .command(record, port)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let pid = child.id();
        tracing::info!(app = %record.name, pid, port, "launched app process");

        let name = record.name.clone();
        let reaper = std::thread::Builder::new()
            .name(format!("reap-{pid}"))
            .spawn(move || match child.wait() {
                Ok(status) => tracing::info!(app = %name, pid, %status, "app process exited"),
                Err(err) => tracing::warn!(app = %name, pid, error = %err, "failed to wait on app process"),
            });
        // The child is already running; losing the reaper only costs a zombie.
        if let Err(err) = reaper {
            tracing::warn!(app = %record.name, pid, error = %err, "could not start reaper thread");
        }
        Ok(())
    }
}
