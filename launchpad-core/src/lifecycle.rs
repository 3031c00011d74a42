//! App lifecycle state machine.
//!
//! ```text
//! register ──► Running ◄──start── Stopped
//!                 │                  ▲
//!                 └──────stop────────┘
//! ```
//!
//! `Registered` only appears in files written before registration started
//! launching apps; `start` moves it to `Running`, `stop` leaves it alone.
//!
//! Every transition runs inside one [`RegistryStore::transact`] call, so
//! port allocation, the launch, and the record update are atomic with
//! respect to every other transition.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::LifecycleError;
use crate::launcher::Launcher;
use crate::ports::{allocate, PortSource, MAX_PORT_DRAWS};
use crate::store::{Registry, RegistryStore};
use crate::types::{AppName, AppRecord, AppStatus};

/// Input to [`LifecycleController::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub path: PathBuf,
    pub team: String,
    pub log_request: bool,
}

/// Successful result of a start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started { port: u16 },
    /// Idempotent no-op; the running port is untouched.
    AlreadyRunning { port: Option<u16> },
}

/// Successful result of a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    /// Idempotent no-op.
    AlreadyStopped,
}

/// Why one name in a batch start did not start.
#[derive(Debug)]
pub enum StartFailure {
    AlreadyRunning,
    Error(LifecycleError),
}

impl std::fmt::Display for StartFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartFailure::AlreadyRunning => write!(f, "already running"),
            StartFailure::Error(err) => std::fmt::Display::fmt(err, f),
        }
    }
}

/// Partitioned result of [`LifecycleController::start_multiple`].
///
/// Both lists keep input order.
#[derive(Debug, Default)]
pub struct StartMultipleReport {
    pub started: Vec<(AppName, u16)>,
    pub failed: Vec<(AppName, StartFailure)>,
}

/// Owns every status transition.
pub struct LifecycleController {
    store: Arc<RegistryStore>,
    launcher: Arc<dyn Launcher>,
    ports: Arc<dyn PortSource>,
    max_port_draws: usize,
}

impl LifecycleController {
    pub fn new(
        store: Arc<RegistryStore>,
        launcher: Arc<dyn Launcher>,
        ports: Arc<dyn PortSource>,
    ) -> Self {
        Self {
            store,
            launcher,
            ports,
            max_port_draws: MAX_PORT_DRAWS,
        }
    }

    pub fn with_max_port_draws(mut self, max_port_draws: usize) -> Self {
        self.max_port_draws = max_port_draws;
        self
    }

    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    pub fn list(&self) -> Vec<AppRecord> {
        self.store.list()
    }

    /// Register a new app and launch it.
    ///
    /// On launch failure nothing is recorded, so the same name can be
    /// registered again once the executable is fixed.
    pub fn register(&self, registration: Registration) -> Result<u16, LifecycleError> {
        let Registration {
            name,
            path,
            team,
            log_request,
        } = registration;

        if name.trim().is_empty() || path.as_os_str().is_empty() || team.trim().is_empty() {
            return Err(LifecycleError::InvalidInput(
                "name, path, and team are required".to_string(),
            ));
        }

        let mut record = AppRecord::new(name, path, team, log_request);
        let port = self.store.transact(|registry| -> Result<u16, LifecycleError> {
            if registry.contains(record.name.as_str()) {
                return Err(LifecycleError::AlreadyExists {
                    name: record.name.clone(),
                });
            }
            let port = self.launch_on_free_port(registry, &record)?;
            record.status = AppStatus::Running;
            record.port = Some(port);
            registry.insert(record.clone())?;
            Ok(port)
        })?;

        tracing::info!(app = %record.name, team = %record.team, port, "registered app");
        Ok(port)
    }

    /// Start a registered app. Starting a running app is a no-op.
    pub fn start(&self, name: &str) -> Result<StartOutcome, LifecycleError> {
        let outcome = self.store.transact(|registry| -> Result<_, LifecycleError> {
            let record = registry
                .get(name)
                .cloned()
                .ok_or_else(|| LifecycleError::NotFound { name: name.into() })?;
            if record.is_running() {
                return Ok(StartOutcome::AlreadyRunning { port: record.port });
            }

            let port = self.launch_on_free_port(registry, &record)?;
            registry.update(name, |r| {
                r.status = AppStatus::Running;
                r.port = Some(port);
            })?;
            Ok(StartOutcome::Started { port })
        })?;

        match outcome {
            StartOutcome::Started { port } => tracing::info!(app = name, port, "started app"),
            StartOutcome::AlreadyRunning { .. } => tracing::debug!(app = name, "app already running"),
        }
        Ok(outcome)
    }

    /// Start each name independently, in input order.
    pub fn start_multiple<S: AsRef<str>>(&self, names: &[S]) -> StartMultipleReport {
        let mut report = StartMultipleReport::default();
        for name in names {
            let name = name.as_ref();
            match self.start(name) {
                Ok(StartOutcome::Started { port }) => report.started.push((name.into(), port)),
                Ok(StartOutcome::AlreadyRunning { .. }) => {
                    report
                        .failed
                        .push((name.into(), StartFailure::AlreadyRunning));
                }
                Err(err) => {
                    tracing::warn!(app = name, error = %err, "batch start failed for app");
                    report.failed.push((name.into(), StartFailure::Error(err)));
                }
            }
        }
        report
    }

    /// Stop a running app and release its port. Stopping a non-running app is a no-op.
    ///
    /// The launched process is not signalled: launchpad keeps no handle to it.
    pub fn stop(&self, name: &str) -> Result<StopOutcome, LifecycleError> {
        let outcome = self.store.transact(|registry| -> Result<_, LifecycleError> {
            let record = registry
                .get(name)
                .ok_or_else(|| LifecycleError::NotFound { name: name.into() })?;
            if !record.is_running() {
                return Ok(StopOutcome::AlreadyStopped);
            }
            registry.update(name, |r| {
                r.status = AppStatus::Stopped;
                r.port = None;
            })?;
            Ok(StopOutcome::Stopped)
        })?;

        match outcome {
            StopOutcome::Stopped => tracing::info!(app = name, "stopped app"),
            StopOutcome::AlreadyStopped => tracing::debug!(app = name, "app already stopped"),
        }
        Ok(outcome)
    }

    fn launch_on_free_port(
        &self,
        registry: &Registry,
        record: &AppRecord,
    ) -> Result<u16, LifecycleError> {
        let port = allocate(
            self.ports.as_ref(),
            &registry.running_ports(),
            self.max_port_draws,
        )?;
        self.launcher
            .launch(record, port)
            .map_err(|source| LifecycleError::LaunchFailure {
                name: record.name.clone(),
                path: record.path.clone(),
                source,
            })?;
        Ok(port)
    }
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("store", &self.store)
            .field("max_port_draws", &self.max_port_draws)
            .finish_non_exhaustive()
    }
}
