//! Launchpad core library: app registry, persistence, lifecycle.
//!
//! - [`types`]: [`AppRecord`] and friends, the persisted schema
//! - [`error`]: [`RegistryError`], [`LifecycleError`]
//! - [`persistence`]: load / atomic save of the state file
//! - [`store`]: [`RegistryStore`], the lock-guarded source of truth
//! - [`ports`]: ephemeral port allocation
//! - [`launcher`]: launch-and-detach process spawning
//! - [`lifecycle`]: [`LifecycleController`], the register/start/stop state machine

pub mod error;
pub mod launcher;
pub mod lifecycle;
pub mod persistence;
pub mod ports;
pub mod store;
pub mod types;

pub use error::{LifecycleError, RegistryError};
pub use launcher::{Launcher, ProcessLauncher};
pub use lifecycle::{
    LifecycleController, Registration, StartFailure, StartMultipleReport, StartOutcome,
    StopOutcome,
};
pub use ports::{PortSource, RandomPorts};
pub use store::{RegistryStore, SnapshotSink};
pub use types::{AppName, AppRecord, AppStatus};
