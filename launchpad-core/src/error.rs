//! Error types for launchpad-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::AppName;

/// Errors from the registry store and its persistence adapter.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Underlying I/O failure, annotated with the file involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (save path).
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON parse error on load.
    #[error("failed to parse state file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The file parsed but breaks a registry invariant.
    #[error("invalid state file at {path}: {reason}")]
    Schema { path: PathBuf, reason: String },

    /// The state file did not exist.
    #[error("state file not found at {path}")]
    StateNotFound { path: PathBuf },

    #[error("app '{name}' is already registered")]
    AlreadyExists { name: AppName },

    #[error("app '{name}' not found")]
    NotFound { name: AppName },
}

/// Errors returned by lifecycle transitions.
///
/// `AlreadyRunning` / `AlreadyStopped` are not here: they are successful
/// outcomes (see [`crate::lifecycle::StartOutcome`]).
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A required registration field was empty.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("app '{name}' is already registered")]
    AlreadyExists { name: AppName },

    #[error("app '{name}' not found")]
    NotFound { name: AppName },

    /// No free ephemeral port within the draw budget.
    #[error("no free ephemeral port after {attempts} attempts")]
    PortExhausted { attempts: usize },

    /// The child process could not be spawned.
    #[error("failed to launch '{name}' from {path}: {source}")]
    LaunchFailure {
        name: AppName,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A store error surfaced during a transition.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Convenience constructor for [`RegistryError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RegistryError {
    RegistryError::Io {
        path: path.into(),
        source,
    }
}
