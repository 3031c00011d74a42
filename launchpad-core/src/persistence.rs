//! Flat-file persistence for the app registry.
//!
//! # Storage layout
//!
//! ```text
//! <state_file>        JSON array of AppRecord, registration order (mode 0600)
//! <state_file>.tmp    transient sibling used by atomic saves
//! ```
//!
//! Loading is strict ([`load_at`]) or forgiving ([`load_or_empty`]); the
//! forgiving form is what a starting daemon uses, since a missing or broken
//! file must never stop it from coming up.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{io_err, RegistryError};
use crate::ports::EPHEMERAL_PORTS;
use crate::store::SnapshotSink;
use crate::types::{AppRecord, AppStatus};

/// Fixed default location of the state file, relative to the working directory.
pub const DEFAULT_STATE_FILE: &str = "apps.json";

// ---------------------------------------------------------------------------
// 1. Load
// ---------------------------------------------------------------------------

/// Load and validate the records stored at `path`.
///
/// Returns `RegistryError::StateNotFound` if absent, `RegistryError::Parse`
/// if the JSON is malformed or mistyped, and `RegistryError::Schema` if the
/// records break a registry invariant.
pub fn load_at(path: &Path) -> Result<Vec<AppRecord>, RegistryError> {
    if !path.exists() {
        return Err(RegistryError::StateNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let records: Vec<AppRecord> =
        serde_json::from_str(&contents).map_err(|e| RegistryError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
    validate(path, records)
}

/// Load the records at `path`, falling back to an empty registry.
///
/// Every fallback is logged; none is fatal.
pub fn load_or_empty(path: &Path) -> Vec<AppRecord> {
    match load_at(path) {
        Ok(records) => {
            tracing::info!(path = %path.display(), apps = records.len(), "loaded app registry");
            records
        }
        Err(RegistryError::StateNotFound { .. }) => {
            tracing::info!(path = %path.display(), "no state file yet, starting with an empty registry");
            Vec::new()
        }
        Err(err) => {
            tracing::warn!(error = %err, "unusable state file, starting with an empty registry");
            Vec::new()
        }
    }
}

/// Enforce registry invariants on freshly parsed records.
///
/// Non-running records lose any leftover port (older files kept it after a
/// stop). Blank or duplicate names, running records without an in-range
/// port, and two running records on the same port are schema violations.
fn validate(path: &Path, records: Vec<AppRecord>) -> Result<Vec<AppRecord>, RegistryError> {
    let schema = |reason: String| RegistryError::Schema {
        path: path.to_path_buf(),
        reason,
    };

    let mut names = HashSet::new();
    let mut ports = HashSet::new();
    let mut validated = Vec::with_capacity(records.len());

    for mut record in records {
        if record.name.as_str().trim().is_empty() {
            return Err(schema("record with a blank name".to_string()));
        }
        if !names.insert(record.name.clone()) {
            return Err(schema(format!("duplicate app name '{}'", record.name)));
        }

        if record.status == AppStatus::Running {
            let Some(port) = record.port else {
                return Err(schema(format!(
                    "app '{}' is running without a port",
                    record.name
                )));
            };
            if !EPHEMERAL_PORTS.contains(&port) {
                return Err(schema(format!(
                    "app '{}' runs on port {port}, outside {}-{}",
                    record.name,
                    EPHEMERAL_PORTS.start(),
                    EPHEMERAL_PORTS.end()
                )));
            }
            if !ports.insert(port) {
                return Err(schema(format!(
                    "port {port} assigned to more than one running app"
                )));
            }
        } else {
            record.port = None;
        }

        validated.push(record);
    }

    Ok(validated)
}

// ---------------------------------------------------------------------------
// 2. Save (atomic)
// ---------------------------------------------------------------------------

/// `<state_file>.tmp`. Pure, no I/O.
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Atomically overwrite `path` with `records`.
///
/// Write flow: serialize → `.tmp` sibling → `chmod 0600` → `rename`.
/// The `.tmp` file sits in the same directory as the target so the rename
/// never crosses filesystems.
pub fn save_at(path: &Path, records: &[AppRecord]) -> Result<(), RegistryError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }
    }

    let tmp = tmp_path(path);
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    std::fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// 3. Synchronous sink
// ---------------------------------------------------------------------------

/// Writes every snapshot straight to disk on the caller's thread.
///
/// Used by offline tooling and tests; the daemon wraps [`save_at`] in a
/// background writer instead.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotSink for FileSink {
    fn persist(&self, snapshot: Vec<AppRecord>) {
        match save_at(&self.path, &snapshot) {
            Ok(()) => tracing::debug!(path = %self.path.display(), apps = snapshot.len(), "saved app registry"),
            Err(err) => tracing::error!(error = %err, "persistence failure, in-memory registry kept"),
        }
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), RegistryError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), RegistryError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
