//! Domain types for the launchpad registry.
//!
//! Serialized field names and status spellings are the on-disk and HTTP
//! compatibility surface: `name`, `path`, `team`, `logRequest`, `status`,
//! `port`, with statuses `registered` / `running` / `stopped`.

use std::borrow::Borrow;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Unique name of a managed application; the registry's primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppName(pub String);

impl AppName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for AppName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AppName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl Borrow<str> for AppName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Lifecycle state of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppStatus {
    #[default]
    Registered,
    Running,
    Stopped,
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppStatus::Registered => write!(f, "registered"),
            AppStatus::Running => write!(f, "running"),
            AppStatus::Stopped => write!(f, "stopped"),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One managed application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRecord {
    pub name: AppName,
    /// Executable or script launched on start.
    pub path: PathBuf,
    pub team: String,
    /// Consumed by an external request logger; launchpad only stores it.
    #[serde(default)]
    pub log_request: bool,
    pub status: AppStatus,
    /// Present only while `status == Running`. `0` on disk reads as absent.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "zero_port_as_none"
    )]
    pub port: Option<u16>,
}

impl AppRecord {
    /// A freshly registered record: no port, status `Registered`.
    pub fn new(
        name: impl Into<AppName>,
        path: impl Into<PathBuf>,
        team: impl Into<String>,
        log_request: bool,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            team: team.into(),
            log_request,
            status: AppStatus::Registered,
            port: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == AppStatus::Running
    }
}

fn zero_port_as_none<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    let port = Option::<u16>::deserialize(deserializer)?;
    Ok(port.filter(|p| *p != 0))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
