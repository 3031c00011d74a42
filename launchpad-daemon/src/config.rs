use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use launchpad_core::persistence::DEFAULT_STATE_FILE;

use crate::error::DaemonError;

pub const DEFAULT_PORT: u16 = 3333;
pub const DEFAULT_BIND: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

pub const ENV_PORT: &str = "PORT";
pub const ENV_BIND: &str = "LAUNCHPAD_BIND";
pub const ENV_STATE_FILE: &str = "LAUNCHPAD_STATE";
pub const ENV_INTERPRETER: &str = "LAUNCHPAD_INTERPRETER";

/// Runtime settings for the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    /// Address the HTTP listener binds to.
    pub bind: IpAddr,
    /// HTTP listener port. This is launchpad's own port, not an app's.
    pub port: u16,
    /// JSON state file, rewritten after every mutation.
    pub state_file: PathBuf,
    /// Program that runs each app's path; `None` executes the path directly.
    pub interpreter: Option<PathBuf>,
    /// Emit logs as JSON lines instead of human-readable text.
    pub log_json: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND,
            port: DEFAULT_PORT,
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            interpreter: None,
            log_json: false,
        }
    }
}

impl DaemonConfig {
    pub fn validate(&self) -> Result<(), DaemonError> {
        if self.port == 0 {
            return Err(DaemonError::Config(
                "HTTP port must be between 1 and 65535".to_string(),
            ));
        }
        if self.state_file.as_os_str().is_empty() {
            return Err(DaemonError::Config("state file path is empty".to_string()));
        }
        if self
            .interpreter
            .as_ref()
            .is_some_and(|i| i.as_os_str().is_empty())
        {
            return Err(DaemonError::Config("interpreter path is empty".to_string()));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}
