//! `launchpad serve`: run the daemon in the foreground.

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use launchpad_core::persistence::DEFAULT_STATE_FILE;
use launchpad_daemon::config::{
    DEFAULT_BIND, DEFAULT_PORT, ENV_BIND, ENV_INTERPRETER, ENV_PORT, ENV_STATE_FILE,
};
use launchpad_daemon::{start_blocking, DaemonConfig};

/// Arguments for `launchpad serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind the HTTP listener to.
    #[arg(long, env = ENV_BIND, default_value_t = DEFAULT_BIND)]
    pub bind: IpAddr,

    /// HTTP listener port.
    #[arg(long, env = ENV_PORT, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// JSON file holding the app registry.
    #[arg(long, env = ENV_STATE_FILE, default_value = DEFAULT_STATE_FILE)]
    pub state_file: PathBuf,

    /// Program used to run each app's path (for example `node`).
    #[arg(long, env = ENV_INTERPRETER)]
    pub interpreter: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,
}

impl ServeArgs {
    pub fn run(self) -> Result<()> {
        start_blocking(self.into_config()).context("daemon exited with error")
    }

    fn into_config(self) -> DaemonConfig {
        DaemonConfig {
            bind: self.bind,
            port: self.port,
            state_file: self.state_file,
            interpreter: self.interpreter,
            log_json: self.log_json,
        }
    }
}
