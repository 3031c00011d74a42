//! `launchpad list`: read the state file without a running daemon.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use launchpad_core::persistence::{self, DEFAULT_STATE_FILE};
use launchpad_core::{AppRecord, AppStatus, RegistryError};
use launchpad_daemon::config::ENV_STATE_FILE;

/// Arguments for `launchpad list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// JSON file holding the app registry.
    #[arg(long, env = ENV_STATE_FILE, default_value = DEFAULT_STATE_FILE)]
    pub state_file: PathBuf,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl ListArgs {
    pub fn run(self) -> Result<()> {
        let records = match persistence::load_at(&self.state_file) {
            Ok(records) => records,
            Err(RegistryError::StateNotFound { path }) => {
                println!("No state file at {}.", path.display());
                return Ok(());
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to load registry from {}", self.state_file.display())
                })
            }
        };
        print_records(&records, self.json)
    }
}

#[derive(Tabled)]
struct AppTableRow {
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "team")]
    team: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "port")]
    port: String,
    #[tabled(rename = "log requests")]
    log_request: String,
    #[tabled(rename = "path")]
    path: String,
}

/// Print records as a table, or as pretty JSON when `json` is set.
pub fn print_records(records: &[AppRecord], json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(records).context("failed to serialize app list")?
        );
        return Ok(());
    }

    let running = records.iter().filter(|r| r.is_running()).count();
    println!(
        "Launchpad v{} | {} apps | {} running",
        env!("CARGO_PKG_VERSION"),
        records.len(),
        running,
    );
    if records.is_empty() {
        println!("No apps registered.");
        return Ok(());
    }

    let rows: Vec<AppTableRow> = records
        .iter()
        .map(|record| AppTableRow {
            name: record.name.to_string(),
            team: record.team.clone(),
            status: status_label(record.status),
            port: record
                .port
                .map_or_else(|| "-".to_string(), |port| port.to_string()),
            log_request: if record.log_request { "yes" } else { "no" }.to_string(),
            path: record.path.display().to_string(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn status_label(status: AppStatus) -> String {
    let label = status.to_string();
    match status {
        AppStatus::Running => label.green().to_string(),
        AppStatus::Stopped => label.red().to_string(),
        AppStatus::Registered => label.yellow().to_string(),
    }
}
