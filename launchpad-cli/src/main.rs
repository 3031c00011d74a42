//! Launchpad: register, launch and track local apps on random ports.
//!
//! # Usage
//!
//! ```text
//! launchpad serve [--bind <ip>] [--port <port>] [--state-file <path>] [--interpreter <prog>]
//! launchpad info [--json]
//! launchpad register <name> <path> --team <team> [--log-request]
//! launchpad start <name>
//! launchpad start-many <name>...
//! launchpad stop <name>
//! launchpad list [--state-file <path>] [--json]
//! ```
//!
//! `serve` runs the daemon in the foreground. `list` reads the state file
//! directly; every other command talks to a running daemon over HTTP.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    client::{InfoArgs, NameArgs, RegisterArgs, StartManyArgs},
    list::ListArgs,
    serve::ServeArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "launchpad",
    version,
    about = "Register local apps and launch them on free ephemeral ports",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the launchpad HTTP daemon in the foreground.
    Serve(ServeArgs),

    /// Show every registered app as reported by the daemon.
    Info(InfoArgs),

    /// Register an app and launch it on a fresh port.
    Register(RegisterArgs),

    /// Start a registered app.
    Start(NameArgs),

    /// Start several apps in one request.
    StartMany(StartManyArgs),

    /// Mark an app as stopped.
    Stop(NameArgs),

    /// Print the registry straight from the state file.
    List(ListArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => args.run(),
        Commands::Info(args) => args.run(),
        Commands::Register(args) => args.run(),
        Commands::Start(args) => commands::client::start(args),
        Commands::StartMany(args) => args.run(),
        Commands::Stop(args) => commands::client::stop(args),
        Commands::List(args) => args.run(),
    }
}
