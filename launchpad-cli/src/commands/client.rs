//! Commands that talk to a running daemon: `info`, `register`, `start`,
//! `start-many`, `stop`.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use colored::Colorize;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use launchpad_core::AppRecord;

use super::list::print_records;

pub const ENV_SERVER: &str = "LAUNCHPAD_URL";
pub const DEFAULT_SERVER: &str = "http://127.0.0.1:3333";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Bytes escaped when an app name becomes one URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Daemon location, shared by every client command.
#[derive(Args, Debug)]
pub struct ServerArgs {
    /// Base URL of the launchpad daemon.
    #[arg(long, env = ENV_SERVER, default_value = DEFAULT_SERVER)]
    pub server: String,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub server: ServerArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Unique app name.
    pub name: String,

    /// Entry point handed to the interpreter (or executed directly).
    pub path: String,

    /// Owning team.
    #[arg(long)]
    pub team: String,

    /// Ask the app to log incoming requests.
    #[arg(long)]
    pub log_request: bool,

    #[command(flatten)]
    pub server: ServerArgs,
}

#[derive(Args, Debug)]
pub struct NameArgs {
    /// App name.
    pub name: String,

    #[command(flatten)]
    pub server: ServerArgs,
}

#[derive(Args, Debug)]
pub struct StartManyArgs {
    /// App names, started in the order given.
    #[arg(required = true, num_args = 1..)]
    pub names: Vec<String>,

    #[command(flatten)]
    pub server: ServerArgs,
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

/// `{success: true, port}` or `{message}` from start/stop/register.
#[derive(Debug, Deserialize)]
struct TransitionResponse {
    #[serde(default)]
    success: bool,
    port: Option<u16>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StartManyResponse {
    success: Vec<String>,
    error: Vec<String>,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

impl InfoArgs {
    pub fn run(self) -> Result<()> {
        let client = Client::new(&self.server.server);
        let records: Vec<AppRecord> = client.get("/info")?;
        print_records(&records, self.json)
    }
}

impl RegisterArgs {
    pub fn run(self) -> Result<()> {
        let client = Client::new(&self.server.server);
        let body = json!({
            "name": self.name,
            "path": self.path,
            "team": self.team,
            "logRequest": self.log_request,
        });
        let response: TransitionResponse = client.post("/register", Some(body))?;
        match response.port {
            Some(port) => println!(
                "{} '{}' on port {}",
                "registered".green(),
                self.name,
                port
            ),
            None => println!("{} '{}'", "registered".green(), self.name),
        }
        Ok(())
    }
}

pub fn start(args: NameArgs) -> Result<()> {
    let client = Client::new(&args.server.server);
    let response: TransitionResponse = client.post(&app_path("start", &args.name), None)?;
    report_transition(&args.name, "started", response);
    Ok(())
}

pub fn stop(args: NameArgs) -> Result<()> {
    let client = Client::new(&args.server.server);
    let response: TransitionResponse = client.post(&app_path("stop", &args.name), None)?;
    report_transition(&args.name, "stopped", response);
    Ok(())
}

impl StartManyArgs {
    pub fn run(self) -> Result<()> {
        let client = Client::new(&self.server.server);
        let response: StartManyResponse =
            client.post("/start-multiple", Some(json!({ "names": self.names })))?;
        for line in &response.success {
            println!("{} {line}", "ok".green());
        }
        for line in &response.error {
            println!("{} {line}", "error".red());
        }
        if !response.error.is_empty() {
            bail!(
                "{} of {} apps did not start",
                response.error.len(),
                self.names.len()
            );
        }
        Ok(())
    }
}

/// `/<action>/<name>` with `name` escaped as a single segment.
fn app_path(action: &str, name: &str) -> String {
    format!("/{action}/{}", utf8_percent_encode(name, PATH_SEGMENT))
}

fn report_transition(name: &str, verb: &str, response: TransitionResponse) {
    if let Some(message) = response.message {
        println!("{message}");
        return;
    }
    if !response.success {
        return;
    }
    match response.port {
        Some(port) => println!("{} '{name}' on port {port}", verb.green()),
        None => println!("{} '{name}'", verb.green()),
    }
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

struct Client {
    base: String,
    agent: ureq::Agent,
}

impl Client {
    fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            agent: ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build(),
        }
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{path}", self.base);
        self.decode(&url, self.agent.get(&url).call())
    }

    fn post<T: DeserializeOwned>(&self, path: &str, body: Option<Value>) -> Result<T> {
        let url = format!("{}{path}", self.base);
        let request = self.agent.post(&url);
        let result = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };
        self.decode(&url, result)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        url: &str,
        result: Result<ureq::Response, ureq::Error>,
    ) -> Result<T> {
        match result {
            Ok(response) => response
                .into_json()
                .with_context(|| format!("invalid response body from {url}")),
            Err(ureq::Error::Status(code, response)) => {
                let message = response
                    .into_json::<Value>()
                    .ok()
                    .and_then(|body| body.get("error").and_then(Value::as_str).map(String::from))
                    .unwrap_or_else(|| "request failed".to_string());
                Err(anyhow!("{message} (HTTP {code})"))
            }
            Err(err) => {
                Err(err).with_context(|| format!("could not reach launchpad at {}", self.base))
            }
        }
    }
}
