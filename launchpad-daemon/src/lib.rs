//! Launchpad daemon: HTTP surface, background persistence, runtime.

pub mod config;
mod error;
pub mod http;
mod runtime;
pub mod writer;

pub use config::DaemonConfig;
pub use error::DaemonError;
pub use http::router;
pub use runtime::{init_tracing, run, serve, shutdown_signal, start_blocking};
pub use writer::{spawn_writer, WriterSink};
