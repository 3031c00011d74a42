use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

use launchpad_core::{
    persistence, LifecycleController, ProcessLauncher, RandomPorts, RegistryStore,
};

use crate::config::DaemonConfig;
use crate::error::{io_err, DaemonError};
use crate::http::router;
use crate::writer::spawn_writer;

/// Start the daemon and block the current thread until it exits.
pub fn start_blocking(config: DaemonConfig) -> Result<(), DaemonError> {
    init_tracing(config.log_json);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(config, shutdown_signal()))
}

/// Bind the configured address and serve until `shutdown` resolves.
pub async fn run(
    config: DaemonConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), DaemonError> {
    config.validate()?;
    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| DaemonError::Bind { addr, source })?;
    serve(listener, &config, shutdown).await
}

/// Serve on an already bound listener.
///
/// Loads the state file, starts the persistence writer, and serves HTTP.
/// After `shutdown` resolves and in-flight requests finish, the writer
/// flushes the last snapshot before this returns.
pub async fn serve(
    listener: TcpListener,
    config: &DaemonConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), DaemonError> {
    let state_file = config.state_file.clone();
    let records = tokio::task::spawn_blocking(move || persistence::load_or_empty(&state_file))
        .await
        .map_err(|source| DaemonError::Join {
            task: "state load",
            source,
        })?;

    let (sink, writer) = spawn_writer(config.state_file.clone());
    let store = RegistryStore::new(records, Arc::new(sink))?;
    let controller = LifecycleController::new(
        Arc::new(store),
        Arc::new(ProcessLauncher::new(config.interpreter.clone())),
        Arc::new(RandomPorts),
    );
    let app = router(Arc::new(controller));

    let local_addr = listener
        .local_addr()
        .map_err(|e| io_err("http listener", e))?;
    tracing::info!(
        addr = %local_addr,
        state_file = %config.state_file.display(),
        "launchpad listening",
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(DaemonError::Serve)?;

    // The router owned the last sink; the writer drains and exits.
    writer.await.map_err(|source| DaemonError::Join {
        task: "persistence writer",
        source,
    })?;
    tracing::info!("launchpad stopped");
    Ok(())
}

/// Resolves on ctrl-c, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "ctrl-c handler failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "SIGTERM handler failed");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_target(false);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
