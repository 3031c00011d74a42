//! Background persistence writer.
//!
//! The registry hands snapshots to [`WriterSink`] while holding its lock;
//! the sink only enqueues. A single writer task drains the queue, keeps the
//! newest snapshot, and saves it on a blocking thread. HTTP responses never
//! wait on disk, so an acknowledged mutation may not be durable yet.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use launchpad_core::{persistence, AppRecord, SnapshotSink};

/// Enqueues snapshots for the writer task.
#[derive(Debug, Clone)]
pub struct WriterSink {
    tx: mpsc::UnboundedSender<Vec<AppRecord>>,
}

impl SnapshotSink for WriterSink {
    fn persist(&self, snapshot: Vec<AppRecord>) {
        if self.tx.send(snapshot).is_err() {
            tracing::error!("persistence writer has stopped, snapshot dropped");
        }
    }
}

/// Spawn the writer task for `path`. Must be called inside a tokio runtime.
///
/// The task exits once every [`WriterSink`] clone is dropped and the queue
/// is flushed.
pub fn spawn_writer(path: PathBuf) -> (WriterSink, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(writer_task(path, rx));
    (WriterSink { tx }, handle)
}

async fn writer_task(path: PathBuf, mut rx: mpsc::UnboundedReceiver<Vec<AppRecord>>) {
    while let Some(mut snapshot) = rx.recv().await {
        let mut skipped = 0usize;
        while let Ok(newer) = rx.try_recv() {
            snapshot = newer;
            skipped += 1;
        }

        let apps = snapshot.len();
        let target = path.clone();
        let saved =
            tokio::task::spawn_blocking(move || persistence::save_at(&target, &snapshot)).await;

        match saved {
            Ok(Ok(())) => {
                tracing::debug!(path = %path.display(), apps, skipped, "saved app registry");
            }
            Ok(Err(err)) => {
                tracing::error!(error = %err, "persistence failure, in-memory registry kept");
            }
            Err(err) => {
                tracing::error!(error = %err, "persistence task join failure");
            }
        }
    }
    tracing::debug!(path = %path.display(), "persistence writer drained");
}
