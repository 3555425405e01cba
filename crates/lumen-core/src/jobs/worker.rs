//! The background worker: one job at a time, in submission order, until shutdown.

use std::future::Future;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::StoreError;
use crate::pipeline::JobOutcome;

/// Handle to the background task that processes queued jobs one at a time.
pub struct Worker {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Worker {
    /// Spawn the worker loop on the current runtime.
    ///
    /// `handler` runs once per dequeued identifier. Each run gets its own task
    /// so a panic is contained; runs never overlap.
    pub fn spawn<F, Fut>(rx: mpsc::UnboundedReceiver<String>, handler: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<JobOutcome, StoreError>> + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(rx, shutdown_rx, handler));
        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Signal shutdown and wait for the loop to exit.
    ///
    /// A run already in progress completes; identifiers still queued are dropped.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            tracing::error!("Worker task ended abnormally: {e}");
        }
    }
}

async fn run_loop<F, Fut>(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut shutdown_rx: watch::Receiver<bool>,
    handler: F,
) where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<JobOutcome, StoreError>> + Send + 'static,
{
    tracing::debug!("Worker started");
    loop {
        let id = tokio::select! {
            biased;
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
                continue;
            }
            next = rx.recv() => match next {
                Some(id) => id,
                None => break,
            },
        };

        match tokio::spawn(handler(id.clone())).await {
            Ok(Ok(outcome)) => tracing::debug!("Job {id} finished: {outcome:?}"),
            Ok(Err(e)) => tracing::error!("Job {id} could not be recorded: {e}"),
            Err(e) if e.is_panic() => tracing::error!("Job {id} panicked: {e}"),
            Err(e) => tracing::error!("Job {id} was cancelled: {e}"),
        }
    }
    tracing::debug!("Worker stopped");
}
