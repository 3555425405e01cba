//! Submission side of the job queue.

use tokio::sync::mpsc;

use crate::error::LumenError;

/// Unbounded FIFO of image identifiers awaiting processing.
///
/// Cloning yields another handle to the same queue.
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<String>,
}

impl JobQueue {
    /// Create the queue and the receiving end handed to the worker.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Append an identifier. Never blocks; fails once the worker has exited.
    pub fn enqueue(&self, id: impl Into<String>) -> Result<(), LumenError> {
        self.tx
            .send(id.into())
            .map_err(|_| LumenError::ServiceStopped)
    }
}
