//! Whole-invocation cancellation

use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable handle that cancels every job of one pipeline invocation
///
/// In-flight steps are forcibly terminated; jobs that have not started yet
/// never start.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Request cancellation, returning `true` if it had already been requested
    ///
    /// Used for interrupts: the first cancels, a repeat means the caller
    /// should stop waiting for jobs to wind down.
    pub fn interrupt(&self) -> bool {
        self.sender.send_replace(true)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once cancellation has been requested
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives as long as any handle, so this only errors if it
        // was dropped mid-wait; treat that as "never cancelled".
        if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}
