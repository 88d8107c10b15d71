// Execution Context - cancellation and process lookup key

use tokio::sync::watch;

/// Per-invocation context handed to every channel operation
///
/// Cancellation terminates synchronous launches. Detached launches ignore it.
#[derive(Clone)]
pub struct ExecContext {
    rx: watch::Receiver<bool>,
    process_key: Option<String>,
}

impl ExecContext {
    /// Context that is never cancelled
    pub fn background() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self {
            rx,
            process_key: None,
        }
    }

    /// Derive a context whose process lookups are narrowed to `key`
    pub fn with_process_key(&self, key: impl Into<String>) -> Self {
        Self {
            rx: self.rx.clone(),
            process_key: Some(key.into()),
        }
    }

    /// Key a process command line must contain to match a lookup
    pub fn process_key(&self) -> Option<&str> {
        self.process_key.as_deref()
    }

    /// Check if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for cancellation
    ///
    /// Never resolves if the sender is dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl Default for ExecContext {
    fn default() -> Self {
        Self::background()
    }
}

/// Cancellation sender
pub struct CancelSender {
    tx: watch::Sender<bool>,
}

impl CancelSender {
    /// Cancel every context derived from this channel
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Create a cancellable context
pub fn cancel_channel() -> (CancelSender, ExecContext) {
    let (tx, rx) = watch::channel(false);
    (
        CancelSender { tx },
        ExecContext {
            rx,
            process_key: None,
        },
    )
}
