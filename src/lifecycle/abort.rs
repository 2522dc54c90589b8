//! Per-exchange abort signalling.
//!
//! # Responsibilities
//! - Raise a flag when the host drops an exchange before it completes
//!   (client disconnect, server shutdown)
//! - Let the inner engine poll or await that flag
//!
//! # Design Decisions
//! - Built on a `watch` channel: one writer (the guard), many cheap readers
//! - The guard fires on drop unless explicitly disarmed
//! - Advisory only: nothing here interrupts a running task

use tokio::sync::watch;

/// Create a connected guard/signal pair for one exchange.
pub fn abort_pair() -> (AbortGuard, AbortSignal) {
    let (tx, rx) = watch::channel(false);
    (AbortGuard { tx, armed: true }, AbortSignal { rx })
}

/// Owner side of an exchange's abort flag.
///
/// Held by the host for the duration of the exchange. If it is dropped while
/// still armed, every [`AbortSignal`] observes the abort.
#[derive(Debug)]
pub struct AbortGuard {
    tx: watch::Sender<bool>,
    armed: bool,
}

impl AbortGuard {
    /// Raise the abort flag immediately.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    /// Mark the exchange as completed; dropping no longer aborts.
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AbortGuard {
    fn drop(&mut self) {
        if self.armed {
            self.tx.send_replace(true);
            tracing::debug!("Exchange dropped before completion, abort signalled");
        }
    }
}

/// Reader side of an exchange's abort flag.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    /// Returns true once the exchange has been aborted.
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve when the exchange is aborted.
    ///
    /// Never resolves if the guard was disarmed.
    pub async fn aborted(&mut self) {
        if self.rx.wait_for(|aborted| *aborted).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
