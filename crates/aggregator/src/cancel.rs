//! Cooperative cancellation shared by every suspension point of an aggregation.
//!
//! A [`CancellationHandle`] owns the sending side of a `watch` channel; every
//! [`CancellationSignal`] clone observes it. Provider calls, per-attempt
//! timeouts and retry backoff waits all race their work against
//! [`CancellationSignal::cancelled`] with `tokio::select!`.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use crate::errors::AggregatorError;

/// Creates a linked handle/signal pair.
pub fn cancellation() -> (CancellationHandle, CancellationSignal) {
    let (tx, rx) = watch::channel(false);
    (
        CancellationHandle { tx: Arc::new(tx) },
        CancellationSignal { rx },
    )
}

/// Triggers cancellation for every signal created from the same pair.
#[derive(Clone, Debug)]
pub struct CancellationHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancellationHandle {
    /// Cancel all outstanding work observing this handle's signals.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// A fresh signal tied to this handle.
    pub fn signal(&self) -> CancellationSignal {
        CancellationSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read side of a cancellation pair. Cheap to clone.
#[derive(Clone, Debug)]
pub struct CancellationSignal {
    rx: watch::Receiver<bool>,
}

impl CancellationSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested. Pends forever when the
    /// handle was dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Fails fast with [`AggregatorError::Cancelled`] if already cancelled.
    pub fn check(&self) -> Result<(), AggregatorError> {
        if self.is_cancelled() {
            Err(AggregatorError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Runs `fut` to completion unless cancellation wins the race first.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, AggregatorError>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(AggregatorError::Cancelled),
            out = fut => Ok(out),
        }
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::never()
    }
}
