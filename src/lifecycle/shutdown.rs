//! Shutdown coordination.

use std::future;
use std::sync::Arc;

use tokio::sync::watch;

/// Latched handle that stops the accept loop and closes live sessions.
///
/// Clones share the same flag. Once triggered it stays triggered, so a
/// signal subscribed afterwards still observes it.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Latch the flag and wake every subscriber. Repeated calls are harmless.
    pub fn trigger(&self) {
        if !self.tx.send_replace(true) {
            tracing::info!(subscribers = self.tx.receiver_count(), "Shutdown triggered");
        }
    }

    /// Number of tasks still listening for shutdown.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of a `Shutdown`.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolve once shutdown has been triggered, immediately if it already was.
    ///
    /// Pends forever when every `Shutdown` handle is dropped untriggered.
    /// Cancel-safe.
    pub async fn triggered(&mut self) {
        let closed = self.rx.wait_for(|triggered| *triggered).await.is_err();
        if closed {
            future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn every_subscriber_is_notified() {
        let shutdown = Shutdown::new();
        let mut first = shutdown.subscribe();
        let mut second = shutdown.clone().subscribe();
        assert_eq!(shutdown.receiver_count(), 2);

        shutdown.trigger();
        first.triggered().await;
        second.triggered().await;
    }

    #[tokio::test]
    async fn late_subscriber_sees_earlier_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        shutdown.trigger();

        let mut late = shutdown.subscribe();
        let fired = tokio::time::timeout(Duration::from_millis(100), late.triggered()).await;
        assert!(fired.is_ok());
    }

    #[tokio::test]
    async fn dropped_handle_is_not_a_trigger() {
        let shutdown = Shutdown::new();
        let mut signal = shutdown.subscribe();
        drop(shutdown);

        let fired = tokio::time::timeout(Duration::from_millis(50), signal.triggered()).await;
        assert!(fired.is_err());
    }
}
