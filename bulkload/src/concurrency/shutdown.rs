//! Abort signal broadcast to every worker.
//!
//! Workers look at it at the start of every batch cycle and right before every store write.
//! A write already in flight is never interrupted. Once sent, the signal is kept by the channel:
//! it stays visible to every receiver, late subscribers included, even after all senders are
//! dropped.

use std::sync::Arc;

use tokio::sync::watch;

pub type ShutdownRx = watch::Receiver<bool>;

#[derive(Debug, Clone)]
pub struct ShutdownTx(Arc<watch::Sender<bool>>);

impl ShutdownTx {
    pub fn new(tx: watch::Sender<bool>) -> Self {
        Self(Arc::new(tx))
    }

    /// Signals every current and future subscriber.
    pub fn shutdown(&self) {
        self.0.send_replace(true);
    }

    pub fn subscribe(&self) -> ShutdownRx {
        self.0.subscribe()
    }
}

/// Creates the abort channel.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTx::new(tx), rx)
}

/// Returns `true` if the signal was sent.
pub fn is_shutdown_requested(rx: &ShutdownRx) -> bool {
    *rx.borrow()
}

/// Completes once the signal is sent.
///
/// Never completes if every sender is dropped without sending it.
pub async fn wait_for_shutdown(rx: &mut ShutdownRx) {
    if rx.wait_for(|aborted| *aborted).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[test]
    fn subscribers_observe_the_signal() {
        let (tx, rx) = create_shutdown_channel();
        let early = tx.subscribe();
        assert!(!is_shutdown_requested(&rx));

        tx.shutdown();
        let late = tx.subscribe();

        assert!(is_shutdown_requested(&rx));
        assert!(is_shutdown_requested(&early));
        assert!(is_shutdown_requested(&late));
    }

    #[test]
    fn signal_outlives_every_sender() {
        let (tx, rx) = create_shutdown_channel();
        let other = tx.clone();

        tx.shutdown();
        drop(tx);
        drop(other);

        assert!(is_shutdown_requested(&rx));
    }

    #[tokio::test]
    async fn waiting_completes_on_a_signal_sent_before_or_after() {
        let (tx, mut rx) = create_shutdown_channel();
        let mut late = tx.subscribe();

        let waiter = tokio::spawn(async move { wait_for_shutdown(&mut late).await });
        tx.shutdown();
        timeout(Duration::from_secs(5), waiter).await.unwrap().unwrap();

        // Already sent: completes right away.
        timeout(Duration::from_secs(5), wait_for_shutdown(&mut rx))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn waiting_never_completes_without_a_signal() {
        let (tx, mut rx) = create_shutdown_channel();
        drop(tx);

        assert!(
            timeout(Duration::from_millis(30), wait_for_shutdown(&mut rx))
                .await
                .is_err()
        );
    }
}
