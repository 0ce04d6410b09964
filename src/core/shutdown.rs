//! Shutdown signal helpers
//!
//! Cancellation is a single `watch` channel carrying `true` once shutdown has
//! been requested.

use tokio::sync::watch;

/// Whether shutdown has already been requested
pub fn is_requested(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}

/// Resolves once shutdown is requested
///
/// If the sender is dropped without requesting shutdown this never resolves,
/// so a closed channel is not mistaken for a cancellation.
pub async fn requested(shutdown: &mut watch::Receiver<bool>) {
    let closed = shutdown.wait_for(|stop| *stop).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_requested_resolves_on_true() {
        let (tx, mut rx) = watch::channel(false);
        assert!(!is_requested(&rx));

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), requested(&mut rx))
            .await
            .unwrap();
        assert!(is_requested(&rx));
    }

    #[tokio::test]
    async fn test_dropped_sender_is_not_a_request() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);

        let result = tokio::time::timeout(Duration::from_millis(50), requested(&mut rx)).await;
        assert!(result.is_err());
    }
}
