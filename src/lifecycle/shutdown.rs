//! Shutdown coordination for the agent.

use std::future::Future;

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that long-running loops subscribe to.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal. Without subscribers this is a no-op.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of loops still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Drive `fut` until it finishes or shutdown fires, whichever comes first.
/// Returns `None` when cancelled; `fut` is dropped at its current await point.
pub async fn until_shutdown<F>(shutdown_rx: &mut broadcast::Receiver<()>, fut: F) -> Option<F::Output>
where
    F: Future,
{
    tokio::select! {
        output = fut => Some(output),
        _ = shutdown_rx.recv() => None,
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_reaches_every_subscriber() {
        let shutdown = Shutdown::new();
        let mut a = shutdown.subscribe();
        let mut b = shutdown.clone().subscribe();
        assert_eq!(shutdown.receiver_count(), 2);

        shutdown.trigger();
        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_until_shutdown_cancels_running_work() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();

        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.trigger();
        });

        let started = std::time::Instant::now();
        let result = until_shutdown(&mut rx, async {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            "finished"
        })
        .await;
        assert_eq!(result, None);
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_until_shutdown_returns_finished_output() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        assert_eq!(until_shutdown(&mut rx, async { 7 }).await, Some(7));
    }

    #[test]
    fn test_trigger_without_subscribers() {
        let shutdown = Shutdown::default();
        shutdown.trigger();
        assert_eq!(shutdown.receiver_count(), 0);
    }
}
