//! Shutdown coordination.

use tokio::sync::broadcast;

/// Broadcasts a single shutdown event to every running server and task.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// A receiver that resolves once `trigger` is called.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Signal every subscriber. Returns how many were listening.
    pub fn trigger(&self) -> usize {
        let listeners = self.tx.send(()).unwrap_or(0);
        tracing::info!(listeners, "Shutdown triggered");
        listeners
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
    async fn test_trigger_reaches_subscribers() {
        let shutdown = Shutdown::new();
        let mut a = shutdown.subscribe();
        let mut b = shutdown.clone().subscribe();

        assert_eq!(shutdown.trigger(), 2);
        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());
    }

    #[test]
    fn test_trigger_without_subscribers() {
        assert_eq!(Shutdown::new().trigger(), 0);
    }
}
