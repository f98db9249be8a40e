//! Shutdown coordination for background tasks.

use tokio::sync::watch;

/// One-shot termination signal shared between components.
///
/// Any holder may trigger shutdown; every waiter observes it, including
/// waiters that subscribe after the signal fired.
pub struct Shutdown {
    signal: watch::Sender<bool>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            signal: tx,
        }
    }

    /// Trigger the shutdown signal.
    pub fn shutdown(&self) {
        let _ = self.signal.send(true);
    }

    /// Whether shutdown has been triggered.
    pub fn is_terminated(&self) -> bool {
        *self.signal.borrow()
    }

    /// Resolves once shutdown is triggered.
    pub fn wait(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.signal.subscribe();
        async move {
            if *rx.borrow() {
                return;
            }
            while rx.changed().await.is_ok() {
                if *rx.borrow() {
                    return;
                }
            }
        }
    }
}
