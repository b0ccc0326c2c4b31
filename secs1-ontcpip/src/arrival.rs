//! "Data arrived" broadcast

use std::sync::Arc;
use tokio::sync::watch;

/// Broadcast raised by the read loop after every append to the byte queue
///
/// Independent of the byte queue's own wakeups, so the link-protocol engine
/// can wait for new data without touching the queue. Backed by a counter in
/// a `watch` channel: a watcher that was busy while several chunks arrived
/// observes one change, never a lost wakeup.
#[derive(Debug, Clone)]
pub struct ArrivalSignal {
    tx: Arc<watch::Sender<u64>>,
}

impl ArrivalSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    pub(crate) fn notify(&self) {
        self.tx.send_modify(|count| *count = count.wrapping_add(1));
    }

    /// Number of arrivals signaled so far
    pub fn count(&self) -> u64 {
        *self.tx.borrow()
    }

    /// Create a watcher that observes arrivals from now on
    pub fn subscribe(&self) -> ArrivalWatcher {
        ArrivalWatcher {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for ArrivalSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of [`ArrivalSignal`]
#[derive(Debug, Clone)]
pub struct ArrivalWatcher {
    rx: watch::Receiver<u64>,
}

impl ArrivalWatcher {
    /// Wait until data arrives after the last observed arrival
    ///
    /// # Returns
    /// `false` if the signal was dropped (the communicator is gone)
    pub async fn wait(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Check without waiting whether unobserved data arrived
    pub fn has_arrived(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Mark everything up to now as observed
    pub fn mark_seen(&mut self) -> u64 {
        *self.rx.borrow_and_update()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_wakes_on_notify() {
        let signal = ArrivalSignal::new();
        let mut watcher = signal.subscribe();
        assert!(!watcher.has_arrived());

        let notifier = signal.clone();
        let waiter = tokio::spawn(async move { watcher.wait().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        notifier.notify();

        assert!(waiter.await.unwrap());
        assert_eq!(signal.count(), 1);
    }

    #[tokio::test]
    async fn test_coalesced_arrivals() {
        let signal = ArrivalSignal::new();
        let mut watcher = signal.subscribe();
        signal.notify();
        signal.notify();
        assert!(watcher.has_arrived());
        assert_eq!(watcher.mark_seen(), 2);
        assert!(!watcher.has_arrived());
    }

    #[tokio::test]
    async fn test_wait_after_drop() {
        let signal = ArrivalSignal::new();
        let mut watcher = signal.subscribe();
        drop(signal);
        assert!(!watcher.wait().await);
    }
}
