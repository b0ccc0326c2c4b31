//! Received byte queue

use secs_core::{SecsError, SecsResult};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// FIFO of received bytes awaiting consumption
///
/// The read loop is the only producer; any number of pollers consume.
/// Bytes leave the queue in network arrival order. Among concurrent
/// consumers, whichever removes a byte first gets it.
#[derive(Debug, Default)]
pub struct ByteQueue {
    bytes: Mutex<VecDeque<u8>>,
    available: Notify,
}

impl ByteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> SecsResult<MutexGuard<'_, VecDeque<u8>>> {
        self.bytes.lock().map_err(|_| SecsError::poisoned("byte queue"))
    }

    /// Append bytes in order and wake waiting consumers
    pub fn push_slice(&self, bytes: &[u8]) -> SecsResult<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.lock()?.extend(bytes.iter().copied());
        self.available.notify_waiters();
        Ok(())
    }

    /// Remove the oldest byte without waiting
    pub fn try_pop(&self) -> SecsResult<Option<u8>> {
        Ok(self.lock()?.pop_front())
    }

    /// Wait for and remove the oldest byte
    ///
    /// Cancel safe: a byte is removed only when the future completes, so
    /// dropping it (timeout, shutdown) never loses data.
    pub async fn pop(&self) -> SecsResult<u8> {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            // Register before checking so a push between the check and the
            // await still wakes us.
            notified.as_mut().enable();

            if let Some(byte) = self.try_pop()? {
                return Ok(byte);
            }
            notified.await;
        }
    }

    /// Remove every queued byte
    ///
    /// # Returns
    /// Number of bytes removed
    pub fn clear(&self) -> SecsResult<usize> {
        let mut bytes = self.lock()?;
        let n = bytes.len();
        bytes.clear();
        Ok(n)
    }

    pub fn len(&self) -> usize {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_fifo_order() {
        let queue = ByteQueue::new();
        queue.push_slice(&[0x05, 0x41]).unwrap();
        queue.push_slice(&[]).unwrap();
        queue.push_slice(&[0x06]).unwrap();
        assert_eq!(queue.len(), 3);

        assert_eq!(queue.try_pop().unwrap(), Some(0x05));
        assert_eq!(queue.try_pop().unwrap(), Some(0x41));
        assert_eq!(queue.try_pop().unwrap(), Some(0x06));
        assert_eq!(queue.try_pop().unwrap(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clear() {
        let queue = ByteQueue::new();
        queue.push_slice(&[1, 2, 3]).unwrap();
        assert_eq!(queue.clear().unwrap(), 3);
        assert_eq!(queue.try_pop().unwrap(), None);
        assert_eq!(queue.clear().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_pop_waits_for_push() {
        let queue = Arc::new(ByteQueue::new());
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!consumer.is_finished());
        queue.push_slice(&[0x04]).unwrap();

        assert_eq!(consumer.await.unwrap().unwrap(), 0x04);
    }

    #[tokio::test]
    async fn test_concurrent_consumers_take_each_byte_once() {
        let queue = Arc::new(ByteQueue::new());
        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let queue = queue.clone();
                tokio::spawn(async move { queue.pop().await.unwrap() })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.push_slice(&[10, 20, 30, 40]).unwrap();

        let mut got = Vec::new();
        for consumer in consumers {
            got.push(consumer.await.unwrap());
        }
        got.sort_unstable();
        assert_eq!(got, vec![10, 20, 30, 40]);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_pop_keeps_bytes() {
        let queue = ByteQueue::new();
        let timed_out = tokio::time::timeout(Duration::from_millis(10), queue.pop()).await;
        assert!(timed_out.is_err());

        queue.push_slice(&[7]).unwrap();
        assert_eq!(queue.pop().await.unwrap(), 7);
    }
}
