//! Poll operations over the received byte queue
//!
//! These are the read primitives the SECS-I link-protocol engine builds on:
//! it waits for a handshake control byte with a filtered poll, reads block
//! bytes with timed polls, and drains the queue to resynchronize after a
//! framing error.

use crate::byte_queue::ByteQueue;
use crate::statistics::LinkStatistics;
use secs_core::SecsResult;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Set of byte values a filtered poll is waiting for
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestSet {
    bits: [u64; 4],
}

impl RequestSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, byte: u8) {
        self.bits[usize::from(byte >> 6)] |= 1u64 << (byte & 0x3F);
    }

    pub fn with(mut self, byte: u8) -> Self {
        self.insert(byte);
        self
    }

    pub fn contains(&self, byte: u8) -> bool {
        self.bits[usize::from(byte >> 6)] & (1u64 << (byte & 0x3F)) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|word| *word == 0)
    }

    pub fn len(&self) -> usize {
        self.bits.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Members in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=u8::MAX).filter(move |b| self.contains(*b))
    }
}

impl From<&[u8]> for RequestSet {
    fn from(bytes: &[u8]) -> Self {
        bytes.iter().copied().collect()
    }
}

impl<const N: usize> From<[u8; N]> for RequestSet {
    fn from(bytes: [u8; N]) -> Self {
        bytes.into_iter().collect()
    }
}

impl FromIterator<u8> for RequestSet {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut set = Self::new();
        for byte in iter {
            set.insert(byte);
        }
        set
    }
}

impl fmt::Debug for RequestSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.iter().map(|b| format!("0x{:02X}", b)))
            .finish()
    }
}

/// Read side of a communicator
///
/// Cheap to clone; all clones consume from the same queue. Every blocking
/// variant returns `Ok(None)` on timeout or shutdown and `Err` only for an
/// underlying fault such as a poisoned queue lock.
#[derive(Debug, Clone)]
pub struct Poller {
    queue: Arc<ByteQueue>,
    statistics: Arc<LinkStatistics>,
    shutdown: CancellationToken,
}

impl Poller {
    pub(crate) fn new(queue: Arc<ByteQueue>, statistics: Arc<LinkStatistics>, shutdown: CancellationToken) -> Self {
        Self {
            queue,
            statistics,
            shutdown,
        }
    }

    /// Take the oldest byte without waiting
    pub fn try_poll(&self) -> SecsResult<Option<u8>> {
        self.queue.try_pop()
    }

    /// Wait up to `timeout` for the oldest byte
    ///
    /// A zero timeout still returns a byte that is already queued.
    pub async fn poll(&self, timeout: Duration) -> SecsResult<Option<u8>> {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Ok(None),
            result = tokio::time::timeout(timeout, self.queue.pop()) => match result {
                Ok(byte) => byte.map(Some),
                Err(_elapsed) => Ok(None),
            },
        }
    }

    /// Wait indefinitely for a byte in `request`
    ///
    /// Every byte taken from the queue that is not in `request` is
    /// discarded. Only use this while expecting control bytes: payload bytes
    /// seen during the scan are lost.
    ///
    /// # Returns
    /// The first requested byte, or `None` if the communicator is shut down
    pub async fn poll_matching(&self, request: &RequestSet) -> SecsResult<Option<u8>> {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Ok(None),
            result = self.scan(request) => result.map(Some),
        }
    }

    /// Wait up to `timeout` for a byte in `request`
    ///
    /// Same discard rule as [`Poller::poll_matching`]; bytes discarded before
    /// the deadline stay discarded.
    pub async fn poll_matching_timeout(&self, request: &RequestSet, timeout: Duration) -> SecsResult<Option<u8>> {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Ok(None),
            result = tokio::time::timeout(timeout, self.scan(request)) => match result {
                Ok(byte) => byte.map(Some),
                Err(_elapsed) => Ok(None),
            },
        }
    }

    /// Empty the queue
    ///
    /// # Returns
    /// Number of bytes dropped
    pub fn drain(&self) -> SecsResult<usize> {
        let n = self.queue.clear()?;
        if n > 0 {
            log::debug!("Drained {} bytes from receive queue", n);
        }
        Ok(n)
    }

    /// Number of bytes waiting in the queue
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    async fn scan(&self, request: &RequestSet) -> SecsResult<u8> {
        loop {
            let byte = self.queue.pop().await?;
            if request.contains(byte) {
                return Ok(byte);
            }
            self.statistics.add_bytes_discarded(1);
            log::trace!("Discarded 0x{:02X} while waiting for {:?}", byte, request);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secs_core::control::{self, ACK, ENQ, EOT, NAK};
    use std::time::Instant;

    fn poller() -> (Poller, Arc<ByteQueue>, CancellationToken) {
        let queue = Arc::new(ByteQueue::new());
        let shutdown = CancellationToken::new();
        let poller = Poller::new(queue.clone(), Arc::new(LinkStatistics::new()), shutdown.clone());
        (poller, queue, shutdown)
    }

    #[test]
    fn test_request_set() {
        let set = RequestSet::from([ENQ, ACK]).with(0xFF).with(0x00);
        assert!(set.contains(ENQ));
        assert!(set.contains(ACK));
        assert!(set.contains(0xFF));
        assert!(set.contains(0x00));
        assert!(!set.contains(EOT));
        assert_eq!(set.len(), 4);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0x00, ENQ, ACK, 0xFF]);
        assert_eq!(format!("{:?}", RequestSet::from(&[NAK][..])), "{\"0x15\"}");
        assert!(RequestSet::new().is_empty());
    }

    #[tokio::test]
    async fn test_try_poll() {
        let (poller, queue, _) = poller();
        assert_eq!(poller.try_poll().unwrap(), None);
        queue.push_slice(&[0x01, 0x02]).unwrap();
        assert_eq!(poller.try_poll().unwrap(), Some(0x01));
        assert_eq!(poller.try_poll().unwrap(), Some(0x02));
        assert_eq!(poller.try_poll().unwrap(), None);
    }

    #[tokio::test]
    async fn test_poll_matching_discards_until_match() {
        let (poller, queue, _) = poller();
        queue.push_slice(&[ENQ, 0x41, ACK]).unwrap();

        let got = poller.poll_matching(&RequestSet::from([ACK])).await.unwrap();
        assert_eq!(got, Some(ACK));
        assert!(queue.is_empty());
        assert_eq!(poller.statistics.snapshot().bytes_discarded, 2);
    }

    #[tokio::test]
    async fn test_poll_matching_any_control_byte() {
        let (poller, queue, _) = poller();
        queue.push_slice(&[0x0A, 0x41, 0x00, NAK, 0x42]).unwrap();

        let handshake = RequestSet::from(control::ALL);
        assert_eq!(handshake.len(), 4);
        let got = poller.poll_matching(&handshake).await.unwrap();
        assert_eq!(got, Some(NAK));
        assert_eq!(poller.statistics.snapshot().bytes_discarded, 3);
        assert_eq!(poller.try_poll().unwrap(), Some(0x42));
    }

    #[tokio::test]
    async fn test_poll_matching_leaves_later_bytes() {
        let (poller, queue, _) = poller();
        queue.push_slice(&[0x10, 0x11, EOT, 0x12, 0x13]).unwrap();

        let got = poller.poll_matching(&RequestSet::from([EOT, NAK])).await.unwrap();
        assert_eq!(got, Some(EOT));
        assert_eq!(poller.try_poll().unwrap(), Some(0x12));
        assert_eq!(poller.try_poll().unwrap(), Some(0x13));
    }

    #[tokio::test]
    async fn test_poll_matching_waits_for_arrival() {
        let (poller, queue, _) = poller();
        let task = {
            let poller = poller.clone();
            tokio::spawn(async move { poller.poll_matching(&RequestSet::from([EOT])).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.push_slice(&[0x00]).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!task.is_finished());
        queue.push_slice(&[EOT]).unwrap();

        assert_eq!(task.await.unwrap().unwrap(), Some(EOT));
    }

    #[tokio::test]
    async fn test_poll_timeout_on_empty_queue() {
        let (poller, _, _) = poller();
        let start = Instant::now();
        let got = poller.poll(Duration::from_millis(200)).await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(got, None);
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_poll_zero_timeout_returns_queued_byte() {
        let (poller, queue, _) = poller();
        queue.push_slice(&[0x7F]).unwrap();
        assert_eq!(poller.poll(Duration::ZERO).await.unwrap(), Some(0x7F));
        assert_eq!(poller.poll(Duration::ZERO).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_poll_matching_timeout_keeps_discards() {
        let (poller, queue, _) = poller();
        queue.push_slice(&[0x01, 0x02, 0x03]).unwrap();

        let got = poller
            .poll_matching_timeout(&RequestSet::from([ENQ]), Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(got, None);
        assert!(queue.is_empty());

        queue.push_slice(&[0x04, ENQ]).unwrap();
        let got = poller
            .poll_matching_timeout(&RequestSet::from([ENQ]), Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(got, Some(ENQ));
    }

    #[tokio::test]
    async fn test_shutdown_releases_blocked_polls() {
        let (poller, _, shutdown) = poller();
        let matching = {
            let poller = poller.clone();
            tokio::spawn(async move { poller.poll_matching(&RequestSet::from([ACK])).await })
        };
        let timed = {
            let poller = poller.clone();
            tokio::spawn(async move { poller.poll(Duration::from_secs(60)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();

        assert_eq!(matching.await.unwrap().unwrap(), None);
        assert_eq!(timed.await.unwrap().unwrap(), None);
    }

    #[tokio::test]
    async fn test_drain() {
        let (poller, queue, _) = poller();
        queue.push_slice(&[1, 2, 3, 4]).unwrap();
        assert_eq!(poller.pending(), 4);
        assert_eq!(poller.drain().unwrap(), 4);
        assert_eq!(poller.try_poll().unwrap(), None);
        assert_eq!(poller.drain().unwrap(), 0);
    }
}
