//! Send operation against the live link

use crate::slot::{ConnectionHandle, ConnectionSlot};
use crate::statistics::LinkStatistics;
use secs_core::{SecsError, SecsResult};
use std::io::ErrorKind;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

/// Write side of a communicator
///
/// Cheap to clone. Sends are serialized per link by the link's writer lock.
#[derive(Debug, Clone)]
pub struct Sender {
    slot: Arc<ConnectionSlot>,
    statistics: Arc<LinkStatistics>,
    shutdown: CancellationToken,
}

impl Sender {
    pub(crate) fn new(slot: Arc<ConnectionSlot>, statistics: Arc<LinkStatistics>, shutdown: CancellationToken) -> Self {
        Self {
            slot,
            statistics,
            shutdown,
        }
    }

    /// Write all of `bytes` to the live link
    ///
    /// # Errors
    /// - `SecsError::NotConnected` if no link is installed; nothing is written
    /// - `SecsError::DetectTerminate` if a write makes zero progress; the link
    ///   is then handed back to the reconnect loop for teardown
    /// - `SecsError::SendFailure` for any other write error, including the
    ///   link being torn down mid-write
    /// - `SecsError::Cancelled` if the communicator shuts down mid-write
    pub async fn send(&self, bytes: &[u8]) -> SecsResult<()> {
        let handle = self.slot.current()?.ok_or(SecsError::NotConnected)?;
        if !handle.is_open() {
            return Err(SecsError::NotConnected);
        }
        if bytes.is_empty() {
            return Ok(());
        }

        let result = self.write_all(&handle, bytes).await;
        match &result {
            Ok(()) => {
                self.statistics.add_bytes_sent(bytes.len());
                log::trace!("Sent {} bytes to {}", bytes.len(), handle.peer());
            }
            Err(SecsError::DetectTerminate) => {
                self.statistics.record_detect_terminate();
                log::warn!("Detected terminate while sending to {}", handle.peer());
                handle.terminate();
            }
            Err(e) => log::debug!("Send to {} failed: {}", handle.peer(), e),
        }
        result
    }

    /// Whether a link is currently installed
    pub fn is_connected(&self) -> bool {
        self.slot.is_occupied()
    }

    async fn write_all(&self, handle: &ConnectionHandle, bytes: &[u8]) -> SecsResult<()> {
        let terminated = handle.terminated();

        let mut guard = tokio::select! {
            biased;
            _ = terminated.cancelled() => return Err(self.interrupted()),
            guard = handle.writer().lock() => guard,
        };
        let writer = guard.as_mut().ok_or(SecsError::NotConnected)?;

        let mut written = 0;
        while written < bytes.len() {
            let n = tokio::select! {
                biased;
                _ = terminated.cancelled() => return Err(self.interrupted()),
                result = writer.write(&bytes[written..]) => result.map_err(SecsError::SendFailure)?,
            };
            if n == 0 {
                return Err(SecsError::DetectTerminate);
            }
            written += n;
        }

        tokio::select! {
            biased;
            _ = terminated.cancelled() => Err(self.interrupted()),
            result = writer.flush() => result.map_err(SecsError::SendFailure),
        }
    }

    /// Error for a write aborted by link teardown or shutdown
    fn interrupted(&self) -> SecsError {
        if self.shutdown.is_cancelled() {
            SecsError::Cancelled
        } else {
            SecsError::SendFailure(std::io::Error::new(
                ErrorKind::ConnectionAborted,
                "link closed during write",
            ))
        }
    }
}
