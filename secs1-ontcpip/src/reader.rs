//! Per-connection read loop

use crate::arrival::ArrivalSignal;
use crate::byte_queue::ByteQueue;
use crate::statistics::LinkStatistics;
use bytes::BytesMut;
use secs_core::{SecsError, SecsResult};
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

/// Why a read loop ended without a fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadEnd {
    /// The remote end closed the link
    Eof,
    /// The channel was closed locally while a read was pending
    Closed,
    /// Termination or shutdown was requested
    Cancelled,
}

impl ReadEnd {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            ReadEnd::Eof => "remote closed",
            ReadEnd::Closed => "channel closed",
            ReadEnd::Cancelled => "cancelled",
        }
    }
}

/// Drains one link into the byte queue
pub(crate) struct Reader<'a> {
    queue: &'a ByteQueue,
    arrivals: &'a ArrivalSignal,
    statistics: &'a LinkStatistics,
    buffer_size: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(
        queue: &'a ByteQueue,
        arrivals: &'a ArrivalSignal,
        statistics: &'a LinkStatistics,
        buffer_size: usize,
    ) -> Self {
        Self {
            queue,
            arrivals,
            statistics,
            buffer_size,
        }
    }

    /// Read until the link ends
    ///
    /// Every non-empty chunk is appended to the queue in order, then the
    /// arrival signal is raised.
    ///
    /// # Errors
    /// - `SecsError::ReadFault` for any read error other than a local close
    /// - `SecsError::Coordination` if the queue cannot be appended to
    pub(crate) async fn run<R>(&self, reader: &mut R, cancel: &CancellationToken) -> SecsResult<ReadEnd>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut buffer = BytesMut::with_capacity(self.buffer_size);

        loop {
            buffer.clear();

            let n = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(ReadEnd::Cancelled),
                result = reader.read_buf(&mut buffer) => match result {
                    Ok(n) => n,
                    Err(e) if is_local_close(&e) => return Ok(ReadEnd::Closed),
                    Err(e) => return Err(SecsError::ReadFault(e)),
                },
            };

            if n == 0 {
                return Ok(ReadEnd::Eof);
            }

            self.queue.push_slice(&buffer[..n])?;
            self.statistics.add_bytes_received(n);
            self.arrivals.notify();
        }
    }
}

fn is_local_close(error: &std::io::Error) -> bool {
    matches!(error.kind(), ErrorKind::NotConnected | ErrorKind::ConnectionAborted)
}
