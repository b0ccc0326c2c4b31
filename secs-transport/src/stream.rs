//! Connector trait for transport layer

use async_trait::async_trait;
use std::fmt;
use tokio::io::{AsyncRead, AsyncWrite};

/// Read half of an open link
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Write half of an open link
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// An established point-to-point link, split into independent halves
///
/// The reader half is driven by the per-connection read loop while the
/// writer half is shared with senders, so both directions progress at the
/// same time (full duplex).
pub struct Connection {
    peer: String,
    reader: BoxedReader,
    writer: BoxedWriter,
}

impl Connection {
    /// Create a connection from its halves
    ///
    /// # Arguments
    ///
    /// * `peer` - Description of the remote end, used in log events
    /// * `reader` - Read half
    /// * `writer` - Write half
    pub fn new<R, W>(peer: impl Into<String>, reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            peer: peer.into(),
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }

    /// Description of the remote end
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Split into peer description, read half and write half
    pub fn into_parts(self) -> (String, BoxedReader, BoxedWriter) {
        (self.peer, self.reader, self.writer)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection").field("peer", &self.peer).finish()
    }
}

/// Opens links for the reconnect loop
///
/// Every call to `connect` is one connection attempt. The caller owns the
/// retry policy; implementations must not retry internally.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Attempt to open a new link
    ///
    /// # Returns
    ///
    /// The established connection, or the I/O error that made the attempt
    /// fail (a connect timeout is reported as `ErrorKind::TimedOut`)
    async fn connect(&self) -> std::io::Result<Connection>;

    /// Describe the target of this connector (e.g. the socket address)
    fn describe(&self) -> String;
}
