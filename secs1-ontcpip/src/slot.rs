//! Connection slot: the single live link

use secs_core::{SecsError, SecsResult};
use secs_transport::BoxedWriter;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// A live link as seen by senders
///
/// Owned by the reconnect loop; senders borrow it for one `send`. The write
/// half sits behind an async mutex, so a send and the teardown never touch
/// the socket at the same time. `terminated` is cancelled when the link must
/// go away (remote close detected, read loop ended or shutdown).
pub struct ConnectionHandle {
    id: u64,
    peer: String,
    writer: Mutex<Option<BoxedWriter>>,
    terminated: CancellationToken,
}

impl ConnectionHandle {
    pub(crate) fn new(id: u64, peer: String, writer: BoxedWriter, terminated: CancellationToken) -> Self {
        Self {
            id,
            peer,
            writer: Mutex::new(Some(writer)),
            terminated,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Description of the remote end
    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn is_open(&self) -> bool {
        !self.terminated.is_cancelled()
    }

    pub(crate) fn writer(&self) -> &Mutex<Option<BoxedWriter>> {
        &self.writer
    }

    pub(crate) fn terminated(&self) -> &CancellationToken {
        &self.terminated
    }

    /// Ask the reconnect loop to tear this link down
    pub(crate) fn terminate(&self) {
        self.terminated.cancel();
    }

    /// Shut down and drop the write half
    ///
    /// Waits for an in-flight write to finish or abort first.
    pub(crate) async fn shutdown(&self) -> std::io::Result<()> {
        let writer = self.writer.lock().await.take();
        match writer {
            Some(mut writer) => writer.shutdown().await,
            None => Ok(()),
        }
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Holds zero or one live link
///
/// Install and remove are single swaps under the lock, so a sender sees
/// either the whole handle or nothing.
#[derive(Debug, Default)]
pub struct ConnectionSlot {
    current: RwLock<Option<Arc<ConnectionHandle>>>,
}

impl ConnectionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a link
    ///
    /// # Errors
    /// `SecsError::Coordination` if the slot already holds a link
    pub(crate) fn install(&self, handle: Arc<ConnectionHandle>) -> SecsResult<()> {
        let mut current = self
            .current
            .write()
            .map_err(|_| SecsError::poisoned("connection slot"))?;
        if let Some(existing) = current.as_ref() {
            return Err(SecsError::Coordination(format!(
                "connection slot already holds link {} to {}",
                existing.id, existing.peer
            )));
        }
        *current = Some(handle);
        Ok(())
    }

    /// Remove the link with `id`, if it is the installed one
    pub(crate) fn remove(&self, id: u64) -> Option<Arc<ConnectionHandle>> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if current.as_ref().is_some_and(|handle| handle.id == id) {
            current.take()
        } else {
            None
        }
    }

    /// The installed link, if any
    pub fn current(&self) -> SecsResult<Option<Arc<ConnectionHandle>>> {
        Ok(self
            .current
            .read()
            .map_err(|_| SecsError::poisoned("connection slot"))?
            .clone())
    }

    pub fn is_occupied(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
