//! Reconnect loop
//!
//! Owns the connection lifecycle of one communicator:
//!
//! ```text
//! loop {
//!     Disconnected -> Connecting
//!     connect ──failed──> log ConnectFailure ───────────────┐
//!        └─ok─> install, Connected, run read loop           │
//!               read loop ends -> remove, Disconnected      │
//!     sleep(reconnect_delay) <──────────────────────────────┘
//! }
//! ```
//!
//! Shutdown is observed at every suspension point (connect, read, sleep) and
//! ends the loop with no further attempt.

use crate::context::LinkContext;
use crate::notification::{subject, LogEvent};
use crate::reader::Reader;
use crate::slot::ConnectionHandle;
use crate::state::LinkState;
use secs_core::{SecsError, SecsResult};
use secs_transport::{Connection, Connector};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub(crate) struct ConnectLoop {
    ctx: Arc<LinkContext>,
    connector: Arc<dyn Connector>,
    reconnect_delay: Duration,
    read_buffer_size: usize,
    shutdown: CancellationToken,
    next_id: AtomicU64,
}

impl ConnectLoop {
    pub(crate) fn new(
        ctx: Arc<LinkContext>,
        connector: Arc<dyn Connector>,
        reconnect_delay: Duration,
        read_buffer_size: usize,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            ctx,
            connector,
            reconnect_delay,
            read_buffer_size,
            shutdown,
            next_id: AtomicU64::new(1),
        }
    }

    /// Run until shutdown or a fatal fault
    ///
    /// Connection-level faults are logged and retried. Anything else ends the
    /// loop and is returned.
    pub(crate) async fn run(self) -> SecsResult<()> {
        let result = self.run_attempts().await;

        if let Err(e) = &result {
            log::error!("Reconnect loop for {} stopped: {}", self.connector.describe(), e);
            // Fatal faults carry no io::Error, so listeners get the same variant.
            let reported = e
                .try_clone()
                .unwrap_or_else(|| SecsError::Coordination(e.to_string()));
            self.ctx
                .emit(LogEvent::error(subject::FATAL, reported).with_detail(self.connector.describe()));
        }
        self.ctx.state.force(LinkState::Closed);
        result
    }

    async fn run_attempts(&self) -> SecsResult<()> {
        let target = self.connector.describe();

        loop {
            if self.shutdown.is_cancelled() {
                return Ok(());
            }

            self.ctx.state.transition(LinkState::Connecting)?;
            self.ctx.statistics.record_connect_attempt();
            self.ctx.emit(LogEvent::info(subject::TRY_CONNECT).with_detail(target.as_str()));

            let attempt = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Ok(()),
                attempt = self.connector.connect() => attempt,
            };

            match attempt {
                Ok(connection) => self.serve(connection).await?,
                Err(source) => {
                    self.ctx.statistics.record_connect_failure();
                    self.ctx.state.transition(LinkState::Disconnected)?;
                    self.ctx.emit(LogEvent::error(
                        subject::CONNECT_FAILED,
                        SecsError::ConnectFailure {
                            address: target.clone(),
                            source,
                        },
                    ));
                }
            }

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Ok(()),
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
    }

    /// Install a fresh link, read it until it ends, then tear it down
    async fn serve(&self, connection: Connection) -> SecsResult<()> {
        let (peer, mut reader, writer) = connection.into_parts();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = Arc::new(ConnectionHandle::new(
            id,
            peer.clone(),
            writer,
            self.shutdown.child_token(),
        ));

        let installed = InstalledConnection::install(&self.ctx, handle)?;

        let outcome = Reader::new(
            &self.ctx.queue,
            &self.ctx.arrivals,
            &self.ctx.statistics,
            self.read_buffer_size,
        )
        .run(&mut reader, installed.handle().terminated())
        .await;

        installed.release().await;
        drop(reader);

        match outcome {
            Ok(end) => {
                log::debug!("Read loop for {} ended: {}", peer, end.as_str());
                Ok(())
            }
            Err(e @ SecsError::ReadFault(_)) => {
                self.ctx.statistics.record_read_fault();
                self.ctx.emit(LogEvent::error(subject::READ_FAULT, e).with_detail(peer));
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// A link installed in the connection slot
///
/// `release` is the normal exit. If the owning future is dropped instead
/// (e.g. the loop task is aborted), `Drop` still removes the link from the
/// slot and reports the link as gone; the write half is then closed when the
/// last reference to the handle drops.
struct InstalledConnection<'a> {
    ctx: &'a LinkContext,
    handle: Arc<ConnectionHandle>,
    released: bool,
}

impl<'a> InstalledConnection<'a> {
    /// Nothing is reported and the slot is left as found if this fails.
    fn install(ctx: &'a LinkContext, handle: Arc<ConnectionHandle>) -> SecsResult<Self> {
        ctx.state.transition(LinkState::Connected)?;
        if let Err(e) = ctx.slot.install(handle.clone()) {
            ctx.state.force(LinkState::Disconnected);
            return Err(e);
        }
        let installed = Self {
            ctx,
            handle,
            released: false,
        };

        ctx.statistics.record_connection();
        ctx.communicatable_changed(true);
        ctx.emit(LogEvent::info(subject::CONNECTED).with_detail(installed.handle.peer()));
        Ok(installed)
    }

    fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    /// Remove the link before reporting it gone, so anyone reacting to
    /// `communicatable = false` already sees an empty slot.
    fn detach(&mut self) {
        self.released = true;
        self.handle.terminate();
        self.ctx.slot.remove(self.handle.id());
        self.ctx.statistics.record_disconnect();
        self.ctx.state.force(LinkState::Disconnected);
        self.ctx.communicatable_changed(false);
    }

    async fn release(mut self) {
        self.detach();

        if let Err(e) = self.handle.shutdown().await {
            log::debug!("Shutdown of {} failed: {}", self.handle.peer(), e);
        }
        self.ctx
            .emit(LogEvent::info(subject::CLOSED).with_detail(self.handle.peer()));
    }
}

impl Drop for InstalledConnection<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.detach();
        }
    }
}
