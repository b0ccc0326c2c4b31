//! SECS-I on TCP/IP communicator

use crate::arrival::ArrivalWatcher;
use crate::config::Secs1OnTcpIpConfig;
use crate::connect_loop::ConnectLoop;
use crate::context::LinkContext;
use crate::notification::{CommunicatorListener, LogListener};
use crate::poller::{Poller, RequestSet};
use crate::sender::Sender;
use crate::state::LinkState;
use crate::statistics::LinkStatisticsSnapshot;
use secs_core::{SecsError, SecsResult};
use secs_transport::{Connector, TcpConnector};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

enum Lifecycle {
    Created,
    Opened(JoinHandle<SecsResult<()>>),
    Closed,
}

/// SECS-I on TCP/IP communicator
///
/// Keeps one TCP link to the configured address alive, reconnecting after
/// the configured delay until closed, and exposes the byte-level poll and
/// send operations a SECS-I link-protocol engine runs on.
///
/// # Usage Example
/// ```rust,no_run
/// use secs1_ontcpip::{RequestSet, Secs1OnTcpIpCommunicator, Secs1OnTcpIpConfig};
/// use secs_core::control::{ENQ, EOT};
/// use std::time::Duration;
///
/// # async fn run() -> secs_core::SecsResult<()> {
/// let config = Secs1OnTcpIpConfig::new("192.168.0.10:5000".parse().unwrap());
/// let comm = Secs1OnTcpIpCommunicator::new(config)?;
/// comm.open()?;
///
/// comm.send_bytes(&[ENQ]).await?;
/// let reply = comm
///     .poll_byte_matching_timeout(&RequestSet::from([EOT]), Duration::from_secs(10))
///     .await?;
///
/// comm.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct Secs1OnTcpIpCommunicator {
    config: Secs1OnTcpIpConfig,
    connector: Arc<dyn Connector>,
    ctx: Arc<LinkContext>,
    shutdown: CancellationToken,
    lifecycle: Mutex<Lifecycle>,
}

impl Secs1OnTcpIpCommunicator {
    /// Create a communicator connecting over TCP
    ///
    /// # Errors
    /// `SecsError::InvalidConfig` if the configuration does not validate
    pub fn new(config: Secs1OnTcpIpConfig) -> SecsResult<Self> {
        let connector = TcpConnector::new(config.tcp_settings());
        Self::with_connector(config, Arc::new(connector))
    }

    /// Create a communicator using a custom connector
    ///
    /// `config.socket_address` and the TCP options are ignored; the reconnect
    /// delay and read buffer size still apply.
    pub fn with_connector(config: Secs1OnTcpIpConfig, connector: Arc<dyn Connector>) -> SecsResult<Self> {
        config.validate()?;

        let ctx = Arc::new(LinkContext::new());
        ctx.listeners.add(Arc::new(LogListener::new(config.name.clone())));

        Ok(Self {
            config,
            connector,
            ctx,
            shutdown: CancellationToken::new(),
            lifecycle: Mutex::new(Lifecycle::Created),
        })
    }

    pub fn config(&self) -> &Secs1OnTcpIpConfig {
        &self.config
    }

    /// Register a listener for communicatable changes and log events
    pub fn add_listener(&self, listener: Arc<dyn CommunicatorListener>) {
        self.ctx.listeners.add(listener);
    }

    /// Start the reconnect loop
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// - `SecsError::AlreadyOpened` if already open
    /// - `SecsError::AlreadyClosed` if the communicator was closed
    pub fn open(&self) -> SecsResult<()> {
        let mut lifecycle = self
            .lifecycle
            .lock()
            .map_err(|_| SecsError::poisoned("lifecycle"))?;

        match *lifecycle {
            Lifecycle::Opened(_) => return Err(SecsError::AlreadyOpened),
            Lifecycle::Closed => return Err(SecsError::AlreadyClosed),
            Lifecycle::Created => {}
        }

        let connect_loop = ConnectLoop::new(
            self.ctx.clone(),
            self.connector.clone(),
            self.config.reconnect_delay,
            self.config.read_buffer_size,
            self.shutdown.clone(),
        );
        *lifecycle = Lifecycle::Opened(tokio::spawn(connect_loop.run()));

        log::info!(target: self.config.name.as_str(), "opened, target {}", self.connector.describe());
        Ok(())
    }

    /// Stop the reconnect loop and tear down the live link
    ///
    /// Blocked polls return `None` and in-flight sends fail with
    /// `SecsError::Cancelled`. Closing twice is a no-op.
    ///
    /// # Returns
    /// The fatal fault that stopped the loop earlier, if any
    pub async fn close(&self) -> SecsResult<()> {
        let previous = {
            let mut lifecycle = self
                .lifecycle
                .lock()
                .map_err(|_| SecsError::poisoned("lifecycle"))?;
            std::mem::replace(&mut *lifecycle, Lifecycle::Closed)
        };

        self.shutdown.cancel();

        let result = match previous {
            Lifecycle::Created => {
                self.ctx.state.force(LinkState::Closed);
                Ok(())
            }
            Lifecycle::Opened(task) => match task.await {
                Ok(result) => result,
                Err(e) => Err(SecsError::Coordination(format!("reconnect loop task failed: {}", e))),
            },
            Lifecycle::Closed => return Ok(()),
        };

        log::info!(target: self.config.name.as_str(), "closed");
        result
    }

    pub fn is_open(&self) -> bool {
        self.lifecycle
            .lock()
            .map(|lifecycle| matches!(*lifecycle, Lifecycle::Opened(_)))
            .unwrap_or(false)
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Whether a usable link currently exists
    pub fn is_communicatable(&self) -> bool {
        self.ctx.state.get().is_communicatable()
    }

    pub fn state(&self) -> LinkState {
        self.ctx.state.get()
    }

    /// Observe link state changes
    pub fn state_watcher(&self) -> watch::Receiver<LinkState> {
        self.ctx.state.subscribe()
    }

    /// Wait until the link reaches `target`
    ///
    /// Returns immediately if it is already there. Does not time out; wrap
    /// in `tokio::time::timeout` when the state may never be reached.
    pub async fn wait_for_state(&self, target: LinkState) -> SecsResult<()> {
        let mut rx = self.ctx.state.subscribe();
        rx.wait_for(|state| *state == target)
            .await
            .map(|_| ())
            .map_err(|_| SecsError::Coordination("link state channel closed".to_string()))
    }

    pub fn statistics(&self) -> LinkStatisticsSnapshot {
        self.ctx.statistics.snapshot()
    }

    /// Read side, for the link-protocol engine's own task
    pub fn poller(&self) -> Poller {
        Poller::new(self.ctx.queue.clone(), self.ctx.statistics.clone(), self.shutdown.clone())
    }

    /// Write side, for the link-protocol engine's own task
    pub fn sender(&self) -> Sender {
        Sender::new(self.ctx.slot.clone(), self.ctx.statistics.clone(), self.shutdown.clone())
    }

    /// Watch for "data arrived" broadcasts from the read loop
    pub fn arrivals(&self) -> ArrivalWatcher {
        self.ctx.arrivals.subscribe()
    }

    /// See [`Poller::try_poll`]
    pub fn try_poll_byte(&self) -> SecsResult<Option<u8>> {
        self.poller().try_poll()
    }

    /// See [`Poller::poll`]
    pub async fn poll_byte(&self, timeout: Duration) -> SecsResult<Option<u8>> {
        self.poller().poll(timeout).await
    }

    /// See [`Poller::poll_matching`]
    pub async fn poll_byte_matching(&self, request: &RequestSet) -> SecsResult<Option<u8>> {
        self.poller().poll_matching(request).await
    }

    /// See [`Poller::poll_matching_timeout`]
    pub async fn poll_byte_matching_timeout(&self, request: &RequestSet, timeout: Duration) -> SecsResult<Option<u8>> {
        self.poller().poll_matching_timeout(request, timeout).await
    }

    /// See [`Poller::drain`]
    pub fn poll_byte_until_empty(&self) -> SecsResult<usize> {
        self.poller().drain()
    }

    /// See [`Sender::send`]
    pub async fn send_bytes(&self, bytes: &[u8]) -> SecsResult<()> {
        self.sender().send(bytes).await
    }
}

impl Drop for Secs1OnTcpIpCommunicator {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl fmt::Debug for Secs1OnTcpIpCommunicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secs1OnTcpIpCommunicator")
            .field("name", &self.config.name)
            .field("target", &self.connector.describe())
            .field("state", &self.state())
            .finish()
    }
}
