//! Log events and communicator listeners

use secs_core::SecsError;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Stable subjects of the events a communicator emits
pub mod subject {
    pub const TRY_CONNECT: &str = "Secs1OnTcpIp#try-connect";
    pub const CONNECTED: &str = "Secs1OnTcpIp#connected";
    pub const CLOSED: &str = "Secs1OnTcpIp#closed";
    pub const CONNECT_FAILED: &str = "Secs1OnTcpIp#connect-failed";
    pub const READ_FAULT: &str = "Secs1OnTcpIp#read-fault";
    pub const FATAL: &str = "Secs1OnTcpIp#fatal";
}

/// A log event emitted by the communicator
///
/// The communicator never formats events for display; it only guarantees a
/// stable `subject`, an optional detail (usually the remote address) and,
/// for error events, the associated error.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub subject: &'static str,
    pub level: log::Level,
    pub detail: Option<String>,
    pub error: Option<Arc<SecsError>>,
}

impl LogEvent {
    pub fn info(subject: &'static str) -> Self {
        Self {
            subject,
            level: log::Level::Info,
            detail: None,
            error: None,
        }
    }

    pub fn error(subject: &'static str, error: SecsError) -> Self {
        Self {
            subject,
            level: log::Level::Error,
            detail: None,
            error: Some(Arc::new(error)),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.subject)?;
        if let Some(detail) = &self.detail {
            write!(f, " {}", detail)?;
        }
        if let Some(error) = &self.error {
            write!(f, ": {}", error)?;
        }
        Ok(())
    }
}

/// Receives communicator notifications
///
/// Called synchronously from the reconnect loop; implementations must not
/// block.
#[cfg_attr(test, mockall::automock)]
pub trait CommunicatorListener: Send + Sync {
    /// The link became usable (`true`) or went away (`false`)
    fn communicatable_changed(&self, communicatable: bool);

    /// An informational or error event
    fn log(&self, event: &LogEvent);
}

/// Listener that forwards events to the `log` facade
#[derive(Debug, Clone)]
pub struct LogListener {
    target: String,
}

impl LogListener {
    /// Create a listener logging under `target`
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl CommunicatorListener for LogListener {
    fn communicatable_changed(&self, communicatable: bool) {
        log::info!(target: self.target.as_str(), "communicatable: {}", communicatable);
    }

    fn log(&self, event: &LogEvent) {
        log::log!(target: self.target.as_str(), event.level, "{}", event);
    }
}

/// Fan-out over registered listeners
#[derive(Default)]
pub(crate) struct ListenerSet {
    listeners: RwLock<Vec<Arc<dyn CommunicatorListener>>>,
}

impl ListenerSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&self, listener: Arc<dyn CommunicatorListener>) {
        self.listeners
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(listener);
    }

    fn snapshot(&self) -> Vec<Arc<dyn CommunicatorListener>> {
        self.listeners
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn communicatable_changed(&self, communicatable: bool) {
        for listener in self.snapshot() {
            listener.communicatable_changed(communicatable);
        }
    }

    pub(crate) fn log(&self, event: &LogEvent) {
        for listener in self.snapshot() {
            listener.log(event);
        }
    }
}

impl fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("len", &self.snapshot().len())
            .finish()
    }
}
