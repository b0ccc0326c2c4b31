use thiserror::Error;

/// Main error type for SECS-I communicator operations
///
/// Connection-level variants (`ConnectFailure`, `ReadFault`) are absorbed by
/// the connect loop and only ever reach the notification sink. Operation-level
/// variants (`NotConnected`, `DetectTerminate`, `SendFailure`, `Cancelled`)
/// are returned to the caller of `send`.
#[derive(Error, Debug)]
pub enum SecsError {
    #[error("Connect to {address} failed: {source}")]
    ConnectFailure {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Read fault: {0}")]
    ReadFault(#[source] std::io::Error),

    #[error("Not connected")]
    NotConnected,

    #[error("Detect terminate: remote closed the link during write")]
    DetectTerminate,

    #[error("Send failure: {0}")]
    SendFailure(#[source] std::io::Error),

    #[error("Cancelled")]
    Cancelled,

    #[error("Coordination failure: {0}")]
    Coordination(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Communicator already opened")]
    AlreadyOpened,

    #[error("Communicator already closed")]
    AlreadyClosed,

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition {
        from: &'static str,
        to: &'static str,
    },
}

impl SecsError {
    /// Check if this error belongs to the connection lifecycle
    ///
    /// These errors are handled by the reconnect loop and never returned
    /// from `send` or the poll operations.
    pub fn is_connection_level(&self) -> bool {
        matches!(self, SecsError::ConnectFailure { .. } | SecsError::ReadFault(_))
    }

    /// Check if retrying the same operation on the same link can succeed
    ///
    /// `DetectTerminate` proves the link is gone and `NotConnected` has no
    /// link at all, so neither is worth retrying until the communicator
    /// reconnects. Cancellation ends the caller's work.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SecsError::SendFailure(_))
    }

    /// Copy an error that carries no `std::io::Error`
    ///
    /// Returns `None` for the I/O-backed variants, which cannot be cloned.
    pub fn try_clone(&self) -> Option<Self> {
        Some(match self {
            SecsError::NotConnected => SecsError::NotConnected,
            SecsError::DetectTerminate => SecsError::DetectTerminate,
            SecsError::Cancelled => SecsError::Cancelled,
            SecsError::Coordination(message) => SecsError::Coordination(message.clone()),
            SecsError::InvalidConfig(message) => SecsError::InvalidConfig(message.clone()),
            SecsError::AlreadyOpened => SecsError::AlreadyOpened,
            SecsError::AlreadyClosed => SecsError::AlreadyClosed,
            SecsError::InvalidStateTransition { from, to } => SecsError::InvalidStateTransition { from: *from, to: *to },
            SecsError::ConnectFailure { .. } | SecsError::ReadFault(_) | SecsError::SendFailure(_) => return None,
        })
    }

    /// Wrap a poisoned lock into a coordination failure
    pub fn poisoned(what: &str) -> Self {
        SecsError::Coordination(format!("{} lock poisoned", what))
    }
}

/// Result type alias for SECS-I communicator operations
pub type SecsResult<T> = Result<T, SecsError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_classification() {
        let connect = SecsError::ConnectFailure {
            address: "127.0.0.1:5000".to_string(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert!(connect.is_connection_level());
        assert!(!connect.is_retryable());

        assert!(SecsError::ReadFault(io::Error::from(io::ErrorKind::ConnectionReset))
            .is_connection_level());

        assert!(!SecsError::DetectTerminate.is_retryable());
        assert!(!SecsError::NotConnected.is_retryable());
        assert!(!SecsError::Cancelled.is_retryable());
        assert!(SecsError::SendFailure(io::Error::from(io::ErrorKind::TimedOut)).is_retryable());
    }

    #[test]
    fn test_display() {
        let err = SecsError::ConnectFailure {
            address: "10.0.0.1:5000".to_string(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert_eq!(err.to_string(), "Connect to 10.0.0.1:5000 failed: refused");
        assert_eq!(SecsError::poisoned("byte queue").to_string(), "Coordination failure: byte queue lock poisoned");
    }

    #[test]
    fn test_try_clone() {
        let err = SecsError::InvalidStateTransition {
            from: "Closed",
            to: "Connecting",
        };
        assert!(matches!(
            err.try_clone(),
            Some(SecsError::InvalidStateTransition { from: "Closed", to: "Connecting" })
        ));
        assert!(matches!(err.try_clone(), Some(e) if e.to_string() == err.to_string()));
        assert!(SecsError::ReadFault(io::Error::from(io::ErrorKind::ConnectionReset))
            .try_clone()
            .is_none());
    }
}
