//! Link state machine

use secs_core::{SecsError, SecsResult};
use std::sync::Arc;
use tokio::sync::watch;

/// Link state of a communicator
///
/// # State Transitions
/// ```text
/// Disconnected -> Connecting   (connect attempt starts)
/// Connecting   -> Connected    (attempt succeeded, link installed)
/// Connecting   -> Disconnected (attempt failed)
/// Connected    -> Disconnected (read loop ended, link removed)
/// any          -> Closed       (communicator closed, terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No link; waiting for the next attempt (initial state)
    Disconnected,
    /// A connect attempt is in flight
    Connecting,
    /// A link is installed and the read loop is running
    Connected,
    /// The communicator was closed; no further attempts are made
    Closed,
}

impl LinkState {
    /// Check if a usable link exists
    pub fn is_communicatable(&self) -> bool {
        matches!(self, LinkState::Connected)
    }

    /// Check if this is the terminal state
    pub fn is_closed(&self) -> bool {
        matches!(self, LinkState::Closed)
    }

    /// Validate state transition
    ///
    /// # Returns
    /// `Ok(())` if transition is valid, `Err(SecsError::InvalidStateTransition)` otherwise
    pub fn validate_transition(&self, new_state: LinkState) -> SecsResult<()> {
        let valid = match (*self, new_state) {
            (LinkState::Disconnected, LinkState::Connecting) => true,
            (LinkState::Connecting, LinkState::Connected) => true,
            (LinkState::Connecting, LinkState::Disconnected) => true,
            (LinkState::Connected, LinkState::Disconnected) => true,
            (LinkState::Disconnected, LinkState::Disconnected) => true,
            (_, LinkState::Closed) => true,
            _ => false,
        };

        if valid {
            Ok(())
        } else {
            Err(SecsError::InvalidStateTransition {
                from: self.as_str(),
                to: new_state.as_str(),
            })
        }
    }

    /// Get human-readable state name
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkState::Disconnected => "Disconnected",
            LinkState::Connecting => "Connecting",
            LinkState::Connected => "Connected",
            LinkState::Closed => "Closed",
        }
    }
}

/// Shared, observable link state
#[derive(Debug, Clone)]
pub(crate) struct StateCell {
    tx: Arc<watch::Sender<LinkState>>,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(LinkState::Disconnected);
        Self { tx: Arc::new(tx) }
    }

    pub(crate) fn get(&self) -> LinkState {
        *self.tx.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.tx.subscribe()
    }

    /// Move to `to` if the transition is valid
    pub(crate) fn transition(&self, to: LinkState) -> SecsResult<()> {
        let mut result = Ok(());
        self.tx.send_if_modified(|current| match current.validate_transition(to) {
            Ok(()) => {
                let changed = *current != to;
                *current = to;
                changed
            }
            Err(e) => {
                result = Err(e);
                false
            }
        });
        result
    }

    /// Move to `to` unless the state is already terminal
    pub(crate) fn force(&self, to: LinkState) {
        self.tx.send_if_modified(|current| {
            if current.is_closed() || *current == to {
                false
            } else {
                *current = to;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        assert!(LinkState::Disconnected.validate_transition(LinkState::Connecting).is_ok());
        assert!(LinkState::Connecting.validate_transition(LinkState::Connected).is_ok());
        assert!(LinkState::Connecting.validate_transition(LinkState::Disconnected).is_ok());
        assert!(LinkState::Connected.validate_transition(LinkState::Disconnected).is_ok());
        assert!(LinkState::Connected.validate_transition(LinkState::Closed).is_ok());

        let err = LinkState::Disconnected
            .validate_transition(LinkState::Connected)
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid state transition: Disconnected -> Connected");
        assert!(LinkState::Closed.validate_transition(LinkState::Connecting).is_err());
        assert!(LinkState::Connected.validate_transition(LinkState::Connecting).is_err());
    }

    #[test]
    fn test_state_cell() {
        let cell = StateCell::new();
        let mut rx = cell.subscribe();
        assert_eq!(cell.get(), LinkState::Disconnected);

        cell.transition(LinkState::Connecting).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), LinkState::Connecting);

        assert!(cell.transition(LinkState::Connecting).is_err());
        assert_eq!(cell.get(), LinkState::Connecting);

        cell.force(LinkState::Closed);
        cell.force(LinkState::Disconnected);
        assert_eq!(cell.get(), LinkState::Closed);
        assert!(!cell.get().is_communicatable());
    }
}
