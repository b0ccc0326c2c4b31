//! SECS-I on TCP/IP communicator
//!
//! This crate bridges a TCP link to the byte-level primitives a SECS-I
//! (SEMI E4) link-protocol engine runs on:
//!
//! - a reconnect loop that keeps at most one link alive until closed
//! - a read loop that drains the link into an ordered byte queue
//! - poll operations (plain, timed, filtered, drain) over that queue
//! - a send operation that writes whole blocks to the live link
//!
//! Block framing, checksums and retry counts belong to the engine.
//!
//! # Architecture
//!
//! ```text
//! network ─> read loop ─> ByteQueue ─> Poller ─> engine ─> Sender ─> network
//!                 └─> ArrivalSignal ─> engine
//! ```

pub mod arrival;
pub mod byte_queue;
pub mod communicator;
pub mod config;
mod connect_loop;
mod context;
pub mod notification;
pub mod poller;
mod reader;
pub mod sender;
pub mod slot;
pub mod state;
pub mod statistics;

pub use arrival::{ArrivalSignal, ArrivalWatcher};
pub use byte_queue::ByteQueue;
pub use communicator::Secs1OnTcpIpCommunicator;
pub use config::Secs1OnTcpIpConfig;
pub use notification::{subject, CommunicatorListener, LogEvent, LogListener};
pub use poller::{Poller, RequestSet};
pub use secs_core::{SecsError, SecsResult};
pub use sender::Sender;
pub use slot::{ConnectionHandle, ConnectionSlot};
pub use state::LinkState;
pub use statistics::{LinkStatistics, LinkStatisticsSnapshot};
