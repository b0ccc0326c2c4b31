//! Transport layer module for SECS-I communicators
//!
//! This crate provides the connector abstraction the reconnect loop uses to
//! open links, and its TCP implementation.

pub mod stream;
pub mod tcp;

pub use secs_core::{SecsError, SecsResult};
pub use stream::{BoxedReader, BoxedWriter, Connection, Connector};
pub use tcp::{TcpConnector, TcpSettings};
