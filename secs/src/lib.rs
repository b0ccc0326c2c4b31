//! SECS-I on TCP/IP transport for equipment communication
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `secs-core`: Error taxonomy and SECS-I control characters
//! - `secs-transport`: Connector abstraction and TCP transport
//! - `secs1-ontcpip`: Reconnect loop, byte queue, poll and send operations
//!
//! # Usage
//!
//! ```no_run
//! use secs::secs1::{Secs1OnTcpIpCommunicator, Secs1OnTcpIpConfig};
//!
//! # async fn run() -> secs::SecsResult<()> {
//! let config = Secs1OnTcpIpConfig::new("127.0.0.1:5000".parse().unwrap());
//! let comm = Secs1OnTcpIpCommunicator::new(config)?;
//! comm.open()?;
//! comm.close().await
//! # }
//! ```

pub use secs_core;
pub use secs_transport as transport;
pub use secs1_ontcpip as secs1;

pub use secs_core::{control, SecsError, SecsResult};
