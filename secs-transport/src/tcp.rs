//! TCP transport implementation

use crate::stream::{Connection, Connector};
use async_trait::async_trait;
use secs_core::{SecsError, SecsResult};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;

/// TCP transport layer settings
#[derive(Debug, Clone)]
pub struct TcpSettings {
    pub address: SocketAddr,
    /// Bound on one connection attempt. None means wait for the OS.
    pub connect_timeout: Option<Duration>,
    /// Disable Nagle's algorithm; SECS-I control bytes are single-byte writes
    pub nodelay: bool,
}

impl TcpSettings {
    /// Create new TCP settings
    pub fn new(address: SocketAddr) -> Self {
        Self {
            address,
            connect_timeout: Some(Duration::from_secs(30)),
            nodelay: true,
        }
    }

    /// Create TCP settings with connect timeout
    pub fn with_timeout(address: SocketAddr, timeout: Duration) -> Self {
        Self {
            address,
            connect_timeout: Some(timeout),
            nodelay: true,
        }
    }
}

/// TCP connector
///
/// Each `connect` call opens a fresh `TcpStream` and splits it into owned
/// halves, so the read loop and senders never contend for one lock.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    settings: TcpSettings,
}

impl TcpConnector {
    /// Create a new TCP connector
    pub fn new(settings: TcpSettings) -> Self {
        Self { settings }
    }

    /// Create TCP connector from address string
    pub fn from_address(address: &str) -> SecsResult<Self> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| SecsError::InvalidConfig(format!("Invalid TCP address: {}", e)))?;
        Ok(Self::new(TcpSettings::new(addr)))
    }

    /// Get the settings
    pub fn settings(&self) -> &TcpSettings {
        &self.settings
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> std::io::Result<Connection> {
        let stream = if let Some(timeout) = self.settings.connect_timeout {
            tokio::time::timeout(timeout, TcpStream::connect(self.settings.address))
                .await
                .map_err(|_| {
                    std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        format!("Connect timed out after {:?}", timeout),
                    )
                })??
        } else {
            TcpStream::connect(self.settings.address).await?
        };

        if self.settings.nodelay {
            if let Err(e) = stream.set_nodelay(true) {
                log::debug!("Failed to set TCP_NODELAY on {}: {}", self.settings.address, e);
            }
        }

        let peer = match stream.peer_addr() {
            Ok(addr) => addr.to_string(),
            Err(_) => self.settings.address.to_string(),
        };
        let (reader, writer) = stream.into_split();
        Ok(Connection::new(peer, reader, writer))
    }

    fn describe(&self) -> String {
        self.settings.address.to_string()
    }
}
