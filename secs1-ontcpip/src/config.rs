//! Communicator configuration

use secs_core::{SecsError, SecsResult};
use secs_transport::TcpSettings;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Default delay between the end of a connection (or a failed attempt) and
/// the next connect attempt
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Default bound on one connect attempt
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default size of the read buffer used by the read loop
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

/// SECS-I on TCP/IP communicator configuration
///
/// # Usage Example
/// ```rust,no_run
/// use secs1_ontcpip::Secs1OnTcpIpConfig;
/// use std::time::Duration;
///
/// let config = Secs1OnTcpIpConfig::new("192.168.0.10:5000".parse().unwrap())
///     .with_name("equip-1")
///     .with_reconnect_delay(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Secs1OnTcpIpConfig {
    /// Identifier used as the log target and in log event details
    pub name: String,
    /// Remote address to connect to
    pub socket_address: SocketAddr,
    /// Wait between connection attempts
    pub reconnect_delay: Duration,
    /// Bound on one connect attempt. None means wait for the OS.
    pub connect_timeout: Option<Duration>,
    /// Size of one read from the transport
    pub read_buffer_size: usize,
    /// Disable Nagle's algorithm on the TCP socket
    pub nodelay: bool,
}

impl Default for Secs1OnTcpIpConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], 5000)))
    }
}

impl Secs1OnTcpIpConfig {
    /// Create a new configuration with default settings
    ///
    /// # Default Settings
    /// - Name: `secs1-on-tcpip`
    /// - Reconnect delay: 5 seconds
    /// - Connect timeout: 30 seconds
    /// - Read buffer: 1024 bytes
    /// - TCP_NODELAY: enabled
    pub fn new(socket_address: SocketAddr) -> Self {
        Self {
            name: "secs1-on-tcpip".to_string(),
            socket_address,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            nodelay: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns `SecsError::InvalidConfig` if the name is empty, the read
    /// buffer size is zero, or the connect timeout is zero
    pub fn validate(&self) -> SecsResult<()> {
        if self.name.trim().is_empty() {
            return Err(SecsError::InvalidConfig("name must not be empty".to_string()));
        }
        if self.read_buffer_size == 0 {
            return Err(SecsError::InvalidConfig(
                "read_buffer_size must be greater than 0".to_string(),
            ));
        }
        if self.connect_timeout == Some(Duration::ZERO) {
            return Err(SecsError::InvalidConfig(
                "connect_timeout must be greater than 0 when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the TCP transport settings for this configuration
    pub fn tcp_settings(&self) -> TcpSettings {
        TcpSettings {
            address: self.socket_address,
            connect_timeout: self.connect_timeout,
            nodelay: self.nodelay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let addr: SocketAddr = "10.0.0.5:5000".parse().unwrap();
        let config = Secs1OnTcpIpConfig::new(addr);
        assert_eq!(config.socket_address, addr);
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.read_buffer_size, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let config = Secs1OnTcpIpConfig::default().with_read_buffer_size(0);
        assert!(matches!(config.validate(), Err(SecsError::InvalidConfig(_))));

        let config = Secs1OnTcpIpConfig::default().with_name("  ");
        assert!(matches!(config.validate(), Err(SecsError::InvalidConfig(_))));

        let config = Secs1OnTcpIpConfig::default().with_connect_timeout(Some(Duration::ZERO));
        assert!(matches!(config.validate(), Err(SecsError::InvalidConfig(_))));

        let config = Secs1OnTcpIpConfig::default()
            .with_connect_timeout(None)
            .with_reconnect_delay(Duration::ZERO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tcp_settings() {
        let config = Secs1OnTcpIpConfig::default()
            .with_connect_timeout(Some(Duration::from_secs(3)))
            .with_nodelay(false);
        let settings = config.tcp_settings();
        assert_eq!(settings.address, config.socket_address);
        assert_eq!(settings.connect_timeout, Some(Duration::from_secs(3)));
        assert!(!settings.nodelay);
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let json = r#"{"socket_address":"10.0.0.5:5000","reconnect_delay":{"secs":2,"nanos":0}}"#;
        let config: Secs1OnTcpIpConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.socket_address, "10.0.0.5:5000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.reconnect_delay, Duration::from_secs(2));
        assert_eq!(config.name, "secs1-on-tcpip");
        assert_eq!(config.connect_timeout, Some(DEFAULT_CONNECT_TIMEOUT));
        assert_eq!(config.read_buffer_size, DEFAULT_READ_BUFFER_SIZE);
        assert!(config.nodelay);

        let config: Secs1OnTcpIpConfig = serde_json::from_str(r#"{"connect_timeout":null}"#).unwrap();
        assert_eq!(config.connect_timeout, None);
        assert_eq!(config.socket_address, Secs1OnTcpIpConfig::default().socket_address);

        let config = Secs1OnTcpIpConfig::default().with_name("equip-7");
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<Secs1OnTcpIpConfig>(&json).unwrap(), config);
    }
}
