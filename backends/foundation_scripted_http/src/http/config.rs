//! Scripted server configuration.

use core::time::Duration;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

/// Configuration for [`super::ScriptedServer`].
#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    /// Address to listen on
    bind_addr: SocketAddr,
    /// Largest request head (request line plus headers) accepted
    max_head_bytes: usize,
    /// How long a read may block, including the wait for the next request
    /// on a keep-alive connection
    read_timeout: Duration,
    /// Pause between polls of the listener for new connections
    accept_poll: Duration,
}

impl ServerConfig {
    /// Creates a configuration with default values.
    ///
    /// Defaults:
    /// - `bind_addr`: `127.0.0.1:0` (random free port)
    /// - `max_head_bytes`: 16 KiB
    /// - `read_timeout`: 5 seconds
    /// - `accept_poll`: 10 milliseconds
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bind_addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)),
            max_head_bytes: 16 * 1024,
            read_timeout: Duration::from_secs(5),
            accept_poll: Duration::from_millis(10),
        }
    }

    #[must_use]
    pub const fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    #[must_use]
    pub const fn max_head_bytes(mut self, bytes: usize) -> Self {
        self.max_head_bytes = bytes;
        self
    }

    /// Sets how long a connection read may block.
    ///
    /// This also bounds how long an idle keep-alive connection stays open:
    /// once no new request arrives within `timeout`, the server closes it.
    /// Clients that pool connections and pause longer than this between
    /// requests may race that close, so raise it for such tests.
    #[must_use]
    pub const fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn accept_poll(mut self, poll: Duration) -> Self {
        self.accept_poll = poll;
        self
    }

    #[must_use]
    pub const fn get_bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    #[must_use]
    pub const fn get_max_head_bytes(&self) -> usize {
        self.max_head_bytes
    }

    #[must_use]
    pub const fn get_read_timeout(&self) -> Duration {
        self.read_timeout
    }

    #[must_use]
    pub const fn get_accept_poll(&self) -> Duration {
        self.accept_poll
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.get_bind_addr().to_string(), "127.0.0.1:0");
        assert_eq!(config.get_max_head_bytes(), 16 * 1024);
        assert_eq!(config.get_read_timeout(), Duration::from_secs(5));
        assert_eq!(config.get_accept_poll(), Duration::from_millis(10));
    }

    #[test]
    fn test_builder_overrides() {
        let config = ServerConfig::new()
            .max_head_bytes(512)
            .read_timeout(Duration::from_millis(250))
            .accept_poll(Duration::from_millis(1));
        assert_eq!(config.get_max_head_bytes(), 512);
        assert_eq!(config.get_read_timeout(), Duration::from_millis(250));
        assert_eq!(config.get_accept_poll(), Duration::from_millis(1));
    }
}
