//! Server configuration.

use std::time::Duration;

use parley_core::constants::{
    DEFAULT_HEARTBEAT_INTERVAL_SECS, DEFAULT_HEARTBEAT_TIMEOUT_SECS, DEFAULT_HOST,
    DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_PORT, DEFAULT_SEND_QUEUE_CAPACITY,
};
use parley_settings::ServerSettings;

/// Configuration for the chat server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind (default `"localhost"`).
    pub host: String,
    /// Port to bind (default `8765`, `0` for auto-assign).
    pub port: u16,
    /// Outbound queue capacity per connection.
    pub send_queue_capacity: usize,
    /// Heartbeat interval in seconds. `0` disables the heartbeat.
    pub heartbeat_interval_secs: u64,
    /// Seconds without inbound traffic before a pinged peer is dropped.
    pub heartbeat_timeout_secs: u64,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
}

impl ServerConfig {
    /// Heartbeat `(interval, timeout)`, or `None` when disabled.
    pub fn heartbeat(&self) -> Option<(Duration, Duration)> {
        (self.heartbeat_interval_secs > 0).then(|| {
            (
                Duration::from_secs(self.heartbeat_interval_secs),
                Duration::from_secs(self.heartbeat_timeout_secs.max(1)),
            )
        })
    }

    /// `host:port` as passed to the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            send_queue_capacity: DEFAULT_SEND_QUEUE_CAPACITY,
            heartbeat_interval_secs: DEFAULT_HEARTBEAT_INTERVAL_SECS,
            heartbeat_timeout_secs: DEFAULT_HEARTBEAT_TIMEOUT_SECS,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(s: &ServerSettings) -> Self {
        Self {
            host: s.host.clone(),
            port: s.port,
            send_queue_capacity: s.send_queue_capacity,
            heartbeat_interval_secs: s.heartbeat_interval_secs,
            heartbeat_timeout_secs: s.heartbeat_timeout_secs,
            max_message_size: s.max_message_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.host, "localhost");
        assert_eq!(cfg.port, 8765);
        assert_eq!(cfg.send_queue_capacity, 1024);
        assert_eq!(cfg.max_message_size, 1024 * 1024);
        assert_eq!(cfg.bind_addr(), "localhost:8765");
    }

    #[test]
    fn default_heartbeat_is_twenty_seconds() {
        let cfg = ServerConfig::default();
        assert_eq!(
            cfg.heartbeat(),
            Some((Duration::from_secs(20), Duration::from_secs(20)))
        );
    }

    #[test]
    fn zero_interval_disables_heartbeat() {
        let cfg = ServerConfig {
            heartbeat_interval_secs: 0,
            ..ServerConfig::default()
        };
        assert_eq!(cfg.heartbeat(), None);
    }

    #[test]
    fn from_settings() {
        let settings = ServerSettings {
            host: "0.0.0.0".into(),
            port: 9000,
            send_queue_capacity: 8,
            ..ServerSettings::default()
        };
        let cfg = ServerConfig::from(&settings);
        assert_eq!(cfg.bind_addr(), "0.0.0.0:9000");
        assert_eq!(cfg.send_queue_capacity, 8);
        assert_eq!(cfg.heartbeat_interval_secs, settings.heartbeat_interval_secs);
    }
}
