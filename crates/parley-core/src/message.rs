//! Peer labels and outbound message formatting.

use std::fmt;
use std::net::SocketAddr;

/// Stable label of a connected peer, captured at accept time.
///
/// Renders as `ip:port`. IPv6 addresses are rendered without brackets
/// (`::1:50000`), keeping the label format identical for both families.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PeerLabel(SocketAddr);

impl PeerLabel {
    /// Wrap a peer socket address.
    pub fn new(addr: SocketAddr) -> Self {
        Self(addr)
    }

    /// The underlying socket address.
    pub fn addr(&self) -> SocketAddr {
        self.0
    }
}

impl From<SocketAddr> for PeerLabel {
    fn from(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

impl fmt::Display for PeerLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.0.ip(), self.0.port())
    }
}

/// Build the message rebroadcast to other peers: `"[<label>]: <text>"`.
///
/// The text is forwarded verbatim, control characters included.
pub fn format_outbound(label: &PeerLabel, text: &str) -> String {
    format!("[{label}]: {text}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(s: &str) -> PeerLabel {
        PeerLabel::new(s.parse().unwrap())
    }

    #[test]
    fn ipv4_label() {
        assert_eq!(label("127.0.0.1:50123").to_string(), "127.0.0.1:50123");
    }

    #[test]
    fn ipv6_label_has_no_brackets() {
        assert_eq!(label("[::1]:8765").to_string(), "::1:8765");
    }

    #[test]
    fn outbound_format() {
        let msg = format_outbound(&label("10.0.0.7:4000"), "hello");
        assert_eq!(msg, "[10.0.0.7:4000]: hello");
    }

    #[test]
    fn outbound_keeps_text_verbatim() {
        let msg = format_outbound(&label("10.0.0.7:4000"), "a\tb\r\n[x]: y");
        assert_eq!(msg, "[10.0.0.7:4000]: a\tb\r\n[x]: y");
    }

    #[test]
    fn outbound_empty_text() {
        let msg = format_outbound(&label("127.0.0.1:1"), "");
        assert_eq!(msg, "[127.0.0.1:1]: ");
    }

    #[test]
    fn label_round_trips_addr() {
        let addr: SocketAddr = "192.168.1.2:9999".parse().unwrap();
        assert_eq!(PeerLabel::from(addr).addr(), addr);
    }
}
