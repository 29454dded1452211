//! Client error types.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors from connecting to the chat server or driving the console.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Nothing is listening at the URL.
    #[error("connection refused. Is the server running at {url}?")]
    ConnectionRefused {
        /// URL that was dialled.
        url: String,
    },
    /// Any other failure to establish the connection.
    #[error("failed to connect to {url}: {source}")]
    Connect {
        /// URL that was dialled.
        url: String,
        /// Underlying WebSocket error.
        #[source]
        source: tungstenite::Error,
    },
    /// Writing to the operator's console failed.
    #[error("console I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Classify a failed connection attempt.
    pub fn from_connect(url: &str, err: tungstenite::Error) -> Self {
        match &err {
            tungstenite::Error::Io(io) if io.kind() == std::io::ErrorKind::ConnectionRefused => {
                Self::ConnectionRefused {
                    url: url.to_string(),
                }
            }
            _ => Self::Connect {
                url: url.to_string(),
                source: err,
            },
        }
    }
}
