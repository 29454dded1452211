//! Frame classification and the suspending `receive()` used by both ends.
//!
//! A [`FrameReceiver`] wraps the read half of a WebSocket and yields only
//! message text. Control frames are absorbed (counted as liveness), and the
//! first Close frame, transport error or end-of-stream latches a terminal
//! closed signal: every later `receive()` returns `None` immediately.

use std::fmt;

use axum::extract::ws::Message as AxumMessage;
use futures::{Stream, StreamExt};
use tokio_tungstenite::tungstenite::Message as TungsteniteMessage;
use tracing::debug;

use crate::liveness::Liveness;

/// What an inbound frame means to a chat session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// A chat message.
    Text(String),
    /// Ping, Pong or other control traffic.
    Control,
    /// A binary frame that is not valid UTF-8 (payload length).
    Unreadable(usize),
    /// The peer sent a Close frame.
    Close,
}

/// Conversion from a transport message into a [`Frame`].
pub trait IntoFrame {
    /// Classify this message.
    fn into_frame(self) -> Frame;
}

fn binary_frame(data: &[u8]) -> Frame {
    match std::str::from_utf8(data) {
        Ok(s) => Frame::Text(s.to_owned()),
        Err(_) => Frame::Unreadable(data.len()),
    }
}

impl IntoFrame for AxumMessage {
    fn into_frame(self) -> Frame {
        match self {
            AxumMessage::Text(t) => Frame::Text(t.as_str().to_owned()),
            AxumMessage::Binary(data) => binary_frame(&data),
            AxumMessage::Ping(_) | AxumMessage::Pong(_) => Frame::Control,
            AxumMessage::Close(_) => Frame::Close,
        }
    }
}

impl IntoFrame for TungsteniteMessage {
    fn into_frame(self) -> Frame {
        match self {
            TungsteniteMessage::Text(t) => Frame::Text(t.as_str().to_owned()),
            TungsteniteMessage::Binary(data) => binary_frame(&data),
            TungsteniteMessage::Ping(_)
            | TungsteniteMessage::Pong(_)
            | TungsteniteMessage::Frame(_) => Frame::Control,
            TungsteniteMessage::Close(_) => Frame::Close,
        }
    }
}

/// How a stream ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CloseKind {
    /// The peer sent a Close frame.
    Graceful,
    /// Transport error, reset, or the stream ended without a Close frame.
    Abrupt(String),
}

impl fmt::Display for CloseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Graceful => f.write_str("normal"),
            Self::Abrupt(reason) => write!(f, "error: {reason}"),
        }
    }
}

/// Read half of a duplex message stream with a latched closed signal.
pub struct FrameReceiver<S> {
    stream: S,
    closed: Option<CloseKind>,
    liveness: Option<Liveness>,
}

impl<S> FrameReceiver<S> {
    /// Wrap the read half of a WebSocket.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            closed: None,
            liveness: None,
        }
    }

    /// Record every inbound frame, control frames included, on `liveness`.
    #[must_use]
    pub fn with_liveness(mut self, liveness: Liveness) -> Self {
        self.liveness = Some(liveness);
        self
    }

    /// Whether the terminal closed signal has been produced.
    pub fn is_closed(&self) -> bool {
        self.closed.is_some()
    }

    /// How the stream ended, once it has.
    pub fn close_kind(&self) -> Option<&CloseKind> {
        self.closed.as_ref()
    }
}

impl<S, M, E> FrameReceiver<S>
where
    S: Stream<Item = Result<M, E>> + Unpin,
    M: IntoFrame,
    E: fmt::Display,
{
    /// Suspend until a text message arrives or the stream ends.
    ///
    /// Returns `None` once the stream has ended, and on every call after.
    pub async fn receive(&mut self) -> Option<String> {
        if self.closed.is_some() {
            return None;
        }
        loop {
            let kind = match self.stream.next().await {
                Some(Ok(msg)) => {
                    if let Some(liveness) = &self.liveness {
                        liveness.touch();
                    }
                    match msg.into_frame() {
                        Frame::Text(text) => return Some(text),
                        Frame::Control => continue,
                        Frame::Unreadable(len) => {
                            debug!(len, "ignoring non-UTF-8 binary frame");
                            continue;
                        }
                        Frame::Close => CloseKind::Graceful,
                    }
                }
                Some(Err(e)) => CloseKind::Abrupt(e.to_string()),
                None => CloseKind::Abrupt("stream ended without a close frame".into()),
            };
            self.closed = Some(kind);
            return None;
        }
    }
}
