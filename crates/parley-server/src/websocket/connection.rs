//! Per-peer connection handle.
//!
//! The socket's write half is owned by a dedicated writer task fed through a
//! bounded queue, so [`PeerConnection::send`] never suspends and one slow or
//! dead peer cannot stall the session that is broadcasting to it.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::extract::ws::Message;
use futures::{Sink, SinkExt};
use parley_core::{Liveness, PeerLabel};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::debug;
use uuid::Uuid;

/// Process-unique connection identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Generate a fresh id.
    pub fn new() -> Self {
        Self(format!("conn_{}", Uuid::now_v7()))
    }

    /// The id as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Item on a connection's outbound queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outgoing {
    /// A chat message.
    Text(Arc<str>),
    /// A keepalive ping.
    Ping,
}

/// A connected peer.
pub struct PeerConnection {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Peer address captured at accept time.
    pub label: PeerLabel,
    /// Send channel to the writer task.
    tx: mpsc::Sender<Outgoing>,
    /// Cancelled once the connection is closed, for any reason.
    closed: CancellationToken,
    /// Last inbound activity.
    liveness: Liveness,
    /// When this connection was established.
    connected_at: Instant,
    /// Count of messages that could not be enqueued.
    dropped_messages: AtomicU64,
}

impl PeerConnection {
    /// Create a connection handle.
    ///
    /// `closed` is normally a child of the server shutdown token.
    pub fn new(label: PeerLabel, tx: mpsc::Sender<Outgoing>, closed: CancellationToken) -> Self {
        Self {
            id: ConnectionId::new(),
            label,
            tx,
            closed,
            liveness: Liveness::new(),
            connected_at: Instant::now(),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Enqueue a text message for the peer.
    ///
    /// Returns `false` if the connection is closed or its queue is full or
    /// gone, and increments the dropped message counter.
    pub fn send(&self, message: Arc<str>) -> bool {
        if !self.closed.is_cancelled() && self.tx.try_send(Outgoing::Text(message)).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Enqueue a keepalive ping. A full queue skips the ping.
    pub fn ping(&self) -> bool {
        !self.closed.is_cancelled() && self.tx.try_send(Outgoing::Ping).is_ok()
    }

    /// Close the connection. Idempotent.
    pub fn close(&self) {
        self.closed.cancel();
    }

    /// Whether the connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once the connection is closed.
    pub fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.closed.cancelled()
    }

    /// Inbound activity record shared with the frame receiver.
    pub fn liveness(&self) -> &Liveness {
        &self.liveness
    }

    /// Total messages dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl fmt::Debug for PeerConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerConnection")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Spawn the task that drains `rx` into the socket's write half.
///
/// Runs until the queue is dropped, a write fails, or `closed` is cancelled;
/// in the last case a Close frame is sent first. A failed write cancels
/// `closed` so the owning session ends too.
pub fn spawn_writer<W>(
    mut sink: W,
    mut rx: mpsc::Receiver<Outgoing>,
    closed: CancellationToken,
) -> JoinHandle<()>
where
    W: Sink<Message> + Unpin + Send + 'static,
    W::Error: fmt::Display,
{
    tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                biased;
                () = closed.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
                item = rx.recv() => match item {
                    Some(Outgoing::Text(text)) => Message::Text(text.to_string().into()),
                    Some(Outgoing::Ping) => Message::Ping(Vec::<u8>::new().into()),
                    None => break,
                },
            };
            if let Err(e) = sink.send(frame).await {
                debug!(error = %e, "write to peer failed");
                closed.cancel();
                break;
            }
        }
    })
}
