//! Per-connection session lifecycle, from upgrade through disconnect.
//!
//! ```text
//! Connecting --start()--> Active --run() ends--> Closing --finish()--> Closed
//! ```
//!
//! `finish()` is guarded by the state, so the connection is unregistered and
//! closed exactly once no matter how many close signals arrive.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{Sink, Stream, StreamExt};
use metrics::{counter, gauge, histogram};
use parley_core::{CloseKind, FrameReceiver, IntoFrame, PeerLabel, format_outbound};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use super::connection::{PeerConnection, spawn_writer};
use super::heartbeat::{HeartbeatResult, run_heartbeat};
use super::registry::ConnectionRegistry;
use crate::shutdown::ShutdownCoordinator;
use crate::metrics::{
    CONNECTION_DURATION_SECONDS, HEARTBEAT_TIMEOUTS_TOTAL, MESSAGES_RECEIVED_TOTAL,
    WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL,
};

/// How long the writer gets to flush its Close frame after the session ends.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Lifecycle state of a [`Session`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Accepted, not yet registered.
    Connecting,
    /// Registered and receiving.
    Active,
    /// Receive loop ended, teardown pending.
    Closing,
    /// Unregistered and closed. Terminal.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connecting => "connecting",
            Self::Active => "active",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Drives one peer: registers it, rebroadcasts its messages to everyone else,
/// and tears it down.
#[derive(Debug)]
pub struct Session {
    connection: Arc<PeerConnection>,
    registry: Arc<ConnectionRegistry>,
    state: SessionState,
}

impl Session {
    /// Create a session for an accepted connection.
    pub fn new(connection: Arc<PeerConnection>, registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            connection,
            registry,
            state: SessionState::Connecting,
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The connection this session owns.
    pub fn connection(&self) -> &Arc<PeerConnection> {
        &self.connection
    }

    /// Register the connection and become `Active`.
    pub async fn start(&mut self) {
        if self.state != SessionState::Connecting {
            return;
        }
        self.registry.register(Arc::clone(&self.connection)).await;
        self.state = SessionState::Active;
        info!(peer = %self.connection.label, conn_id = %self.connection.id, "client connected");
        counter!(WS_CONNECTIONS_TOTAL).increment(1);
        gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);
    }

    /// Rebroadcast every inbound message until the peer goes away or the
    /// connection is closed from this side.
    ///
    /// Ends in `Closing`. Broadcast failures to other peers are handled by
    /// the registry and never end this loop.
    pub async fn run<S, M, E>(&mut self, receiver: &mut FrameReceiver<S>)
    where
        S: Stream<Item = Result<M, E>> + Unpin,
        M: IntoFrame,
        E: fmt::Display,
    {
        if self.state != SessionState::Active {
            return;
        }
        let exclude = [self.connection.id.clone()];
        loop {
            let received = tokio::select! {
                biased;
                () = self.connection.closed() => None,
                text = receiver.receive() => text,
            };
            let Some(text) = received else { break };

            debug!(peer = %self.connection.label, len = text.len(), "message received");
            counter!(MESSAGES_RECEIVED_TOTAL).increment(1);
            let outbound = format_outbound(&self.connection.label, &text);
            let _ = self.registry.broadcast(&outbound, &exclude).await;
        }
        self.state = SessionState::Closing;
    }

    /// Unregister and close the connection.
    ///
    /// Returns `true` the first time only. `close` is how the peer's stream
    /// ended, or `None` when the connection was closed from this side.
    pub async fn finish(&mut self, close: Option<&CloseKind>) -> bool {
        if self.state == SessionState::Closed {
            return false;
        }
        let was_registered = self.state != SessionState::Connecting;
        self.state = SessionState::Closing;

        let _ = self.registry.unregister(&self.connection.id).await;
        self.connection.close();
        self.state = SessionState::Closed;

        if was_registered {
            let reason = close.map_or_else(|| "closed by server".to_string(), ToString::to_string);
            let graceful = !matches!(close, Some(CloseKind::Abrupt(_)));
            info!(
                peer = %self.connection.label,
                conn_id = %self.connection.id,
                close = %reason,
                dropped = self.connection.drop_count(),
                "client disconnected"
            );
            let outcome = if graceful { "normal" } else { "error" };
            counter!(WS_DISCONNECTIONS_TOTAL, "close" => outcome).increment(1);
            gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
            histogram!(CONNECTION_DURATION_SECONDS).record(self.connection.age().as_secs_f64());
        }
        true
    }
}

/// Shared state every session needs.
#[derive(Clone, Debug)]
pub struct SessionContext {
    /// Membership set shared by all sessions.
    pub registry: Arc<ConnectionRegistry>,
    /// Server shutdown; each connection's close token is a child of it.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Outbound queue capacity per connection.
    pub send_queue_capacity: usize,
    /// Heartbeat `(interval, timeout)`, `None` to disable.
    pub heartbeat: Option<(Duration, Duration)>,
}

/// Run a WebSocket session for an upgraded socket.
#[instrument(skip_all, fields(peer = %label))]
pub async fn run_ws_session(ws: WebSocket, label: PeerLabel, ctx: SessionContext) {
    let (sink, stream) = ws.split();
    serve_peer(sink, stream, label, ctx).await;
}

/// Run a session over any split duplex message stream.
///
/// Spawns the writer and heartbeat tasks, then drives the [`Session`] state
/// machine to `Closed`. Returns once the writer has flushed or been aborted.
pub async fn serve_peer<W, S, E>(sink: W, stream: S, label: PeerLabel, ctx: SessionContext)
where
    W: Sink<Message> + Unpin + Send + 'static,
    W::Error: fmt::Display,
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
{
    let (tx, rx) = mpsc::channel(ctx.send_queue_capacity.max(1));
    let closed = ctx.shutdown.child_token();
    let connection = Arc::new(PeerConnection::new(label, tx, closed.clone()));
    let mut writer = spawn_writer(sink, rx, closed);

    let heartbeat = ctx.heartbeat.map(|(interval, timeout)| {
        let connection = Arc::clone(&connection);
        tokio::spawn(async move {
            let result = run_heartbeat(Arc::clone(&connection), interval, timeout).await;
            if result == HeartbeatResult::TimedOut {
                warn!(peer = %connection.label, "no response to ping, dropping peer");
                counter!(HEARTBEAT_TIMEOUTS_TOTAL).increment(1);
                connection.close();
            }
        })
    });

    let mut receiver = FrameReceiver::new(stream).with_liveness(connection.liveness().clone());
    let mut session = Session::new(connection, ctx.registry);
    session.start().await;
    session.run(&mut receiver).await;
    let _ = session.finish(receiver.close_kind()).await;

    if let Some(heartbeat) = heartbeat {
        heartbeat.abort();
    }
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
        debug!("writer did not finish in time, aborting");
        writer.abort();
    }
}
