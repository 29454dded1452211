//! Membership set of live connections and broadcast fan-out.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::connection::{ConnectionId, PeerConnection};
use crate::metrics::{BROADCAST_DELIVERIES_TOTAL, PEERS_PRUNED_TOTAL};

/// Outcome of one broadcast.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Members the message was enqueued for.
    pub delivered: usize,
    /// Members whose send failed and were removed.
    pub pruned: usize,
}

/// Concurrency-safe set of live connections.
///
/// Membership is mutated by every session (register on start, unregister on
/// end) and read by every session during broadcast. Broadcast works on a
/// snapshot, so joins and leaves racing with it are either fully included or
/// fully excluded for that message.
#[derive(Debug)]
pub struct ConnectionRegistry {
    /// Connected peers indexed by connection ID.
    connections: RwLock<HashMap<ConnectionId, Arc<PeerConnection>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Add a connection.
    pub async fn register(&self, connection: Arc<PeerConnection>) {
        let mut conns = self.connections.write().await;
        let _ = conns.insert(connection.id.clone(), connection);
    }

    /// Remove a connection by ID. Absent IDs are a no-op.
    ///
    /// Returns whether the connection was present.
    pub async fn unregister(&self, id: &ConnectionId) -> bool {
        let mut conns = self.connections.write().await;
        conns.remove(id).is_some()
    }

    /// Send `message` to every member not in `exclude`.
    ///
    /// Members already closed by their own session are skipped; that session
    /// unregisters them. Members whose send fails are removed and closed.
    /// Failures never propagate to the caller.
    pub async fn broadcast(&self, message: &str, exclude: &[ConnectionId]) -> BroadcastReport {
        let snapshot: Vec<Arc<PeerConnection>> = {
            let conns = self.connections.read().await;
            conns
                .values()
                .filter(|c| !exclude.contains(&c.id) && !c.is_closed())
                .cloned()
                .collect()
        };

        let message: Arc<str> = Arc::from(message);
        let mut failed = Vec::new();
        for conn in &snapshot {
            if !conn.send(Arc::clone(&message)) {
                failed.push(Arc::clone(conn));
            }
        }

        if !failed.is_empty() {
            let mut conns = self.connections.write().await;
            for conn in &failed {
                let _ = conns.remove(&conn.id);
            }
        }
        for conn in &failed {
            warn!(conn_id = %conn.id, peer = %conn.label, "send failed, pruning peer");
            conn.close();
        }

        let report = BroadcastReport {
            delivered: snapshot.len() - failed.len(),
            pruned: failed.len(),
        };
        debug!(
            recipients = snapshot.len(),
            delivered = report.delivered,
            pruned = report.pruned,
            "broadcast"
        );
        counter!(BROADCAST_DELIVERIES_TOTAL).increment(report.delivered as u64);
        counter!(PEERS_PRUNED_TOTAL).increment(report.pruned as u64);
        report
    }

    /// Number of registered connections.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Whether no connections are registered.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }

    /// Whether a connection is registered.
    pub async fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.read().await.contains_key(id)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
