//! Last-activity tracking for a peer.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Shared record of when a peer was last heard from.
///
/// Cloning yields a handle to the same record. Uses the tokio clock so
/// heartbeat tests can run with paused time.
#[derive(Clone, Debug)]
pub struct Liveness {
    last_seen: Arc<Mutex<Instant>>,
}

impl Liveness {
    /// Start tracking, counting now as the last activity.
    pub fn new() -> Self {
        Self {
            last_seen: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Record activity.
    pub fn touch(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    /// Time since the last recorded activity.
    pub fn elapsed(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}
