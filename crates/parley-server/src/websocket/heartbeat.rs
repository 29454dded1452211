//! Heartbeat ping/pong liveness monitoring.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};

use super::connection::PeerConnection;

/// Outcome of the heartbeat loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatResult {
    /// The peer sent nothing within the timeout window.
    TimedOut,
    /// The connection closed for another reason.
    Cancelled,
}

/// Run heartbeat pings for a connection until it closes or goes quiet.
///
/// A ping is enqueued every `interval`. From the second tick on, a tick with
/// no inbound frame during the preceding interval counts as a miss; any
/// frame resets the count. Once `max_missed` consecutive misses are reached
/// the peer is considered dead and `HeartbeatResult::TimedOut` is returned.
///
/// `max_missed` is computed as `timeout / interval` (clamped to at least 1).
/// The caller decides what to do with a timed-out peer.
pub async fn run_heartbeat(
    connection: Arc<PeerConnection>,
    interval: Duration,
    timeout: Duration,
) -> HeartbeatResult {
    let start = time::Instant::now() + interval;
    let mut ticks = time::interval_at(start, interval);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let interval_ms = interval.as_millis().max(1);
    let max_missed = (timeout.as_millis() / interval_ms).max(1);
    let mut missed: u128 = 0;
    let mut pinged = false;

    loop {
        tokio::select! {
            () = connection.closed() => return HeartbeatResult::Cancelled,
            _ = ticks.tick() => {
                if pinged && connection.liveness().elapsed() > interval {
                    missed += 1;
                    if missed >= max_missed {
                        return HeartbeatResult::TimedOut;
                    }
                } else {
                    missed = 0;
                }
                // A full queue already proves the writer is behind; skip.
                pinged |= connection.ping();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::connection::Outgoing;
    use parley_core::PeerLabel;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    fn make_connection() -> (Arc<PeerConnection>, mpsc::Receiver<Outgoing>) {
        let (tx, rx) = mpsc::channel(32);
        let label = PeerLabel::new("127.0.0.1:5000".parse().unwrap());
        let conn = PeerConnection::new(label, tx, CancellationToken::new());
        (Arc::new(conn), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_cancelled_on_close() {
        let (conn, _rx) = make_connection();
        let hb = tokio::spawn(run_heartbeat(
            conn.clone(),
            Duration::from_secs(100),
            Duration::from_secs(300),
        ));

        conn.close();
        assert_eq!(hb.await.unwrap(), HeartbeatResult::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_peer_times_out() {
        let (conn, mut rx) = make_connection();
        let started = time::Instant::now();

        let result = run_heartbeat(conn, Duration::from_secs(20), Duration::from_secs(20)).await;

        assert_eq!(result, HeartbeatResult::TimedOut);
        assert_eq!(rx.try_recv().unwrap(), Outgoing::Ping);
        // One ping at 20s, judged at 40s.
        assert_eq!(started.elapsed(), Duration::from_secs(40));
    }

    #[tokio::test(start_paused = true)]
    async fn longer_timeout_tolerates_more_misses() {
        let (conn, _rx) = make_connection();
        let started = time::Instant::now();

        let result = run_heartbeat(conn, Duration::from_secs(10), Duration::from_secs(30)).await;

        assert_eq!(result, HeartbeatResult::TimedOut);
        assert_eq!(started.elapsed(), Duration::from_secs(40));
    }

    #[tokio::test(start_paused = true)]
    async fn responsive_peer_stays_alive() {
        let (conn, mut rx) = make_connection();
        let hb = tokio::spawn(run_heartbeat(
            conn.clone(),
            Duration::from_secs(10),
            Duration::from_secs(10),
        ));

        // Answer every ping, as a WebSocket peer does with a Pong.
        for _ in 0..10 {
            assert_eq!(rx.recv().await, Some(Outgoing::Ping));
            conn.liveness().touch();
        }
        assert!(!hb.is_finished());

        conn.close();
        assert_eq!(hb.await.unwrap(), HeartbeatResult::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn chatty_peer_needs_no_pong() {
        let (conn, _rx) = make_connection();
        let hb = tokio::spawn(run_heartbeat(
            conn.clone(),
            Duration::from_secs(10),
            Duration::from_secs(10),
        ));

        for _ in 0..20 {
            time::sleep(Duration::from_secs(4)).await;
            conn.liveness().touch();
        }
        assert!(!hb.is_finished());

        conn.close();
        assert_eq!(hb.await.unwrap(), HeartbeatResult::Cancelled);
    }
}
