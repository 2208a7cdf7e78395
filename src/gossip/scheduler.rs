//! Gossip scheduler: fixed-interval push of local state to every peer
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time;
use tracing::{debug, info, warn};
use url::Url;

use super::transport::Transport;
use crate::node::RateLimiterNode;

/// Pushes this replica's consumption snapshot to every configured peer on a
/// fixed interval.
///
/// Each peer push is an isolated attempt: a timeout or error is logged and
/// counted, never retried within the round, and never delays the other
/// peers. There is no backpressure; the interval is fixed regardless of
/// peer health or load.
pub struct GossipScheduler {
    node: Arc<RateLimiterNode>,
    transport: Arc<dyn Transport>,
    peers: Vec<Url>,
    interval: Duration,
    push_timeout: Duration,
}

impl GossipScheduler {
    pub fn new(
        node: Arc<RateLimiterNode>,
        transport: Arc<dyn Transport>,
        peers: Vec<Url>,
        interval: Duration,
        push_timeout: Duration,
    ) -> Self {
        Self {
            node,
            transport,
            peers,
            interval,
            push_timeout,
        }
    }

    /// Drive gossip rounds until the shutdown flag flips.
    ///
    /// `main` owns the sender half of the watch channel and flips it on
    /// shutdown, which bounds this task to the node's lifetime.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        if self.peers.is_empty() {
            info!(
                "[{}] no peers configured, gossip disabled",
                self.node.replica_id()
            );
            return;
        }
        info!(
            "[{}] starting gossip loop: {} peer(s), {}ms interval",
            self.node.replica_id(),
            self.peers.len(),
            self.interval.as_millis()
        );

        let mut ticker = time::interval(self.interval);
        // the first interval tick completes immediately; a round should only
        // run after one full interval has passed
        ticker.tick().await;

        let mut round = 0u64;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    round += 1;
                    self.run_round(round).await;
                }
                changed = shutdown.changed() => {
                    // a dropped sender means the node is gone; stop either way
                    if changed.is_err() || *shutdown.borrow() {
                        info!("[{}] gossip loop stopping", self.node.replica_id());
                        break;
                    }
                }
            }
        }
    }

    /// One gossip round: refresh the local entry, then push it to every
    /// peer concurrently. A slow or dead peer only costs its own timeout.
    pub async fn run_round(&self, round: u64) {
        let entry = match self.node.local_sync_entry() {
            Ok(entry) => entry,
            Err(e) => {
                warn!(
                    "[{}] skipping gossip round {}: {}",
                    self.node.replica_id(),
                    round,
                    e
                );
                return;
            }
        };

        // Retirement sweep is a no-op under the default policy
        match self.node.retire_stale() {
            Ok(0) | Err(_) => {}
            Ok(retired) => {
                debug!(
                    "[{}] retired {} stale ledger entries",
                    self.node.replica_id(),
                    retired
                );
            }
        }

        let mut pushes = JoinSet::new();
        for peer in self.peers.iter().cloned() {
            let transport = Arc::clone(&self.transport);
            let entry = entry.clone();
            let push_timeout = self.push_timeout;
            pushes.spawn(async move {
                let outcome = time::timeout(push_timeout, transport.post(&peer, &entry)).await;
                (peer, outcome)
            });
        }

        let mut failures = 0usize;
        while let Some(joined) = pushes.join_next().await {
            match joined {
                Ok((peer, Ok(Ok(())))) => {
                    debug!(
                        "[{}] round {} pushed to {}",
                        self.node.replica_id(),
                        round,
                        peer
                    );
                }
                Ok((peer, Ok(Err(e)))) => {
                    failures += 1;
                    warn!("[{}] push to {} failed: {}", self.node.replica_id(), peer, e);
                }
                Ok((peer, Err(_elapsed))) => {
                    failures += 1;
                    warn!(
                        "[{}] push to {} timed out after {}ms",
                        self.node.replica_id(),
                        peer,
                        self.push_timeout.as_millis()
                    );
                }
                Err(join_err) => {
                    failures += 1;
                    warn!(
                        "[{}] push task panicked or was cancelled: {}",
                        self.node.replica_id(),
                        join_err
                    );
                }
            }
        }

        if failures > 0 {
            debug!(
                "[{}] gossip round {} finished with {}/{} failed pushes",
                self.node.replica_id(),
                round,
                failures,
                self.peers.len()
            );
        }
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }
}

impl std::fmt::Debug for GossipScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GossipScheduler")
            .field("replica_id", &self.node.replica_id())
            .field("peers", &self.peers)
            .field("interval", &self.interval)
            .finish()
    }
}
