//! Rate limiter node: local bucket plus replicated ledger behind one lock
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use crate::bucket::{LocalBucket, LocalStateView};
use crate::error::{Result, TernError};
use crate::ledger::{Ledger, LedgerEntry};
use crate::replica::ReplicaId;
use crate::settings::BucketSettings;

/// Outcome of a consume call. Denial is an expected result, never an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Granted { tokens_remaining: u64 },
    Denied { reason: DenyReason },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DenyReason {
    InsufficientTokens,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::InsufficientTokens => "insufficient_tokens",
        }
    }
}

/// Acknowledgement returned to a peer after its snapshot was merged.
#[derive(Clone, Debug, Serialize)]
pub struct SyncAck {
    pub merged: bool,
    pub global_budget: u64,
}

/// Hypothetical cluster-wide admission check against the derived budget.
#[derive(Clone, Debug, Serialize)]
pub struct GlobalCheck {
    pub count: u64,
    pub allowed: bool,
    pub global_budget: u64,
}

/// Read-only diagnostic view of one replica.
#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub replica_id: ReplicaId,
    pub local: LocalStateView,
    pub global_budget: u64,
    pub ledger_size: usize,
}

/// State guarded by the node's single lock. Consume calls and the gossip
/// tick/receive path all mutate through it, so no reader ever observes a
/// torn bucket/ledger combination.
#[derive(Debug)]
struct NodeState {
    bucket: LocalBucket,
    ledger: Ledger,
}

/// One replica of the shared limiter.
///
/// The node is Active for its whole lifetime; there is no peer-health state.
/// Construct it once per process and hand out `Arc` clones to the API
/// handlers and the gossip scheduler.
pub struct RateLimiterNode {
    replica_id: ReplicaId,
    settings: BucketSettings,
    state: Mutex<NodeState>,
}

impl RateLimiterNode {
    pub fn new(settings: BucketSettings) -> Self {
        Self::with_replica_id(ReplicaId::generate(), settings)
    }

    pub fn with_replica_id(replica_id: ReplicaId, settings: BucketSettings) -> Self {
        Self::with_ledger(replica_id, settings, Ledger::new())
    }

    /// Construct with a custom ledger, e.g. one carrying a non-default
    /// retirement policy.
    pub fn with_ledger(replica_id: ReplicaId, settings: BucketSettings, mut ledger: Ledger) -> Self {
        let now_ms = Utc::now().timestamp_millis();
        let bucket = LocalBucket::new(settings, now_ms);
        // The ledger tracks its own replica from the very first instant
        ledger.apply(Self::entry_from_bucket(&replica_id, &bucket, now_ms));
        Self {
            replica_id,
            settings,
            state: Mutex::new(NodeState { bucket, ledger }),
        }
    }

    pub fn replica_id(&self) -> &ReplicaId {
        &self.replica_id
    }

    pub fn capacity(&self) -> u64 {
        self.settings.capacity
    }

    /// Admit or deny `count` tokens against the local bucket.
    pub fn consume(&self, count: u64) -> Result<ConsumeOutcome> {
        self.consume_at(count, Utc::now().timestamp_millis())
    }

    /// Consume at an explicit timestamp. The ledger's own row is refreshed
    /// under the same lock, so the next gossip round reflects this call.
    pub fn consume_at(&self, count: u64, now_ms: i64) -> Result<ConsumeOutcome> {
        if count == 0 {
            return Err(TernError::Validation(
                "consume count must be a positive integer".to_string(),
            ));
        }
        let mut state = self.lock_state()?;
        let granted = state.bucket.try_consume(count, now_ms);
        let own_entry = Self::entry_from_bucket(&self.replica_id, &state.bucket, now_ms);
        state.ledger.apply(own_entry);

        if granted {
            let tokens_remaining = state.bucket.tokens_available();
            debug!(
                "[{}] granted {} token(s), {} remaining locally",
                self.replica_id, count, tokens_remaining
            );
            Ok(ConsumeOutcome::Granted { tokens_remaining })
        } else {
            debug!(
                "[{}] denied {} token(s), {} available locally",
                self.replica_id,
                count,
                state.bucket.tokens_available()
            );
            Ok(ConsumeOutcome::Denied {
                reason: DenyReason::InsufficientTokens,
            })
        }
    }

    /// Merge a peer snapshot into the ledger and recompute the derived
    /// budget. Duplicate delivery is harmless: the merge is idempotent.
    pub fn receive_sync(&self, entry: LedgerEntry) -> Result<SyncAck> {
        let peer = entry.replica_id.clone();
        let mut state = self.lock_state()?;
        let cumulative = state.ledger.apply(entry).cumulative_consumed;
        let global_budget = state.ledger.global_budget(self.settings.capacity);
        debug!(
            "[{}] merged sync from {}: cumulative_consumed={} global_budget={}",
            self.replica_id, peer, cumulative, global_budget
        );
        Ok(SyncAck {
            merged: true,
            global_budget,
        })
    }

    /// Evaluate a hypothetical cluster-wide consumption against the budget
    /// derived from the ledger. Read-only: nothing is consumed.
    pub fn check_global(&self, count: u64) -> Result<GlobalCheck> {
        if count == 0 {
            return Err(TernError::Validation(
                "check count must be a positive integer".to_string(),
            ));
        }
        let state = self.lock_state()?;
        let global_budget = state.ledger.global_budget(self.settings.capacity);
        Ok(GlobalCheck {
            count,
            allowed: count <= global_budget,
            global_budget,
        })
    }

    /// Build the outgoing gossip entry from live bucket state, refilling
    /// first, and keep the ledger's own row current.
    pub fn local_sync_entry(&self) -> Result<LedgerEntry> {
        self.local_sync_entry_at(Utc::now().timestamp_millis())
    }

    pub fn local_sync_entry_at(&self, now_ms: i64) -> Result<LedgerEntry> {
        let mut state = self.lock_state()?;
        state.bucket.refill(now_ms);
        let entry = Self::entry_from_bucket(&self.replica_id, &state.bucket, now_ms);
        state.ledger.apply(entry.clone());
        Ok(entry)
    }

    /// Sweep ledger entries the retirement policy considers stale.
    pub fn retire_stale(&self) -> Result<usize> {
        let now_ms = Utc::now().timestamp_millis();
        let mut state = self.lock_state()?;
        Ok(state.ledger.retire_stale(now_ms))
    }

    /// Read-only diagnostic view.
    pub fn snapshot(&self) -> Result<Snapshot> {
        let state = self.lock_state()?;
        Ok(Snapshot {
            replica_id: self.replica_id.clone(),
            local: state.bucket.view(),
            global_budget: state.ledger.global_budget(self.settings.capacity),
            ledger_size: state.ledger.len(),
        })
    }

    fn entry_from_bucket(
        replica_id: &ReplicaId,
        bucket: &LocalBucket,
        now_ms: i64,
    ) -> LedgerEntry {
        LedgerEntry {
            replica_id: replica_id.clone(),
            cumulative_consumed: bucket.cumulative_consumed(),
            tokens_available: bucket.tokens_available(),
            observed_ts: now_ms,
        }
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, NodeState>> {
        self.state.lock().map_err(|e| {
            TernError::Concurrency(format!("failed to acquire node state lock: {}", e))
        })
    }
}

impl std::fmt::Debug for RateLimiterNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterNode")
            .field("replica_id", &self.replica_id)
            .field("capacity", &self.settings.capacity)
            .finish()
    }
}
