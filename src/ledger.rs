//! Grow-only consumption ledger and its merge rule
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::replica::ReplicaId;

/// One replica's last-known consumption snapshot.
///
/// This struct is also the gossip wire payload: exactly these four fields,
/// JSON-encoded. Unknown fields in an inbound payload are ignored; a missing
/// field fails deserialization at the HTTP boundary.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct LedgerEntry {
    pub replica_id: ReplicaId,
    pub cumulative_consumed: u64,
    pub tokens_available: u64,
    pub observed_ts: i64,
}

impl LedgerEntry {
    /// Field-wise max merge of two snapshots for the same replica.
    ///
    /// Every field joins over a totally ordered domain, which makes the
    /// merge commutative, associative, and idempotent: a ledger converges
    /// to the same value no matter the delivery order or duplication.
    pub fn merge(&self, other: &LedgerEntry) -> LedgerEntry {
        LedgerEntry {
            replica_id: self.replica_id.clone(),
            cumulative_consumed: self.cumulative_consumed.max(other.cumulative_consumed),
            tokens_available: self.tokens_available.max(other.tokens_available),
            observed_ts: self.observed_ts.max(other.observed_ts),
        }
    }
}

/// Decides whether a ledger entry may be dropped during a sweep.
///
/// The default policy retires nothing: a departed replica's consumption
/// keeps counting against the shared budget for the cluster's lifetime.
/// Swapping the policy changes staleness handling without touching the
/// merge rule.
pub trait RetirementPolicy: Send + Sync {
    fn should_retire(&self, entry: &LedgerEntry, now_ms: i64) -> bool;
}

/// No-op retirement: entries live forever.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeepForever;

impl RetirementPolicy for KeepForever {
    fn should_retire(&self, _entry: &LedgerEntry, _now_ms: i64) -> bool {
        false
    }
}

/// Mapping from replica id to that replica's last-known snapshot.
///
/// Entries are only ever replaced by a merge result, so each replica's
/// `cumulative_consumed` is non-decreasing for the life of the ledger.
pub struct Ledger {
    entries: BTreeMap<ReplicaId, LedgerEntry>,
    retirement: Box<dyn RetirementPolicy>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::with_retirement(Box::new(KeepForever))
    }

    pub fn with_retirement(retirement: Box<dyn RetirementPolicy>) -> Self {
        Self {
            entries: BTreeMap::new(),
            retirement,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, replica_id: &ReplicaId) -> Option<&LedgerEntry> {
        self.entries.get(replica_id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.values()
    }

    /// Merge an incoming snapshot into the ledger.
    ///
    /// Returns the stored value: the first-seen entry, or the field-wise
    /// max against the prior one. Duplicate and out-of-order deliveries are
    /// absorbed here; the stored entry never regresses.
    pub fn apply(&mut self, incoming: LedgerEntry) -> &LedgerEntry {
        use std::collections::btree_map::Entry;

        match self.entries.entry(incoming.replica_id.clone()) {
            Entry::Occupied(slot) => {
                let stored = slot.into_mut();
                let merged = stored.merge(&incoming);
                *stored = merged;
                stored
            }
            Entry::Vacant(slot) => slot.insert(incoming),
        }
    }

    /// Total tokens consumed across every replica ever observed.
    pub fn consumed_total(&self) -> u64 {
        self.entries
            .values()
            .map(|entry| entry.cumulative_consumed)
            .fold(0u64, u64::saturating_add)
    }

    /// Budget left cluster-wide: capacity minus everything consumed,
    /// clamped at zero.
    pub fn global_budget(&self, capacity: u64) -> u64 {
        capacity.saturating_sub(self.consumed_total())
    }

    /// Sweep entries the injected policy considers retired.
    /// Returns how many were dropped (zero under the default policy).
    pub fn retire_stale(&mut self, now_ms: i64) -> usize {
        let before = self.entries.len();
        let retirement = &self.retirement;
        self.entries
            .retain(|_, entry| !retirement.should_retire(entry, now_ms));
        before - self.entries.len()
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("entries", &self.entries)
            .finish()
    }
}
