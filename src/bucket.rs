//! Local token bucket with wall-clock refill
use serde::Serialize;

use crate::settings::BucketSettings;

/// Per-replica token bucket.
///
/// Token accounting is integer-valued: a refill credits only the whole
/// tokens earned since the last stamp, and the stamp always advances, so a
/// sub-token interval forfeits its fraction. That loss is an accepted
/// precision trade-off, not an error condition.
#[derive(Clone, Debug)]
pub struct LocalBucket {
    settings: BucketSettings,
    tokens: u64,
    last_refill_ms: i64,
    cumulative_consumed: u64,
}

/// Read-only view of bucket state for diagnostics.
#[derive(Clone, Debug, Serialize)]
pub struct LocalStateView {
    pub tokens_available: u64,
    pub last_refill_ms: i64,
    pub cumulative_consumed: u64,
    pub capacity: u64,
    pub refill_rate: u32,
}

impl LocalBucket {
    /// A bucket starts full.
    pub fn new(settings: BucketSettings, now_ms: i64) -> Self {
        Self {
            settings,
            tokens: settings.capacity,
            last_refill_ms: now_ms,
            cumulative_consumed: 0,
        }
    }

    /// Credit whole tokens earned since the last refill, clamped to
    /// capacity, then advance the stamp to `now_ms`.
    pub fn refill(&mut self, now_ms: i64) {
        let earned = self
            .settings
            .tokens_for_elapsed_ms(now_ms - self.last_refill_ms);
        self.tokens = self
            .tokens
            .saturating_add(earned)
            .min(self.settings.capacity);
        if now_ms > self.last_refill_ms {
            self.last_refill_ms = now_ms;
        }
    }

    /// Attempt to consume `count` tokens at `now_ms`. Refills first; on
    /// denial the refill stands but nothing else changes.
    pub fn try_consume(&mut self, count: u64, now_ms: i64) -> bool {
        self.refill(now_ms);
        if self.tokens >= count {
            self.tokens -= count;
            self.cumulative_consumed = self.cumulative_consumed.saturating_add(count);
            true
        } else {
            false
        }
    }

    pub fn tokens_available(&self) -> u64 {
        self.tokens
    }

    pub fn cumulative_consumed(&self) -> u64 {
        self.cumulative_consumed
    }

    pub fn last_refill_ms(&self) -> i64 {
        self.last_refill_ms
    }

    pub fn capacity(&self) -> u64 {
        self.settings.capacity
    }

    pub fn view(&self) -> LocalStateView {
        LocalStateView {
            tokens_available: self.tokens,
            last_refill_ms: self.last_refill_ms,
            cumulative_consumed: self.cumulative_consumed,
            capacity: self.settings.capacity,
            refill_rate: self.settings.refill_rate,
        }
    }
}
