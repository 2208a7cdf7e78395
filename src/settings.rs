//! Tern application settings
use std::time::Duration;

use url::Url;

pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const STANDARD_PORT_HTTP: u16 = 8710;
pub const DEFAULT_PORT_HTTP: &str = "8710";

/// Token bucket parameters. Every replica of the same logical limiter must
/// run with identical values or the derived global budget is meaningless.
#[derive(Clone, Copy, Debug)]
pub struct BucketSettings {
    /// Maximum tokens held locally; also the shared cluster-wide budget.
    pub capacity: u64,
    /// Whole tokens credited per second of wall-clock time.
    pub refill_rate: u32,
}

impl Default for BucketSettings {
    fn default() -> Self {
        Self {
            capacity: 100,
            refill_rate: 1,
        }
    }
}

impl BucketSettings {
    /// Whole tokens earned over an elapsed wall-clock interval.
    /// The sub-token remainder is discarded, not carried forward.
    pub fn tokens_for_elapsed_ms(&self, elapsed_ms: i64) -> u64 {
        if elapsed_ms <= 0 {
            return 0;
        }
        (elapsed_ms as u64).saturating_mul(u64::from(self.refill_rate)) / 1000
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    // Server listen address
    pub listen_address: String,

    // HTTP API listen port
    pub listen_port: u16,

    // Shared bucket parameters
    pub bucket: BucketSettings,

    // Milliseconds between gossip rounds
    pub gossip_interval_ms: u64,

    // Per-peer push timeout in milliseconds
    pub push_timeout_ms: u64,

    // Static peer set: base URLs of every other replica. Empty means no
    // gossip; the node still serves local traffic.
    pub peers: Vec<Url>,
}

impl Settings {
    pub fn gossip_interval(&self) -> Duration {
        Duration::from_millis(self.gossip_interval_ms)
    }

    pub fn push_timeout(&self) -> Duration {
        Duration::from_millis(self.push_timeout_ms)
    }
}
