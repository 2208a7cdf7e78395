//! Push gossip for replicated limiter state
//!
//! Each replica periodically pushes its own consumption snapshot to every
//! configured peer, fire-and-forget. Inbound snapshots arrive over the HTTP
//! sync endpoint and merge into the ledger; the idempotent merge means no
//! receive-side deduplication is needed.
pub mod scheduler;
pub mod transport;

pub use scheduler::GossipScheduler;
pub use transport::{HttpTransport, Transport};
