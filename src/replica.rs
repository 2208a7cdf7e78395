//! Replica identity
use serde::{Deserialize, Serialize};

/// Unique identifier for one running replica of the limiter.
///
/// Generated once at process start and never persisted: a restarted process
/// rejoins the cluster as a brand-new replica with a fresh ledger row.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, PartialOrd, Ord, Eq, Hash)]
pub struct ReplicaId(String);

impl ReplicaId {
    pub fn new(id: String) -> Self {
        Self(id)
    }

    /// Generate a fresh process-lifetime identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ReplicaId {
    fn from(id: &str) -> Self {
        ReplicaId::new(id.to_string())
    }
}

impl From<String> for ReplicaId {
    fn from(id: String) -> Self {
        ReplicaId::new(id)
    }
}

impl std::fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
