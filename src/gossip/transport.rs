//! Peer push transport
use async_trait::async_trait;
use url::Url;

use crate::api::paths;
use crate::error::{Result, TernError};
use crate::ledger::LedgerEntry;

/// Seam between the scheduler and the network.
///
/// One call per peer per round; the scheduler treats each call as
/// fire-and-forget and never retries within a round.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, peer: &Url, entry: &LedgerEntry) -> Result<()>;
}

/// HTTP transport: POSTs the entry as JSON to the peer's sync endpoint.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(push_timeout: std::time::Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(push_timeout)
            .build()
            .map_err(|e| TernError::Transport(format!("failed to build http client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, peer: &Url, entry: &LedgerEntry) -> Result<()> {
        let url = peer
            .join(paths::SYNC)
            .map_err(|e| TernError::Transport(format!("bad peer url {}: {}", peer, e)))?;
        let response = self
            .client
            .post(url)
            .json(entry)
            .send()
            .await
            .map_err(|e| TernError::Transport(format!("push to {} failed: {}", peer, e)))?;

        if !response.status().is_success() {
            return Err(TernError::Transport(format!(
                "push to {} rejected with status {}",
                peer,
                response.status()
            )));
        }
        Ok(())
    }
}
