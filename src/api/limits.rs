use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::TernError;
use crate::ledger::LedgerEntry;
use crate::node::{ConsumeOutcome, GlobalCheck, RateLimiterNode, Snapshot, SyncAck};

#[derive(Clone, Debug, Deserialize)]
pub struct ConsumeRequest {
    pub count: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct ConsumeResponse {
    pub granted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_remaining: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

#[instrument(skip(node), level = "debug")]
pub async fn consume(
    State(node): State<Arc<RateLimiterNode>>,
    Json(request): Json<ConsumeRequest>,
) -> Result<(StatusCode, Json<ConsumeResponse>), TernError> {
    match node.consume(request.count)? {
        ConsumeOutcome::Granted { tokens_remaining } => Ok((
            StatusCode::OK,
            Json(ConsumeResponse {
                granted: true,
                tokens_remaining: Some(tokens_remaining),
                reason: None,
            }),
        )),
        ConsumeOutcome::Denied { reason } => Ok((
            StatusCode::TOO_MANY_REQUESTS,
            Json(ConsumeResponse {
                granted: false,
                tokens_remaining: None,
                reason: Some(reason.as_str()),
            }),
        )),
    }
}

// Gossip receive path. Payload shape is enforced by the Json extractor:
// a missing field is rejected before the handler runs, extra fields are
// ignored.
#[instrument(skip(node, entry), level = "debug")]
pub async fn sync(
    State(node): State<Arc<RateLimiterNode>>,
    Json(entry): Json<LedgerEntry>,
) -> Result<Json<SyncAck>, TernError> {
    node.receive_sync(entry).map(Json)
}

#[instrument(skip(node), level = "debug")]
pub async fn check(
    State(node): State<Arc<RateLimiterNode>>,
    Path(count): Path<u64>,
) -> Result<Json<GlobalCheck>, TernError> {
    node.check_global(count).map(Json)
}

#[instrument(skip(node), level = "debug")]
pub async fn snapshot(
    State(node): State<Arc<RateLimiterNode>>,
) -> Result<Json<Snapshot>, TernError> {
    node.snapshot().map(Json)
}
