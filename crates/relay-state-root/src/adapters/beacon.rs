//! Beacon node block resolver
//!
//! Implements `BlockFetcher` over the standard beacon REST API:
//! `GET /eth/v2/beacon/blocks/{slot}` returns the signed block, whose
//! execution payload carries the execution block number as a decimal string.

use crate::error::{StateRootError, StateRootResult};
use crate::ports::outbound::BlockFetcher;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use shared_types::{BlockNumber, U256};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct SignedBlockResponse {
    data: SignedBlock,
}

#[derive(Debug, Deserialize)]
struct SignedBlock {
    message: BeaconBlock,
}

#[derive(Debug, Deserialize)]
struct BeaconBlock {
    body: BeaconBlockBody,
}

#[derive(Debug, Deserialize)]
struct BeaconBlockBody {
    /// Absent before the merge.
    execution_payload: Option<ExecutionPayload>,
}

#[derive(Debug, Deserialize)]
struct ExecutionPayload {
    block_number: String,
}

/// Resolves slots against a beacon node.
pub struct BeaconBlockFetcher {
    client: Client,
    base_url: String,
}

impl BeaconBlockFetcher {
    /// Create a fetcher for the beacon node at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> StateRootResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| StateRootError::Rpc(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn block_url(&self, slot: U256) -> String {
        format!("{}/eth/v2/beacon/blocks/{}", self.base_url, slot)
    }
}

#[async_trait]
impl BlockFetcher for BeaconBlockFetcher {
    async fn execution_block_number(&self, slot: U256) -> StateRootResult<BlockNumber> {
        let url = self.block_url(slot);
        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| StateRootError::Rpc(format!("GET {url}: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StateRootError::Resolution {
                slot,
                reason: "no block at slot".to_string(),
            });
        }
        if !status.is_success() {
            return Err(StateRootError::Rpc(format!("GET {url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| StateRootError::Rpc(format!("GET {url}: {e}")))?;
        let block = parse_execution_block_number(slot, &body)?;
        debug!(%slot, block, "Resolved slot to execution block");
        Ok(block)
    }
}

/// Extract the execution block number from a signed block response body.
pub fn parse_execution_block_number(slot: U256, body: &str) -> StateRootResult<BlockNumber> {
    let response: SignedBlockResponse = serde_json::from_str(body)
        .map_err(|e| StateRootError::Decode(format!("beacon block at slot {slot}: {e}")))?;

    let payload = response
        .data
        .message
        .body
        .execution_payload
        .ok_or_else(|| StateRootError::Resolution {
            slot,
            reason: "block has no execution payload".to_string(),
        })?;

    payload.block_number.parse().map_err(|e| {
        StateRootError::Decode(format!(
            "execution block number {:?}: {e}",
            payload.block_number
        ))
    })
}
