//! Execution-layer client
//!
//! Thin wrapper over an `ethers` HTTP provider for the two calls the relay
//! needs: the chain head and contract logs by topic.

use crate::domain::BlockRange;
use crate::error::{StateRootError, StateRootResult};
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Filter, Log, H160, H256};
use shared_types::{Address, BlockNumber, Hash};
use std::future::Future;
use std::time::Duration;
use tracing::{error, trace};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A contract log as returned by the provider.
pub type EthLog = Log;

/// Execution node client over HTTP JSON-RPC.
pub struct EthClient {
    provider: Provider<Http>,
    endpoint: String,
    timeout: Duration,
}

impl EthClient {
    /// Create a client for `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> StateRootResult<Self> {
        Self::with_timeout(endpoint, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> StateRootResult<Self> {
        let endpoint = endpoint.into();
        let provider = Provider::<Http>::try_from(endpoint.as_str())
            .map_err(|e| StateRootError::Rpc(format!("invalid endpoint {endpoint}: {e}")))?;
        Ok(Self {
            provider,
            endpoint,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Current head block number.
    pub async fn block_number(&self) -> StateRootResult<BlockNumber> {
        let head = self
            .bounded("eth_blockNumber", self.provider.get_block_number())
            .await?;
        Ok(head.as_u64())
    }

    /// Logs with `topic0 == topic` emitted by any of `addresses` in `range`.
    ///
    /// Fails when the provider returns a log from an address outside
    /// `addresses`.
    pub async fn get_logs(
        &self,
        range: BlockRange,
        addresses: &[Address],
        topic: Hash,
    ) -> StateRootResult<Vec<EthLog>> {
        let filter = log_filter(range, addresses, topic);
        trace!(endpoint = %self.endpoint, %range, "eth_getLogs");
        let logs = self
            .bounded("eth_getLogs", self.provider.get_logs(&filter))
            .await
            .inspect_err(|e| error!(?filter, error = %e, "eth_getLogs failed"))?;
        check_emitters(&logs, addresses)?;
        Ok(logs)
    }

    async fn bounded<T, E: std::fmt::Display>(
        &self,
        method: &str,
        call: impl Future<Output = Result<T, E>>,
    ) -> StateRootResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(|e| StateRootError::Rpc(format!("{method}: {e}"))),
            Err(_) => Err(StateRootError::Rpc(format!(
                "{method}: timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

/// `eth_getLogs` filter over `range`, `addresses` and `topic0`.
pub fn log_filter(range: BlockRange, addresses: &[Address], topic: Hash) -> Filter {
    Filter::new()
        .from_block(range.start)
        .to_block(range.end)
        .address(addresses.iter().copied().map(H160::from).collect::<Vec<_>>())
        .topic0(H256::from(topic))
}

fn check_emitters(logs: &[EthLog], addresses: &[Address]) -> StateRootResult<()> {
    match logs
        .iter()
        .find(|log| !addresses.contains(&log.address.to_fixed_bytes()))
    {
        Some(log) => Err(StateRootError::Rpc(format!(
            "provider returned log from unexpected contract {:?}",
            log.address
        ))),
        None => Ok(()),
    }
}

/// Block the log was emitted in.
pub fn log_block(log: &EthLog) -> StateRootResult<BlockNumber> {
    log.block_number
        .map(|n| n.as_u64())
        .ok_or_else(|| StateRootError::Decode("pending log without block number".into()))
}

/// Whether the log is still canonical and carries `topic` as `topic0`.
pub fn is_live_event(log: &EthLog, topic: &Hash) -> bool {
    !log.removed.unwrap_or(false) && log.topics.first() == Some(&H256::from(*topic))
}
