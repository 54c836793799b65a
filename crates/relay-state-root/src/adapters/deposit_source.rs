//! Deposit logs from an execution node

use super::eth_client::{is_live_event, log_block, EthClient, EthLog};
use crate::domain::BlockRange;
use crate::error::StateRootResult;
use crate::ports::outbound::DepositLogSource;
use async_trait::async_trait;
use shared_types::{Address, Deposit, DepositLog};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// `DepositLogSource` over `eth_getLogs` on the bridge contract.
pub struct EthDepositSource {
    client: Arc<EthClient>,
    bridge_address: Address,
}

impl EthDepositSource {
    pub fn new(client: Arc<EthClient>, bridge_address: Address) -> Self {
        Self {
            client,
            bridge_address,
        }
    }
}

#[async_trait]
impl DepositLogSource for EthDepositSource {
    async fn fetch_deposits(&self, range: BlockRange) -> StateRootResult<Vec<DepositLog>> {
        if range.is_inverted() {
            return Ok(Vec::new());
        }

        let logs = self
            .client
            .get_logs(range, &[self.bridge_address], Deposit::topic())
            .await?;
        trace!(%range, count = logs.len(), "Fetched deposit logs");

        let deposits = decode_deposit_logs(&logs);
        debug!(%range, deposits = deposits.len(), "Decoded deposits");
        Ok(deposits)
    }
}

/// Decode every live `Deposit` log, skipping the ones that cannot be decoded.
///
/// A log that does not decode today never will, so it is logged and dropped
/// instead of failing the range.
pub fn decode_deposit_logs(logs: &[EthLog]) -> Vec<DepositLog> {
    let topic = Deposit::topic();
    logs.iter()
        .filter(|log| is_live_event(log, &topic))
        .filter_map(|log| match decode_deposit_log(log) {
            Ok(deposit) => Some(deposit),
            Err(e) => {
                warn!(
                    tx = ?log.transaction_hash,
                    log_index = ?log.log_index,
                    block = ?log.block_number,
                    error = %e,
                    "Skipping malformed deposit log"
                );
                None
            }
        })
        .collect()
}

/// Decode one `Deposit` log.
pub fn decode_deposit_log(log: &EthLog) -> StateRootResult<DepositLog> {
    Ok(DepositLog {
        block_number: log_block(log)?,
        deposit: Deposit::from_log_data(&log.data)?,
    })
}
