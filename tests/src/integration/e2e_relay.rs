//! # End-to-End Relay
//!
//! A `StateRootSubmitted` log on domain 2 about domain 1 travels through the
//! whole pipeline:
//!
//! ```text
//! StateRootListener(2) → Bus → MessageRouter → StateRootWorker(1)
//!                                                    │
//!                       Bus ← Transfer(1 → 2) ← DepositEventHandler(1)
//! ```

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::watch;
    use tokio::time::timeout;

    use relay_runtime::listener::StateRootLogReader;
    use relay_runtime::{ListenerConfig, ListenerStart, MessageRouter, StateRootListener};
    use relay_state_root::adapters::eth_client::{log_block, EthLog};
    use relay_state_root::test_utils::{
        contract_log, sample_deposit, MockBlockFetcher, MockDepositSource,
    };
    use relay_state_root::{
        BlockRange, BlockStorer, DepositEventHandler, EventHandler, InMemoryBlockStorer,
        StateRootConfig, StateRootHandler, StateRootResult, StateRootWorker,
    };
    use shared_bus::{InMemoryMessageBus, MessageFilter};
    use shared_types::{BlockNumber, MessagePayload, MessageType, StateRootSubmitted, U256};

    /// Chain of domain 2 as seen by its execution node.
    struct ChainTwo {
        head: BlockNumber,
        logs: Vec<EthLog>,
    }

    #[async_trait]
    impl StateRootLogReader for ChainTwo {
        async fn head(&self) -> StateRootResult<BlockNumber> {
            Ok(self.head)
        }

        async fn state_root_logs(&self, range: BlockRange) -> StateRootResult<Vec<EthLog>> {
            let mut out = Vec::new();
            for log in &self.logs {
                let block = log_block(log)?;
                if block >= range.start && block <= range.end {
                    out.push(log.clone());
                }
            }
            Ok(out)
        }
    }

    fn state_root_log(block: u64, source_domain_id: u8, slot: u64) -> EthLog {
        let event = StateRootSubmitted {
            source_domain_id,
            slot: U256::from(slot),
            state_root: [0x77; 32],
        };
        contract_log(
            [0x22; 20],
            StateRootSubmitted::topic(),
            event.to_log_data(),
            block,
            0,
        )
    }

    #[tokio::test]
    async fn test_state_root_log_becomes_transfer() {
        let bus = Arc::new(InMemoryMessageBus::new());
        let storer: Arc<dyn BlockStorer> = Arc::new(InMemoryBlockStorer::new());

        // Domain 1: resolves slot 500 to block 150, holds deposits for 2 and 3.
        let deposits = Arc::new(
            MockDepositSource::new()
                .with_deposit(120, sample_deposit(2, 7))
                .with_deposit(130, sample_deposit(3, 8)),
        );
        let config = StateRootConfig::new(1).with_start_block(100);
        let handler = StateRootHandler::new(
            &config,
            vec![Arc::new(DepositEventHandler::new(
                1,
                deposits.clone(),
                bus.clone(),
                config.block_range_limit,
                config.dedup_capacity,
            )) as Arc<dyn EventHandler>],
            Arc::new(MockBlockFetcher::new().with_block(500, 150)),
            storer.clone(),
        );
        let (mailbox, worker) = StateRootWorker::spawn(handler, 8);

        let mut router = MessageRouter::new();
        router.register(Arc::new(mailbox));
        let state_roots = bus.subscribe(MessageFilter::types(vec![MessageType::StateRoot]));
        let mut transfers = bus.subscribe(MessageFilter::types(vec![MessageType::Transfer]));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let router_task = tokio::spawn(router.run(state_roots, shutdown_rx));

        // Domain 2: one commitment about domain 1 at block 105.
        let mut listener = StateRootListener::new(
            ListenerConfig {
                domain_id: 2,
                start: ListenerStart {
                    start_block: 100,
                    fresh_start: false,
                    latest: false,
                },
                block_confirmations: 2,
                block_interval: Duration::from_secs(1),
                block_retry_interval: Duration::from_secs(1),
                block_range_limit: 50,
            },
            Arc::new(ChainTwo {
                head: 112,
                logs: vec![state_root_log(105, 1, 500)],
            }),
            bus.clone(),
            storer.clone(),
        );
        assert_eq!(listener.poll_once().await.unwrap(), 1);
        assert_eq!(listener.next_block(), Some(111));

        let transfer = timeout(Duration::from_secs(2), transfers.recv())
            .await
            .expect("transfer within timeout")
            .expect("bus open");
        assert_eq!((transfer.source, transfer.destination), (1, 2));
        match &transfer.payload {
            MessagePayload::Transfer(data) => {
                assert_eq!(data.deposit.deposit_nonce, 7);
                assert_eq!(data.block_number, 120);
                assert_eq!(data.slot, U256::from(500u64));
            }
            other => panic!("unexpected payload {other:?}"),
        }
        assert_eq!(deposits.queries(), vec![BlockRange::new(100, 150)]);

        timeout(Duration::from_secs(2), async {
            loop {
                if storer.latest_block(1, 2).await.unwrap() == 150 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("destination checkpoint advanced");
        assert_eq!(storer.latest_block(2, 2).await.unwrap(), 110);

        // Nothing new on domain 2: no further messages.
        assert_eq!(listener.poll_once().await.unwrap(), 0);
        assert!(transfers.try_recv().unwrap().is_none());

        shutdown_tx.send(true).unwrap();
        router_task.await.unwrap();
        let stats = timeout(Duration::from_secs(2), worker)
            .await
            .expect("worker stops once the router is gone")
            .unwrap();
        assert_eq!(stats.handled, 1);
        assert_eq!(stats.failed, 0);
    }

    #[tokio::test]
    async fn test_listener_resumes_after_restart() {
        let bus = Arc::new(InMemoryMessageBus::new());
        let storer: Arc<dyn BlockStorer> = Arc::new(InMemoryBlockStorer::new());
        let _state_roots = bus.subscribe(MessageFilter::types(vec![MessageType::StateRoot]));

        let config = ListenerConfig {
            domain_id: 2,
            start: ListenerStart {
                start_block: 100,
                fresh_start: false,
                latest: false,
            },
            block_confirmations: 0,
            block_interval: Duration::from_secs(1),
            block_retry_interval: Duration::from_secs(1),
            block_range_limit: 50,
        };
        let logs = vec![state_root_log(105, 1, 500), state_root_log(140, 3, 600)];

        let mut first = StateRootListener::new(
            config,
            Arc::new(ChainTwo {
                head: 120,
                logs: logs.clone(),
            }),
            bus.clone(),
            storer.clone(),
        );
        let mut published = first.poll_once().await.unwrap();
        drop(first);

        let mut second = StateRootListener::new(
            config,
            Arc::new(ChainTwo { head: 150, logs }),
            bus.clone(),
            storer.clone(),
        );
        published += second.poll_once().await.unwrap();

        // Block 105 was not re-published after the restart.
        assert_eq!(published, 2);
        assert_eq!(second.next_block(), Some(151));
    }
}
