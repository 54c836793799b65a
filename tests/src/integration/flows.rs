//! # Integration Test Flows
//!
//! State root messages travel over the shared bus to the router, which hands
//! them to the destination's worker; the worker's deposit handler publishes
//! transfer messages back onto the bus.
//!
//! ## Flow Tested
//!
//! 1. **Bus → Router → Worker**: messages reach the worker of their destination
//! 2. **Worker → Deposit Handler → Bus**: deposits become transfer messages
//! 3. **Checkpointing**: ranges advance only on success, re-scans publish nothing twice
//! 4. **Isolation**: a slow destination never holds up another

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    use relay_runtime::MessageRouter;
    use relay_state_root::test_utils::{
        sample_deposit, state_root_message, MockBlockFetcher, MockBlockStorer, MockDepositSource,
    };
    use relay_state_root::{
        BlockStorer, DepositEventHandler, EventHandler, StateRootConfig, StateRootError,
        StateRootHandler, StateRootMailbox, StateRootWorker,
    };
    use shared_bus::{InMemoryMessageBus, MessageFilter, Subscription};
    use shared_types::{DomainId, Message, MessagePayload, MessageType};
    use tokio::sync::watch;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    struct Domain {
        fetcher: Arc<MockBlockFetcher>,
        deposits: Arc<MockDepositSource>,
        mailbox: StateRootMailbox,
    }

    /// Spawn a worker for `domain_id` scanning from block 100.
    fn spawn_domain(
        domain_id: DomainId,
        bus: &Arc<InMemoryMessageBus>,
        storer: Arc<dyn BlockStorer>,
        deposits: MockDepositSource,
    ) -> Domain {
        let fetcher = Arc::new(
            MockBlockFetcher::new()
                .with_block(500, 150)
                .with_block(600, 200),
        );
        let deposits = Arc::new(deposits);
        let config = StateRootConfig::new(domain_id).with_start_block(100);
        let handler = DepositEventHandler::new(
            domain_id,
            deposits.clone(),
            bus.clone(),
            config.block_range_limit,
            config.dedup_capacity,
        );
        let state_root_handler = StateRootHandler::new(
            &config,
            vec![Arc::new(handler) as Arc<dyn EventHandler>],
            fetcher.clone(),
            storer,
        );
        let (mailbox, _task) = StateRootWorker::spawn(state_root_handler, 16);
        Domain {
            fetcher,
            deposits,
            mailbox,
        }
    }

    fn transfers(bus: &InMemoryMessageBus) -> Subscription {
        bus.subscribe(MessageFilter::types(vec![MessageType::Transfer]))
    }

    fn drain(subscription: &mut Subscription) -> Vec<Message> {
        let mut out = Vec::new();
        while let Ok(Some(message)) = subscription.try_recv() {
            out.push(message);
        }
        out
    }

    fn nonces(messages: &[Message]) -> Vec<u64> {
        messages
            .iter()
            .map(|m| match &m.payload {
                MessagePayload::Transfer(data) => data.deposit.deposit_nonce,
                other => panic!("unexpected payload {other:?}"),
            })
            .collect()
    }

    // =============================================================================
    // INTEGRATION TESTS: BUS → ROUTER → WORKER → BUS
    // =============================================================================

    #[tokio::test]
    async fn test_state_root_over_bus_produces_transfers() {
        let bus = Arc::new(InMemoryMessageBus::new());
        let storer = Arc::new(MockBlockStorer::new());
        let domain = spawn_domain(
            1,
            &bus,
            storer.clone(),
            MockDepositSource::new()
                .with_deposit(120, sample_deposit(2, 1))
                .with_deposit(140, sample_deposit(3, 1)),
        );

        let mut router = MessageRouter::new();
        router.register(Arc::new(domain.mailbox.clone()));
        let state_roots = bus.subscribe(MessageFilter::types(vec![MessageType::StateRoot]));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let router_task = tokio::spawn(router.run(state_roots, shutdown_rx));

        let mut sub = transfers(&bus);
        shared_bus::MessagePublisher::publish(bus.as_ref(), state_root_message(2, 1, 500, "sr-1"))
            .await;

        let transfer = timeout(Duration::from_secs(2), sub.recv())
            .await
            .expect("transfer within timeout")
            .expect("bus open");
        assert_eq!((transfer.source, transfer.destination), (1, 2));
        assert_eq!(nonces(&[transfer]), vec![1]);

        timeout(Duration::from_secs(2), async {
            while storer.checkpoint(1, 2) != 150 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("checkpoint advanced");

        shutdown_tx.send(true).unwrap();
        router_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_redelivered_message_is_idempotent() {
        let bus = Arc::new(InMemoryMessageBus::new());
        let storer = Arc::new(MockBlockStorer::new());
        let domain = spawn_domain(
            1,
            &bus,
            storer.clone(),
            MockDepositSource::new().with_deposit(150, sample_deposit(2, 1)),
        );
        let mut sub = transfers(&bus);

        let message = state_root_message(2, 1, 500, "dup");
        domain.mailbox.submit(message.clone()).await.unwrap();
        domain.mailbox.submit(message).await.unwrap();

        assert_eq!(nonces(&drain(&mut sub)), vec![1]);
        // Second delivery resolved to [150, 150]: no new blocks, no write.
        assert_eq!(storer.store_calls(), vec![(1, 2, 150)]);
    }

    #[tokio::test]
    async fn test_example_sequence_rescans_boundary_block() {
        let bus = Arc::new(InMemoryMessageBus::new());
        let storer = Arc::new(MockBlockStorer::new());
        let domain = spawn_domain(
            1,
            &bus,
            storer.clone(),
            MockDepositSource::new()
                .with_deposit(150, sample_deposit(2, 1))
                .with_deposit(180, sample_deposit(2, 2)),
        );
        let mut sub = transfers(&bus);

        domain.mailbox.submit(state_root_message(2, 1, 500, "m1")).await.unwrap();
        domain.mailbox.submit(state_root_message(2, 1, 600, "m2")).await.unwrap();

        assert_eq!(
            domain.deposits.queries(),
            vec![
                relay_state_root::BlockRange::new(100, 150),
                relay_state_root::BlockRange::new(150, 200),
            ]
        );
        // Block 150 was scanned twice; its deposit went out once.
        assert_eq!(nonces(&drain(&mut sub)), vec![1, 2]);
        assert_eq!(storer.checkpoint(1, 2), 200);
    }

    #[tokio::test]
    async fn test_checkpoint_write_failure_rescans_without_duplicates() {
        let bus = Arc::new(InMemoryMessageBus::new());
        let storer = Arc::new(MockBlockStorer::new());
        storer.set_fail_writes(true);
        let domain = spawn_domain(
            1,
            &bus,
            storer.clone(),
            MockDepositSource::new()
                .with_deposit(120, sample_deposit(2, 1))
                .with_deposit(180, sample_deposit(2, 2)),
        );
        let mut sub = transfers(&bus);

        domain.mailbox.submit(state_root_message(2, 1, 500, "m1")).await.unwrap();
        storer.set_fail_writes(false);
        domain.mailbox.submit(state_root_message(2, 1, 600, "m2")).await.unwrap();

        // Old checkpoint was still in effect for the second message.
        assert_eq!(
            domain.deposits.queries()[1],
            relay_state_root::BlockRange::new(100, 200)
        );
        assert_eq!(nonces(&drain(&mut sub)), vec![1, 2]);
        assert_eq!(storer.checkpoint(1, 2), 200);
    }

    #[tokio::test]
    async fn test_scan_failure_keeps_range_for_retry() {
        let bus = Arc::new(InMemoryMessageBus::new());
        let storer = Arc::new(MockBlockStorer::new());
        let domain = spawn_domain(
            1,
            &bus,
            storer.clone(),
            MockDepositSource::new().with_deposit(120, sample_deposit(2, 1)),
        );
        let mut sub = transfers(&bus);

        domain.deposits.set_fail(true);
        let result = domain.mailbox.submit(state_root_message(2, 1, 500, "m1")).await;
        assert!(matches!(result, Err(StateRootError::Scan { .. })));
        assert!(result.unwrap_err().is_retryable());
        assert!(storer.store_calls().is_empty());

        domain.deposits.set_fail(false);
        domain.mailbox.submit(state_root_message(2, 1, 500, "m1")).await.unwrap();
        assert_eq!(nonces(&drain(&mut sub)), vec![1]);
        assert_eq!(storer.checkpoint(1, 2), 150);
    }

    #[tokio::test]
    async fn test_slow_destination_does_not_block_others() {
        let bus = Arc::new(InMemoryMessageBus::new());
        let storer: Arc<dyn BlockStorer> = Arc::new(MockBlockStorer::new());
        let slow = spawn_domain(1, &bus, storer.clone(), MockDepositSource::new());
        let fast = spawn_domain(2, &bus, storer, MockDepositSource::new());
        slow.fetcher.set_delay(Duration::from_millis(500));

        let slow_mailbox = slow.mailbox.clone();
        let slow_task = tokio::spawn(async move {
            slow_mailbox
                .submit(state_root_message(3, 1, 500, "slow"))
                .await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        timeout(
            Duration::from_millis(200),
            fast.mailbox.submit(state_root_message(3, 2, 500, "fast")),
        )
        .await
        .expect("fast destination not blocked")
        .unwrap();
        assert!(!slow_task.is_finished());

        slow_task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_message_for_unregistered_destination_is_dropped() {
        let bus = Arc::new(InMemoryMessageBus::new());
        let storer = Arc::new(MockBlockStorer::new());
        let domain = spawn_domain(1, &bus, storer, MockDepositSource::new());

        let mut router = MessageRouter::new();
        router.register(Arc::new(domain.mailbox.clone()));

        let result = router.route(state_root_message(2, 7, 500, "nowhere")).await;
        assert!(matches!(
            result,
            Err(StateRootError::WorkerUnavailable { domain: 7 })
        ));
        assert_eq!(domain.fetcher.call_count(), 0);
    }
}
