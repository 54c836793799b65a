//! # State-Root Relay Benchmarks
//!
//! | Area | Operation |
//! |------|-----------|
//! | Event codec | `Deposit` / `StateRootSubmitted` log decoding, topic hashing |
//! | Block ranges | Splitting large ranges into query chunks |
//! | Handler | One state root message against in-memory ports |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use relay_state_root::test_utils::{
    sample_deposit, state_root_message, MockBlockFetcher, MockBlockStorer, MockDepositSource,
};
use relay_state_root::{
    BlockRange, DepositEventHandler, EventHandler, StateRootConfig, StateRootHandler,
};
use shared_bus::{InMemoryMessageBus, MessageFilter};
use shared_types::abi::event_topic;
use shared_types::{Deposit, MessageType, StateRootSubmitted, U256};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// EVENT CODEC
// ============================================================================

fn bench_event_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("event-codec");

    for payload in [0usize, 64, 1024] {
        let mut deposit = sample_deposit(2, 42);
        deposit.data = vec![0xAB; payload];
        let encoded = deposit.to_log_data();

        group.throughput(Throughput::Bytes(encoded.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("deposit_from_log_data", payload),
            &encoded,
            |b, data| b.iter(|| black_box(Deposit::from_log_data(black_box(data)).is_ok())),
        );
    }

    let state_root = StateRootSubmitted {
        source_domain_id: 1,
        slot: U256::from(7_654_321u64),
        state_root: [0x5A; 32],
    }
    .to_log_data();
    group.bench_function("state_root_from_log_data", |b| {
        b.iter(|| black_box(StateRootSubmitted::from_log_data(black_box(&state_root)).is_ok()))
    });

    group.bench_function("event_topic", |b| {
        b.iter(|| {
            black_box(event_topic(black_box(
                "Deposit(uint8,uint8,bytes32,uint64,address,bytes)",
            )))
        })
    });

    group.finish();
}

// ============================================================================
// BLOCK RANGES
// ============================================================================

fn bench_range_chunking(c: &mut Criterion) {
    let mut group = c.benchmark_group("block-range");

    for span in [1_000u64, 100_000, 1_000_000] {
        let range = BlockRange::new(10_000, 10_000 + span);
        group.throughput(Throughput::Elements(span));
        group.bench_with_input(BenchmarkId::new("chunks_1000", span), &range, |b, range| {
            b.iter(|| black_box(range.chunks(1000).count()))
        });
    }

    group.finish();
}

// ============================================================================
// HANDLER
// ============================================================================

fn bench_handle_message(c: &mut Criterion) {
    let mut group = c.benchmark_group("state-root-handler");
    group.measurement_time(Duration::from_secs(5));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime");

    let config = StateRootConfig::new(1).with_start_block(100);
    group.bench_function("cold_start_message", |b| {
        let bus = Arc::new(InMemoryMessageBus::new());
        let mut transfers = bus.subscribe(MessageFilter::types(vec![MessageType::Transfer]));
        let message = state_root_message(2, 1, 900, "bench");
        b.iter(|| {
            // Keep the bounded transfer queue from filling up.
            while let Ok(Some(_)) = transfers.try_recv() {}
            // Fresh checkpoint store each round so every message scans [100, 300].
            let mut handler = StateRootHandler::new(
                &config,
                vec![Arc::new(DepositEventHandler::new(
                    1,
                    Arc::new(MockDepositSource::new().with_deposit(200, sample_deposit(2, 1))),
                    bus.clone(),
                    config.block_range_limit,
                    config.dedup_capacity,
                )) as Arc<dyn EventHandler>],
                Arc::new(MockBlockFetcher::new().with_block(900, 300)),
                Arc::new(MockBlockStorer::new()),
            );
            runtime.block_on(async { black_box(handler.handle_message(&message).await.is_ok()) })
        })
    });

    for deposits in [0u64, 10, 100] {
        let bus = Arc::new(InMemoryMessageBus::new());
        let _transfers = bus.subscribe(MessageFilter::types(vec![MessageType::Transfer]));

        let source = (0..deposits).fold(MockDepositSource::new(), |source, nonce| {
            source.with_deposit(100 + nonce, sample_deposit(2, nonce))
        });
        let deposit_handler = DepositEventHandler::new(
            1,
            Arc::new(source),
            bus.clone(),
            config.block_range_limit,
            config.dedup_capacity,
        );

        group.throughput(Throughput::Elements(deposits.max(1)));
        let deposit_handler: Arc<dyn EventHandler> = Arc::new(deposit_handler);
        group.bench_function(BenchmarkId::new("deposit_scan_dedup", deposits), |b| {
            b.iter(|| {
                runtime.block_on(async {
                    black_box(
                        deposit_handler
                            .handle_events(2, BlockRange::new(100, 300), U256::from(900u64))
                            .await
                            .is_ok(),
                    )
                })
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_event_decoding,
    bench_range_chunking,
    bench_handle_message
);
criterion_main!(benches);
