//! # Oracle-Mesh Capability Benchmarks
//!
//! | Component | Operation | Target |
//! |-----------|-----------|--------|
//! | om-02 RequestStore | `first_n` over a full queue | < 1ms |
//! | om-01 DataFeedsAggregator | aggregate 100 feeds × 31 nodes | < 10ms |
//! | om-02 ReportingPlugin | outcome for a full batch | < 10ms |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use om_01_aggregation::{
    Aggregator, AggregatorRegistry, FeedId, FeedReport, OracleId, ReportCodec, TriggerEventCodec,
    DATA_FEEDS_METHOD,
};
use om_02_consensus_capability::{
    AttributedObservation, CapabilityConfig, ConsensusCapability, ConsensusReportingPlugin,
    OutcomeContext, PendingRequest, PluginConfig, ReportingPlugin, Request, RequestStore,
};
use primitive_types::U256;
use shared_types::{Value, ValueMap};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn request(workflow_id: &str, execution_id: String, observation: Value) -> Request {
    Request {
        workflow_execution_id: execution_id,
        workflow_id: workflow_id.to_string(),
        workflow_owner: "0xowner".to_string(),
        workflow_name: "bench".to_string(),
        workflow_don_id: 1,
        workflow_don_config_version: 1,
        report_id: "0001".to_string(),
        key_id: "evm".to_string(),
        observations: vec![observation],
        expires_at: Instant::now() + Duration::from_secs(3600),
    }
}

fn feeds_config(feeds: usize) -> Value {
    let mut feed_map = ValueMap::new();
    for i in 0..feeds {
        let mut entry = ValueMap::new();
        entry.insert("deviation".to_string(), Value::from("0.01"));
        entry.insert("heartbeat".to_string(), Value::from(3600i64));
        feed_map.insert(FeedId([i as u8; 32]).to_string(), Value::Map(entry));
    }
    let mut config = ValueMap::new();
    config.insert("feeds".to_string(), Value::Map(feed_map));
    Value::Map(config)
}

fn trigger_event(feeds: usize, price: u64) -> Value {
    let reports: Vec<FeedReport> = (0..feeds)
        .map(|i| FeedReport {
            feed_id: FeedId([i as u8; 32]),
            full_report: vec![0xab; 256],
            report_context: vec![],
            signatures: vec![],
            benchmark_price: U256::from(price + i as u64),
            observation_timestamp: 1_700_000_000,
        })
        .collect();
    TriggerEventCodec
        .encode(&reports)
        .expect("trigger event encodes")
}

// ============================================================================
// om-02: RequestStore
// ============================================================================

fn bench_request_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("om-02-request-store");

    for size in [100usize, 1_000, 10_000] {
        let store = RequestStore::new();
        for i in 0..size {
            let (tx, _rx) = mpsc::channel(1);
            let pending = PendingRequest::new(
                request("W1", format!("exec-{i}"), Value::Null),
                tx,
                CancellationToken::new(),
            );
            store.add(pending).expect("unique id");
        }

        group.throughput(Throughput::Elements(20));
        group.bench_with_input(BenchmarkId::new("first_n_20", size), &store, |b, store| {
            b.iter(|| black_box(store.first_n(20).expect("queue not empty")))
        });
    }

    group.finish();
}

// ============================================================================
// om-01: DataFeedsAggregator
// ============================================================================

fn bench_data_feeds_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("om-01-data-feeds");
    group.measurement_time(Duration::from_secs(10));

    let registry = AggregatorRegistry::default();
    for feeds in [10usize, 100] {
        let aggregator = registry
            .build(DATA_FEEDS_METHOD, &feeds_config(feeds))
            .expect("valid config");

        let observations: BTreeMap<OracleId, Vec<Value>> = (0..31u8)
            .map(|node| (node, vec![trigger_event(feeds, 1_000 + node as u64)]))
            .collect();

        group.throughput(Throughput::Elements(feeds as u64));
        group.bench_with_input(
            BenchmarkId::new("aggregate_31_nodes", feeds),
            &observations,
            |b, observations| {
                b.iter(|| black_box(aggregator.aggregate(None, observations, 10).expect("aggregates")))
            },
        );
    }

    group.finish();
}

// ============================================================================
// om-02: ReportingPlugin outcome
// ============================================================================

fn bench_plugin_outcome(c: &mut Criterion) {
    let mut group = c.benchmark_group("om-02-reporting-plugin");

    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let capability = Arc::new(ConsensusCapability::new(CapabilityConfig::default()));
    runtime
        .block_on(async {
            use om_02_consensus_capability::ConsensusCapabilityApi;
            use shared_types::{RegistrationRequest, RequestMetadata};

            let mut config = ValueMap::new();
            config.insert("aggregation_method".to_string(), Value::from(DATA_FEEDS_METHOD));
            config.insert("aggregation_config".to_string(), feeds_config(10));
            config.insert("report_id".to_string(), Value::from("0001"));
            capability
                .register_to_workflow(RegistrationRequest {
                    metadata: RequestMetadata {
                        workflow_id: "W1".to_string(),
                        ..RequestMetadata::default()
                    },
                    config: Value::Map(config),
                })
                .await
        })
        .expect("registers");

    let nodes: Vec<ConsensusReportingPlugin> = (0..4u8)
        .map(|oracle_id| {
            let store = Arc::new(RequestStore::new());
            for i in 0..20 {
                let (tx, _rx) = mpsc::channel(1);
                let pending = PendingRequest::new(
                    request("W1", format!("exec-{i}"), trigger_event(10, 1_000)),
                    tx,
                    CancellationToken::new(),
                );
                store.add(pending).expect("unique id");
            }
            ConsensusReportingPlugin::new(
                store,
                capability.clone(),
                PluginConfig::default(),
                oracle_id,
                1,
            )
        })
        .collect();

    let ctx = OutcomeContext::default();
    let query = nodes[0].query(&ctx).expect("query");
    let observations: Vec<AttributedObservation> = nodes
        .iter()
        .enumerate()
        .map(|(i, plugin)| AttributedObservation {
            observer: i as OracleId,
            observation: plugin.observation(&ctx, &query).expect("observation"),
        })
        .collect();

    group.throughput(Throughput::Elements(20));
    group.bench_function("outcome_batch_20", |b| {
        b.iter(|| black_box(nodes[0].outcome(&ctx, &query, &observations).expect("outcome")))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_request_store,
    bench_data_feeds_aggregate,
    bench_plugin_outcome
);
criterion_main!(benches);
