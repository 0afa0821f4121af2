//! # Integration Test Flows
//!
//! Full rounds across a four node network (`F = 1`) running the data feeds
//! aggregation:
//!
//! 1. **Execute → Round → Transmit**: every caller gets the agreed report.
//! 2. **No trigger**: a round that agrees not to report still releases
//!    callers, with an empty response.
//! 3. **Missing quorum**: executions seen by fewer than `2F+1` nodes stay
//!    pending.
//! 4. **Expiry**: executions nobody reconciles time out.

#[cfg(test)]
mod tests {
    use crate::integration::TestNetwork;
    use anyhow::{Context, Result};
    use om_01_aggregation::data_feeds::REPORTS_KEY;
    use om_01_aggregation::{FeedId, FeedReport, ReportCodec, TriggerEventCodec, DATA_FEEDS_METHOD};
    use om_02_consensus_capability::{
        CapabilityConfig, ConsensusCapabilityApi, WorkflowRegistry, CAPABILITY_ID, METADATA_KEY,
        TIMEOUT_MESSAGE,
    };
    use primitive_types::U256;
    use shared_types::{CapabilityResponse, Service, ServiceStatus, Value, ValueMap};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const WORKFLOW: &str = "price-feeds-workflow";

    fn feed() -> FeedId {
        FeedId([0x01; 32])
    }

    fn execution_id() -> String {
        format!("exec-{}", Uuid::new_v4())
    }

    /// Registration and execution config: one feed, 5% deviation, 60s heartbeat.
    fn workflow_config() -> Value {
        let mut entry = ValueMap::new();
        entry.insert("deviation".to_string(), Value::from("0.05"));
        entry.insert("heartbeat".to_string(), Value::from(60i64));
        let mut feeds = ValueMap::new();
        feeds.insert(feed().to_string(), Value::Map(entry));
        let mut aggregation_config = ValueMap::new();
        aggregation_config.insert("feeds".to_string(), Value::Map(feeds));

        let mut config = ValueMap::new();
        config.insert("aggregation_method".to_string(), Value::from(DATA_FEEDS_METHOD));
        config.insert("aggregation_config".to_string(), Value::Map(aggregation_config));
        config.insert("encoder".to_string(), Value::from("values"));
        config.insert("report_id".to_string(), Value::from("0001"));
        config.insert("key_id".to_string(), Value::from("evm"));
        Value::Map(config)
    }

    /// A trigger event carrying one signed price report.
    fn trigger_event(price: u64, timestamp: i64) -> Value {
        let report = FeedReport {
            feed_id: feed(),
            full_report: vec![0xfe, 0xed, price as u8],
            report_context: vec![],
            signatures: vec![vec![0x55; 65]],
            benchmark_price: U256::from(price),
            observation_timestamp: timestamp,
        };
        TriggerEventCodec
            .encode(&[report])
            .expect("trigger event encodes")
    }

    async fn network() -> Result<TestNetwork> {
        let network = TestNetwork::start(4, 1, CapabilityConfig::default()).await?;
        network.register(WORKFLOW, &workflow_config()).await?;
        Ok(network)
    }

    async fn recv_all(receivers: &mut [mpsc::Receiver<CapabilityResponse>]) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity(receivers.len());
        for rx in receivers.iter_mut() {
            let response = rx.recv().await.context("channel closed without a response")?;
            values.push(response.into_result().map_err(anyhow::Error::msg)?);
        }
        Ok(values)
    }

    // =============================================================================
    // EXECUTE → ROUND → TRANSMIT
    // =============================================================================

    #[tokio::test]
    async fn test_round_delivers_agreed_report_to_every_caller() -> Result<()> {
        om_telemetry::init_test_logging();
        let mut network = network().await?;
        let execution = execution_id();

        let mut receivers = network
            .execute(WORKFLOW, &execution, &workflow_config(), &trigger_event(100, 1_000))
            .await?;

        let summary = network.run_round().await?.context("leader had nothing queued")?;
        assert_eq!(summary.outcome.current_reports.len(), 1);
        assert!(summary.outcome.current_reports[0].outcome.should_report);
        assert_eq!(summary.transmitted, 4);

        for value in recv_all(&mut receivers).await? {
            let report = value.get("report").and_then(Value::as_bytes).context("report bytes")?;
            let decoded = Value::from_bytes(report)?;

            let reports = decoded.get(REPORTS_KEY).and_then(Value::as_list).context("reports")?;
            assert_eq!(reports.len(), 1);
            assert_eq!(reports[0].get("FeedID"), Some(&Value::from(feed().to_string())));
            assert_eq!(reports[0].get("Price"), Some(&Value::BigInt(U256::from(100u64))));
            assert_eq!(reports[0].get("Timestamp"), Some(&Value::Int64(1_000)));

            let metadata = decoded.get(METADATA_KEY).context("metadata")?;
            assert_eq!(metadata.get("execution_id"), Some(&Value::from(execution.as_str())));
            assert_eq!(metadata.get("workflow_id"), Some(&Value::from(WORKFLOW)));

            let context = value.get("context").and_then(Value::as_bytes).context("context")?;
            assert_eq!(context.len(), 64);
            assert_eq!(&context[56..], &1u64.to_be_bytes());
            assert_eq!(value.get("id"), Some(&Value::Bytes(vec![0x00, 0x01])));
            let signatures = value.get("signatures").and_then(Value::as_list).context("signatures")?;
            assert_eq!(signatures.len(), 2);
        }

        for node in &network.nodes {
            assert!(node.capability.store().get(&execution).is_none());
        }
        network.shutdown().await
    }

    #[tokio::test]
    async fn test_round_without_trigger_releases_callers_empty() -> Result<()> {
        let mut network = network().await?;

        let mut first = network
            .execute(WORKFLOW, &execution_id(), &workflow_config(), &trigger_event(100, 1_000))
            .await?;
        network.run_round().await?.context("first round")?;
        recv_all(&mut first).await?;

        // 1% move within the heartbeat
        let mut second = network
            .execute(WORKFLOW, &execution_id(), &workflow_config(), &trigger_event(101, 1_010))
            .await?;
        let summary = network.run_round().await?.context("second round")?;
        assert!(!summary.outcome.current_reports[0].outcome.should_report);

        for value in recv_all(&mut second).await? {
            assert_eq!(value, Value::empty_map());
        }
        network.shutdown().await
    }

    #[tokio::test]
    async fn test_deviation_reports_in_later_round() -> Result<()> {
        let mut network = network().await?;

        let mut first = network
            .execute(WORKFLOW, &execution_id(), &workflow_config(), &trigger_event(100, 1_000))
            .await?;
        network.run_round().await?.context("first round")?;
        recv_all(&mut first).await?;

        let mut second = network
            .execute(WORKFLOW, &execution_id(), &workflow_config(), &trigger_event(110, 1_010))
            .await?;
        network.run_round().await?.context("second round")?;

        assert_eq!(
            network.nodes[0].capability.registered_workflow_ids(),
            vec![WORKFLOW]
        );
        for value in recv_all(&mut second).await? {
            let decoded = Value::from_bytes(value.get("report").and_then(Value::as_bytes).context("report")?)?;
            let reports = decoded.get(REPORTS_KEY).and_then(Value::as_list).context("reports")?;
            assert_eq!(reports[0].get("Price"), Some(&Value::BigInt(U256::from(110u64))));
        }
        network.shutdown().await
    }

    // =============================================================================
    // QUORUM AND EXPIRY
    // =============================================================================

    #[tokio::test]
    async fn test_execution_without_quorum_stays_pending() -> Result<()> {
        let mut network = network().await?;
        let execution = execution_id();

        // Round 1 is led by node 1; only nodes 0 and 1 know the execution
        let _receivers = network
            .execute_on(&[0, 1], WORKFLOW, &execution, &workflow_config(), &trigger_event(100, 1_000))
            .await?;

        let summary = network.run_round().await?.context("leader had nothing queued")?;
        assert_eq!(summary.leader, 1);
        assert!(summary.outcome.current_reports.is_empty());
        assert_eq!(summary.transmitted, 0);

        assert!(network.nodes[0].capability.store().get(&execution).is_some());
        assert!(network.nodes[1].capability.store().get(&execution).is_some());
        network.shutdown().await
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreconciled_execution_times_out() -> Result<()> {
        let mut network = TestNetwork::start(
            4,
            1,
            CapabilityConfig {
                request_timeout_secs: 30,
                ..CapabilityConfig::default()
            },
        )
        .await?;
        network.register(WORKFLOW, &workflow_config()).await?;

        let mut receivers = network
            .execute(WORKFLOW, &execution_id(), &workflow_config(), &trigger_event(100, 1_000))
            .await?;
        tokio::time::sleep(Duration::from_secs(31)).await;

        for rx in receivers.iter_mut() {
            let response = rx.recv().await.context("timeout response")?;
            assert_eq!(response.error.as_deref(), Some(TIMEOUT_MESSAGE));
            assert!(rx.recv().await.is_none());
        }

        // Nothing left for the leader to propose
        assert!(network.run_round().await?.is_none());
        network.shutdown().await
    }

    #[tokio::test]
    async fn test_shutdown_withdraws_every_capability() -> Result<()> {
        let network = network().await?;
        for node in &network.nodes {
            assert!(node.registry.get(CAPABILITY_ID).is_some());
            assert_eq!(node.capability.info().id, CAPABILITY_ID);
        }

        network.shutdown().await?;
        for node in &network.nodes {
            assert!(node.registry.get(CAPABILITY_ID).is_none());
            assert_eq!(node.capability.health_check().await, ServiceStatus::Stopped);
        }
        Ok(())
    }
}
