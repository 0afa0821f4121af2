//! # Consensus Capability Metrics
//!
//! Prometheus metrics for the request lifecycle and the reporting rounds.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! om-02-consensus-capability = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `consensus_capability_requests_accepted_total` - Requests stored by `execute`
//! - `consensus_capability_requests_timed_out_total` - Requests answered with a timeout
//! - `consensus_capability_responses_delivered_total` - Responses written to a caller
//! - `consensus_capability_responses_dropped_total` - Responses not delivered (by reason)
//! - `consensus_capability_reports_produced_total` - Reports emitted by the plugin
//! - `consensus_capability_workflows_pruned_total` - Workflow outcomes pruned

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref REQUESTS_ACCEPTED: IntCounter = register_int_counter!(
        "consensus_capability_requests_accepted_total",
        "Total number of requests accepted into the store"
    )
    .expect("Failed to create REQUESTS_ACCEPTED metric");

    pub static ref REQUESTS_TIMED_OUT: IntCounter = register_int_counter!(
        "consensus_capability_requests_timed_out_total",
        "Total number of requests that expired before a transmission"
    )
    .expect("Failed to create REQUESTS_TIMED_OUT metric");

    pub static ref RESPONSES_DELIVERED: IntCounter = register_int_counter!(
        "consensus_capability_responses_delivered_total",
        "Total number of responses delivered to callers"
    )
    .expect("Failed to create RESPONSES_DELIVERED metric");

    /// Labeled by reason: already_handled, caller_gone, channel_closed
    pub static ref RESPONSES_DROPPED: IntCounterVec = register_int_counter_vec!(
        "consensus_capability_responses_dropped_total",
        "Total number of responses that were not delivered",
        &["reason"]
    )
    .expect("Failed to create RESPONSES_DROPPED metric");

    pub static ref REPORTS_PRODUCED: IntCounter = register_int_counter!(
        "consensus_capability_reports_produced_total",
        "Total number of reports produced by the reporting plugin"
    )
    .expect("Failed to create REPORTS_PRODUCED metric");

    pub static ref WORKFLOWS_PRUNED: IntCounter = register_int_counter!(
        "consensus_capability_workflows_pruned_total",
        "Total number of workflow outcomes pruned"
    )
    .expect("Failed to create WORKFLOWS_PRUNED metric");
}

#[cfg(feature = "metrics")]
pub fn record_request_accepted() {
    REQUESTS_ACCEPTED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_request_timed_out() {
    REQUESTS_TIMED_OUT.inc();
}

#[cfg(feature = "metrics")]
pub fn record_response_delivered() {
    RESPONSES_DELIVERED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_response_dropped(reason: &str) {
    RESPONSES_DROPPED.with_label_values(&[reason]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_reports_produced(count: usize) {
    REPORTS_PRODUCED.inc_by(count as u64);
}

#[cfg(feature = "metrics")]
pub fn record_workflow_pruned() {
    WORKFLOWS_PRUNED.inc();
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub fn record_request_accepted() {}

#[cfg(not(feature = "metrics"))]
pub fn record_request_timed_out() {}

#[cfg(not(feature = "metrics"))]
pub fn record_response_delivered() {}

#[cfg(not(feature = "metrics"))]
pub fn record_response_dropped(_reason: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_reports_produced(_count: usize) {}

#[cfg(not(feature = "metrics"))]
pub fn record_workflow_pruned() {}
