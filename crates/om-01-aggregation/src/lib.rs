//! # om-01-aggregation
//!
//! Aggregation policies for the consensus capability.
//!
//! ## Architecture
//!
//! An [`Aggregator`] is a pure function of the previous agreed state and the
//! observations of every participating node:
//!
//! ```text
//! (previous outcome, observations by node, F) ──aggregate──→ (outcome, should_report)
//! ```
//!
//! The capability looks aggregators up by method name through an
//! [`AggregatorRegistry`] and encoders through an [`EncoderRegistry`], so new
//! methods plug in without touching the capability.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use om_01_aggregation::{AggregatorRegistry, DATA_FEEDS_METHOD};
//!
//! let registry = AggregatorRegistry::default();
//! let aggregator = registry.build(DATA_FEEDS_METHOD, &config)?;
//! let outcome = aggregator.aggregate(previous.as_ref(), &observations, f)?;
//! ```

pub mod codec;
pub mod data_feeds;
pub mod domain;
pub mod encoder;
pub mod error;
pub mod ports;
pub mod registry;

pub use codec::TriggerEventCodec;
pub use data_feeds::{
    DataFeedsAggregator, DataFeedsConfig, DataFeedsMetadata, FeedConfig, FeedState,
    DATA_FEEDS_METHOD,
};
pub use domain::{AggregationOutcome, FeedId, FeedReport, OracleId};
pub use encoder::{ValueEncoder, VALUES_ENCODER};
pub use error::{AggregationError, Result};
pub use ports::{Aggregator, Encoder, ReportCodec};
pub use registry::{AggregatorFactory, AggregatorRegistry, EncoderFactory, EncoderRegistry};
