//! Name-keyed factories for aggregators and encoders.
//!
//! A workflow names its aggregation method and encoder in its registration
//! config; the capability resolves both through these registries.

use crate::data_feeds::{DataFeedsAggregator, DATA_FEEDS_METHOD};
use crate::encoder::{ValueEncoder, VALUES_ENCODER};
use crate::error::{AggregationError, Result};
use crate::ports::{Aggregator, Encoder};
use shared_types::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builds an aggregator from its registration config.
pub type AggregatorFactory = Box<dyn Fn(&Value) -> Result<Arc<dyn Aggregator>> + Send + Sync>;

/// Builds an encoder from its registration config.
pub type EncoderFactory = Box<dyn Fn(&Value) -> Result<Arc<dyn Encoder>> + Send + Sync>;

/// Aggregation methods by name.
pub struct AggregatorRegistry {
    factories: BTreeMap<String, AggregatorFactory>,
}

impl AggregatorRegistry {
    /// Registry with no methods.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Register (or replace) a method.
    pub fn register(&mut self, method: impl Into<String>, factory: AggregatorFactory) {
        self.factories.insert(method.into(), factory);
    }

    pub fn contains(&self, method: &str) -> bool {
        self.factories.contains_key(method)
    }

    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Build an aggregator for `method` from `config`.
    pub fn build(&self, method: &str, config: &Value) -> Result<Arc<dyn Aggregator>> {
        let factory = self
            .factories
            .get(method)
            .ok_or_else(|| AggregationError::UnknownMethod(method.to_string()))?;
        factory(config)
    }
}

impl Default for AggregatorRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(
            DATA_FEEDS_METHOD,
            Box::new(|config: &Value| {
                let aggregator: Arc<dyn Aggregator> =
                    Arc::new(DataFeedsAggregator::from_value(config)?);
                Ok(aggregator)
            }),
        );
        registry
    }
}

/// Encoders by name.
pub struct EncoderRegistry {
    factories: BTreeMap<String, EncoderFactory>,
}

impl EncoderRegistry {
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, factory: EncoderFactory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn build(&self, name: &str, config: &Value) -> Result<Arc<dyn Encoder>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| AggregationError::UnknownEncoder(name.to_string()))?;
        factory(config)
    }
}

impl Default for EncoderRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(
            VALUES_ENCODER,
            Box::new(|_: &Value| {
                let encoder: Arc<dyn Encoder> = Arc::new(ValueEncoder);
                Ok(encoder)
            }),
        );
        registry
    }
}
