//! Domain types for aggregation.

mod feed;
mod outcome;

pub use feed::{FeedId, FeedReport};
pub use outcome::AggregationOutcome;

/// Index of a node in the agreement protocol's committee.
pub type OracleId = u8;
