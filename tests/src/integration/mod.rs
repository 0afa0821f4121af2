//! Cross-crate integration: capability, plugin, aggregation and transmitter
//! wired together the way a node runs them.

pub mod flows;
pub mod network;

pub use network::{Node, RoundSummary, TestNetwork};
