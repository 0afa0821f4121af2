//! Adapters for the capability's ports.

pub mod registry;
pub mod transmitter;

pub use registry::InMemoryCapabilityRegistry;
pub use transmitter::{report_context, CapabilityTransmitter};
