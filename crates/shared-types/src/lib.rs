//! # Shared Types Crate
//!
//! Types shared by every crate of the consensus capability:
//!
//! - [`values`]: the typed value codec carried across the capability boundary.
//! - [`capability`]: the request/response envelope exchanged with a workflow
//!   engine.
//! - [`lifecycle`]: the start/close contract for components that own
//!   background tasks.
//!
//! ## Design Principles
//!
//! - **Deterministic encoding**: every map is ordered, so identical logical
//!   values always serialize to identical bytes.
//! - **One response per request**: the envelope has no notion of partial or
//!   repeated responses.

pub mod capability;
pub mod errors;
pub mod lifecycle;
pub mod values;

pub use capability::*;
pub use errors::*;
pub use lifecycle::*;
pub use values::{Value, ValueMap};
