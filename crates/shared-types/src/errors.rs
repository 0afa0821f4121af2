//! # Error Types
//!
//! Defines error types shared across the capability crates.

use thiserror::Error;

/// Errors from the typed value codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// A Rust value could not be wrapped.
    #[error("Failed to wrap value: {0}")]
    Wrap(String),

    /// A value did not match the requested type.
    #[error("Failed to unwrap value: {0}")]
    Unwrap(String),

    /// Binary encoding failed.
    #[error("Failed to encode value: {0}")]
    Encode(String),

    /// Binary decoding failed.
    #[error("Failed to decode value: {0}")]
    Decode(String),

    /// A required map key was absent.
    #[error("Missing field: {0}")]
    MissingField(String),

    /// A value had the wrong variant.
    #[error("Unexpected type for {field}: expected {expected}, got {actual}")]
    UnexpectedType {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },
}
