//! # Oracle-Mesh Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Criterion benchmarks (store, aggregation, rounds)
//! └── src/
//!     └── integration/  # Multi-node rounds over the full capability stack
//!         ├── network.rs  # In-process N-node harness
//!         └── flows.rs    # End-to-end scenarios
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p om-tests
//!
//! # Integration flows only
//! cargo test -p om-tests integration::
//!
//! # Benchmarks
//! cargo bench -p om-tests
//! ```

pub mod integration;
