//! # State-Root Relayer Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Hot-path benchmarks (ABI decode, range chunking)
//! └── src/integration/  # Cross-crate flows over the message bus
//!     ├── flows.rs      # router → worker → deposit handler → bus
//!     └── e2e_relay.rs  # listener → bus → router → worker → sink
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p relay-tests
//!
//! # Benchmarks
//! cargo bench -p relay-tests
//! ```

pub mod integration;
