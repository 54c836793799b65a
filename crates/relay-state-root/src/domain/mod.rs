//! Domain layer for the state-root relay
//!
//! Pure value types: checkpoint keys and scan ranges. No I/O.

pub mod checkpoint;
pub mod range;

pub use checkpoint::{scan_start, CheckpointKey};
pub use range::BlockRange;
