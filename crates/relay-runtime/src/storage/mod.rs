//! # Checkpoint Storage
//!
//! Selects the `BlockStorer` backend from configuration.

#[cfg(feature = "rocksdb")]
pub mod rocksdb;

#[cfg(feature = "rocksdb")]
pub use self::rocksdb::{RocksDbBlockStorer, RocksDbConfig};

use crate::config::{RelayerConfig, StorageBackend};
use crate::error::{RuntimeError, RuntimeResult};
use relay_state_root::{BlockStorer, InMemoryBlockStorer};
use std::sync::Arc;
use tracing::{info, warn};

/// Open the configured checkpoint store.
pub fn open_block_storer(config: &RelayerConfig) -> RuntimeResult<Arc<dyn BlockStorer>> {
    match config.storage {
        StorageBackend::Memory => {
            warn!("Using in-memory checkpoints, progress is lost on restart");
            Ok(Arc::new(InMemoryBlockStorer::new()))
        }
        StorageBackend::RocksDb => open_rocksdb(config),
    }
}

#[cfg(feature = "rocksdb")]
fn open_rocksdb(config: &RelayerConfig) -> RuntimeResult<Arc<dyn BlockStorer>> {
    let path = config.data_dir.join("checkpoints");
    info!(path = %path.display(), "Opening RocksDB checkpoint store");
    let store = RocksDbBlockStorer::open(RocksDbConfig::new(path))?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "rocksdb"))]
fn open_rocksdb(config: &RelayerConfig) -> RuntimeResult<Arc<dyn BlockStorer>> {
    info!(data_dir = %config.data_dir.display(), "RocksDB storage requested");
    Err(RuntimeError::Storage(
        "built without the `rocksdb` feature".to_string(),
    ))
}
