//! # RocksDB Checkpoint Store
//!
//! Durable `BlockStorer`. One column family, `checkpoints`, holding
//! `latest_block:{destination}:{source}` → big-endian `u64`.
//!
//! Writes are fsynced unless `sync_writes` is off.

use crate::error::{RuntimeError, RuntimeResult};
use async_trait::async_trait;
use relay_state_root::{BlockStorer, StateRootError, StateRootResult};
use rocksdb::{ColumnFamilyDescriptor, Options, WriteOptions, DB};
use shared_types::{BlockNumber, DomainId};
use std::path::PathBuf;
use std::sync::Arc;

/// Column family holding checkpoints.
pub const CF_CHECKPOINTS: &str = "checkpoints";

/// RocksDB configuration.
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory
    pub path: PathBuf,
    /// Block cache size in bytes (default: 8MB)
    pub block_cache_size: usize,
    /// fsync after each write (default: true)
    pub sync_writes: bool,
}

impl RocksDbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 8 * 1024 * 1024,
            sync_writes: true,
        }
    }

    /// Config for testing (no sync)
    pub fn for_testing(path: impl Into<PathBuf>) -> Self {
        Self {
            sync_writes: false,
            ..Self::new(path)
        }
    }
}

/// Checkpoint key of a pair.
pub fn checkpoint_key(destination: DomainId, source: DomainId) -> Vec<u8> {
    format!("latest_block:{destination}:{source}").into_bytes()
}

/// RocksDB-backed checkpoint store.
pub struct RocksDbBlockStorer {
    db: Arc<DB>,
    config: RocksDbConfig,
}

impl RocksDbBlockStorer {
    /// Open or create the database.
    pub fn open(config: RocksDbConfig) -> RuntimeResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let cf = ColumnFamilyDescriptor::new(CF_CHECKPOINTS, Options::default());
        let db = DB::open_cf_descriptors(&opts, &config.path, vec![cf])
            .map_err(|e| RuntimeError::Storage(format!("Failed to open RocksDB: {e}")))?;

        Ok(Self {
            db: Arc::new(db),
            config,
        })
    }

    fn checkpoint_error(destination: DomainId, source: DomainId, reason: String) -> StateRootError {
        StateRootError::Checkpoint {
            destination,
            source_domain: source,
            reason,
        }
    }
}

#[async_trait]
impl BlockStorer for RocksDbBlockStorer {
    async fn latest_block(
        &self,
        destination: DomainId,
        source: DomainId,
    ) -> StateRootResult<BlockNumber> {
        let cf = self.db.cf_handle(CF_CHECKPOINTS).ok_or_else(|| {
            Self::checkpoint_error(destination, source, "missing column family".into())
        })?;
        let value = self
            .db
            .get_cf(cf, checkpoint_key(destination, source))
            .map_err(|e| Self::checkpoint_error(destination, source, format!("RocksDB get failed: {e}")))?;

        match value {
            None => Ok(0),
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    Self::checkpoint_error(
                        destination,
                        source,
                        format!("corrupt checkpoint of {} bytes", bytes.len()),
                    )
                })?;
                Ok(u64::from_be_bytes(raw))
            }
        }
    }

    async fn store_block(
        &self,
        destination: DomainId,
        source: DomainId,
        block: BlockNumber,
    ) -> StateRootResult<()> {
        let cf = self.db.cf_handle(CF_CHECKPOINTS).ok_or_else(|| {
            Self::checkpoint_error(destination, source, "missing column family".into())
        })?;
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);

        self.db
            .put_cf_opt(cf, checkpoint_key(destination, source), block.to_be_bytes(), &write_opts)
            .map_err(|e| Self::checkpoint_error(destination, source, format!("RocksDB put failed: {e}")))
    }
}
