//! # Relayer Configuration
//!
//! Loaded from environment variables:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `RELAYER_DOMAIN_IDS` | required | comma-separated domain ids |
//! | `RELAYER_STORAGE` | `memory` | `memory` or `rocksdb` |
//! | `RELAYER_DATA_DIR` | `./data` | RocksDB directory |
//! | `RELAYER_LOG_LEVEL` | `info` | fallback when `RUST_LOG` is unset |
//! | `RELAYER_LOG_JSON` | `false` | JSON log lines |
//!
//! Per domain, with prefix `RELAYER_DOMAINS_<id>_`:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `EXECUTION_ENDPOINT` | required |
//! | `BEACON_ENDPOINT` | required |
//! | `BRIDGE_ADDRESS` | required |
//! | `STATE_ROOT_ADDRESSES` | none |
//! | `START_BLOCK` | `0` |
//! | `BLOCK_CONFIRMATIONS` | `1` |
//! | `BLOCK_INTERVAL` | `5` (seconds) |
//! | `BLOCK_RETRY_INTERVAL` | `5` (seconds) |
//! | `FRESH_START` | `false` |
//! | `LATEST` | `false` |
//! | `RESOLVE_TIMEOUT` | `30` (seconds) |
//! | `BLOCK_RANGE_LIMIT` | `1000` |
//! | `MAILBOX_CAPACITY` | `64` |
//! | `DEDUP_CAPACITY` | `10000` |

use relay_state_root::{ConfigError, StateRootConfig};
use shared_types::{Address, DomainId};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Environment variable prefix.
pub const PREFIX: &str = "RELAYER";

/// Checkpoint storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    /// Volatile, lost on restart.
    #[default]
    Memory,
    /// Durable RocksDB under `data_dir`.
    RocksDb,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "rocksdb" => Ok(Self::RocksDb),
            other => Err(invalid(
                &format!("{PREFIX}_STORAGE"),
                other,
                "expected `memory` or `rocksdb`",
            )),
        }
    }
}

/// Settings of one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainConfig {
    /// Core settings handed to the state-root handler.
    pub state_root: StateRootConfig,
    /// Execution JSON-RPC endpoint.
    pub execution_endpoint: String,
    /// Beacon REST endpoint.
    pub beacon_endpoint: String,
    /// Bridge contract emitting deposits.
    pub bridge_address: Address,
    /// Contracts emitting state root commitments of other domains.
    pub state_root_addresses: Vec<Address>,
    /// Blocks to wait behind the chain head.
    pub block_confirmations: u64,
    /// Poll interval of the listener.
    pub block_interval: Duration,
    /// Back-off after a failed poll.
    pub block_retry_interval: Duration,
    /// Ignore stored listener progress and start at `start_block`.
    pub fresh_start: bool,
    /// Start listening at the current chain head.
    pub latest: bool,
}

impl DomainConfig {
    pub fn domain_id(&self) -> DomainId {
        self.state_root.domain_id
    }

    /// Load the domain's settings through `lookup`.
    pub fn load<F>(domain_id: DomainId, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = DomainEnv { domain_id, lookup };

        let mut state_root = StateRootConfig::new(domain_id)
            .with_start_block(env.parse_or("START_BLOCK", 0)?)
            .with_resolve_timeout(Duration::from_secs(env.parse_or("RESOLVE_TIMEOUT", 30)?))
            .with_block_range_limit(env.parse_or(
                "BLOCK_RANGE_LIMIT",
                relay_state_root::MAX_BLOCK_RANGE,
            )?);
        state_root.mailbox_capacity = env.parse_or("MAILBOX_CAPACITY", state_root.mailbox_capacity)?;
        state_root.dedup_capacity = env.parse_or("DEDUP_CAPACITY", state_root.dedup_capacity)?;

        let state_root_addresses = match env.get("STATE_ROOT_ADDRESSES") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| parse_address(&env.key("STATE_ROOT_ADDRESSES"), s))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        let config = Self {
            state_root,
            execution_endpoint: env.required("EXECUTION_ENDPOINT")?,
            beacon_endpoint: env.required("BEACON_ENDPOINT")?,
            bridge_address: parse_address(
                &env.key("BRIDGE_ADDRESS"),
                &env.required("BRIDGE_ADDRESS")?,
            )?,
            state_root_addresses,
            block_confirmations: env.parse_or("BLOCK_CONFIRMATIONS", 1)?,
            block_interval: Duration::from_secs(env.parse_or("BLOCK_INTERVAL", 5)?),
            block_retry_interval: Duration::from_secs(env.parse_or("BLOCK_RETRY_INTERVAL", 5)?),
            fresh_start: env.parse_or("FRESH_START", false)?,
            latest: env.parse_or("LATEST", false)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the relayer cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.state_root.validate()?;
        if self.block_interval.is_zero() {
            return Err(invalid(
                &domain_key(self.domain_id(), "BLOCK_INTERVAL"),
                "0",
                "must be positive",
            ));
        }
        Ok(())
    }
}

/// Complete relayer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayerConfig {
    /// One entry per configured domain, in `RELAYER_DOMAIN_IDS` order.
    pub domains: Vec<DomainConfig>,
    /// Checkpoint storage backend.
    pub storage: StorageBackend,
    /// Directory of durable storage.
    pub data_dir: PathBuf,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Emit JSON log lines.
    pub log_json: bool,
}

impl RelayerConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(&|key: &str| std::env::var(key).ok())
    }

    /// Load through `lookup`, which maps a variable name to its value.
    pub fn load<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ids_key = format!("{PREFIX}_DOMAIN_IDS");
        let raw_ids = lookup(&ids_key).ok_or_else(|| ConfigError::Missing {
            key: ids_key.clone(),
        })?;

        let mut domains = Vec::new();
        for raw in raw_ids.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let id: DomainId = raw
                .parse()
                .map_err(|e: std::num::ParseIntError| invalid(&ids_key, raw, &e.to_string()))?;
            if domains.iter().any(|d: &DomainConfig| d.domain_id() == id) {
                return Err(invalid(&ids_key, raw, "duplicate domain id"));
            }
            domains.push(DomainConfig::load(id, lookup)?);
        }
        if domains.is_empty() {
            return Err(invalid(&ids_key, &raw_ids, "no domain configured"));
        }

        let storage = match lookup(&format!("{PREFIX}_STORAGE")) {
            Some(raw) => raw.parse()?,
            None => StorageBackend::default(),
        };
        let log_json_key = format!("{PREFIX}_LOG_JSON");
        let log_json = match lookup(&log_json_key) {
            Some(raw) => parse_value(&log_json_key, &raw)?,
            None => false,
        };

        Ok(Self {
            domains,
            storage,
            data_dir: lookup(&format!("{PREFIX}_DATA_DIR"))
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data")),
            log_level: lookup(&format!("{PREFIX}_LOG_LEVEL")).unwrap_or_else(|| "info".into()),
            log_json,
        })
    }

    /// Configuration of `domain_id`, if configured.
    pub fn domain(&self, domain_id: DomainId) -> Option<&DomainConfig> {
        self.domains.iter().find(|d| d.domain_id() == domain_id)
    }
}

/// Variable lookup scoped to one domain's prefix.
struct DomainEnv<'a, F> {
    domain_id: DomainId,
    lookup: &'a F,
}

impl<F> DomainEnv<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn key(&self, name: &str) -> String {
        domain_key(self.domain_id, name)
    }

    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(&self.key(name))
    }

    fn required(&self, name: &str) -> Result<String, ConfigError> {
        self.get(name)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::Missing { key: self.key(name) })
    }

    fn parse_or<T>(&self, name: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(name) {
            Some(raw) => parse_value(&self.key(name), &raw),
            None => Ok(default),
        }
    }
}

fn domain_key(domain_id: DomainId, name: &str) -> String {
    format!("{PREFIX}_DOMAINS_{domain_id}_{name}")
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| invalid(key, raw, &e.to_string()))
}

/// Parse a `0x`-prefixed 20-byte address.
pub fn parse_address(key: &str, raw: &str) -> Result<Address, ConfigError> {
    let digits = raw.trim().strip_prefix("0x").unwrap_or(raw.trim());
    let bytes = hex::decode(digits).map_err(|e| invalid(key, raw, &e.to_string()))?;
    Address::try_from(bytes.as_slice())
        .map_err(|_| invalid(key, raw, &format!("expected 20 bytes, got {}", bytes.len())))
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
