//! Runtime errors

use relay_state_root::{ConfigError, StateRootError};
use thiserror::Error;

/// Errors raised while assembling or running the relayer.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Checkpoint storage could not be opened.
    #[error("Storage error: {0}")]
    Storage(String),

    /// An adapter could not be constructed.
    #[error(transparent)]
    StateRoot(#[from] StateRootError),

    /// The log subscriber could not be installed.
    #[error("Logging initialisation failed: {0}")]
    Logging(String),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
