//! Log subscriber setup
//!
//! The filter comes from `RUST_LOG` when set, otherwise from the configured
//! level. JSON output is meant for containers.

use crate::error::{RuntimeError, RuntimeResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(log_level: &str, json: bool) -> RuntimeResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| RuntimeError::Logging(e.to_string()))?;

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| RuntimeError::Logging(e.to_string()))
}
