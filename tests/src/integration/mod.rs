//! Cross-crate integration flows.

mod e2e_relay;
mod flows;
