//! # Adapters
//!
//! Concrete implementations of the outbound ports.
//!
//! | Adapter | Port | Backend |
//! |---------|------|---------|
//! | `BeaconBlockFetcher` | `BlockFetcher` | beacon node REST |
//! | `InMemoryBlockStorer` | `BlockStorer` | process memory |
//! | `EthDepositSource` | `DepositLogSource` | execution node via `ethers` |
//! | `DepositEventHandler` | `EventHandler` | deposit source + message bus |

pub mod beacon;
pub mod deposit_handler;
pub mod deposit_source;
pub mod eth_client;
pub mod memory_store;

pub use beacon::BeaconBlockFetcher;
pub use deposit_handler::DepositEventHandler;
pub use deposit_source::EthDepositSource;
pub use eth_client::{EthClient, EthLog};
pub use memory_store::InMemoryBlockStorer;
