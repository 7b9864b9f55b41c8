//! Word providers.
//!
//! The resolver never talks to a chain directly. It reads raw words through a
//! [`WordProvider`], which production code backs with a node or indexer client
//! and tests back with an in-memory map.
//!
//! Architecture:
//! ```text
//!   Resolver
//!     → CachedProvider      (optional, per session LRU)
//!       → SnapshotProvider / GenesisProvider / node client
//! ```

pub mod genesis;
pub mod snapshot;

pub use genesis::GenesisProvider;
pub use snapshot::{parse_word, SnapshotProvider};

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::ProviderError;

/// Trait for reading contract storage words.
///
/// Implementations own their transport, timeouts and retry policy; the
/// resolver calls each slot at most once per position and never retries.
#[async_trait]
pub trait WordProvider: Send + Sync {
    /// Read the 32-byte word stored at `slot` of `contract`.
    async fn read_word(&self, contract: Address, slot: U256) -> Result<B256, ProviderError>;
}

#[async_trait]
impl<P: WordProvider + ?Sized> WordProvider for Arc<P> {
    async fn read_word(&self, contract: Address, slot: U256) -> Result<B256, ProviderError> {
        (**self).read_word(contract, slot).await
    }
}

#[async_trait]
impl<P: WordProvider + ?Sized> WordProvider for &P {
    async fn read_word(&self, contract: Address, slot: U256) -> Result<B256, ProviderError> {
        (**self).read_word(contract, slot).await
    }
}
