use alloy_genesis::{Genesis, GenesisAccount};
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;

use super::WordProvider;
use crate::errors::ProviderError;

/// A [`WordProvider`] that reads from a genesis configuration's alloc.
///
/// Useful for inspecting pre-deployed contracts without a running node. Slots
/// absent from an account's storage read as zero.
#[derive(Debug, Clone)]
pub struct GenesisProvider {
    alloc: BTreeMap<Address, GenesisAccount>,
}

impl GenesisProvider {
    /// Create a provider from a genesis configuration.
    pub fn from_genesis(genesis: &Genesis) -> Self {
        Self {
            alloc: genesis.alloc.clone(),
        }
    }

    /// Load a genesis JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let json = std::fs::read_to_string(path)?;
        let genesis: Genesis = serde_json::from_str(&json)?;
        Ok(Self::from_genesis(&genesis))
    }
}

#[async_trait]
impl WordProvider for GenesisProvider {
    async fn read_word(&self, contract: Address, slot: U256) -> Result<B256, ProviderError> {
        let account = self
            .alloc
            .get(&contract)
            .ok_or(ProviderError::UnknownContract(contract))?;
        let key = B256::from(slot.to_be_bytes());
        Ok(account
            .storage
            .as_ref()
            .and_then(|storage| storage.get(&key).copied())
            .unwrap_or(B256::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const CONTRACT: Address = address!("00000000000000000000000000000000000c0de0");

    fn genesis_with_storage() -> Genesis {
        let mut storage = BTreeMap::new();
        storage.insert(
            B256::from(U256::from(1).to_be_bytes()),
            B256::from(U256::from(42).to_be_bytes()),
        );
        let mut alloc = BTreeMap::new();
        alloc.insert(
            CONTRACT,
            GenesisAccount {
                balance: U256::ZERO,
                nonce: None,
                code: None,
                storage: Some(storage),
                private_key: None,
            },
        );
        Genesis {
            alloc,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_reads_genesis_storage() {
        let provider = GenesisProvider::from_genesis(&genesis_with_storage());
        assert_eq!(
            provider.read_word(CONTRACT, U256::from(1)).await.unwrap(),
            B256::from(U256::from(42).to_be_bytes())
        );
        assert_eq!(
            provider.read_word(CONTRACT, U256::from(2)).await.unwrap(),
            B256::ZERO
        );
    }

    #[tokio::test]
    async fn test_unknown_account_fails() {
        let provider = GenesisProvider::from_genesis(&Genesis::default());
        assert!(provider.read_word(CONTRACT, U256::ZERO).await.is_err());
    }
}
