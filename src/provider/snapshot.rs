use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use super::WordProvider;
use crate::constants::WORD_SIZE;
use crate::errors::ProviderError;
use crate::layout::parse_slot;

/// In-memory storage keyed by `(contract, slot)`.
///
/// Slots that were never set read as zero, like unset EVM storage. Reading a
/// contract the snapshot knows nothing about is a transport failure.
///
/// Snapshot files are JSON objects of the form
/// `{ "<address>": { "<slot>": "<word>" } }` where slots are decimal or hex
/// and words are hex of up to 32 bytes (left-padded).
#[derive(Debug, Clone, Default)]
pub struct SnapshotProvider {
    storage: BTreeMap<(Address, U256), B256>,
    contracts: HashSet<Address>,
}

impl SnapshotProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a word.
    pub fn set(&mut self, contract: Address, slot: U256, word: B256) {
        self.contracts.insert(contract);
        self.storage.insert((contract, slot), word);
    }

    /// Builder-style [`SnapshotProvider::set`].
    pub fn with_word(mut self, contract: Address, slot: U256, word: B256) -> Self {
        self.set(contract, slot, word);
        self
    }

    /// Register a contract whose storage is entirely zero.
    pub fn with_contract(mut self, contract: Address) -> Self {
        self.contracts.insert(contract);
        self
    }

    /// Number of stored words.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Parse a snapshot document.
    pub fn from_json(json: &str) -> Result<Self, ProviderError> {
        let doc: HashMap<String, HashMap<String, String>> = serde_json::from_str(json)?;
        let mut provider = Self::new();
        for (contract, slots) in doc {
            let contract: Address = contract
                .parse()
                .map_err(|_| ProviderError::InvalidEntry(contract.clone()))?;
            provider.contracts.insert(contract);
            for (slot, word) in slots {
                let slot_number =
                    parse_slot(&slot).ok_or_else(|| ProviderError::InvalidEntry(slot.clone()))?;
                let word = parse_word(&word).ok_or(ProviderError::InvalidEntry(word))?;
                provider.set(contract, slot_number, word);
            }
        }
        Ok(provider)
    }

    /// Read and parse a snapshot file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[async_trait]
impl WordProvider for SnapshotProvider {
    async fn read_word(&self, contract: Address, slot: U256) -> Result<B256, ProviderError> {
        if !self.contracts.contains(&contract) {
            return Err(ProviderError::UnknownContract(contract));
        }
        Ok(self
            .storage
            .get(&(contract, slot))
            .copied()
            .unwrap_or(B256::ZERO))
    }
}

/// Parse hex of up to 32 bytes into a left-padded word.
pub fn parse_word(text: &str) -> Option<B256> {
    let digits = text.trim().strip_prefix("0x").unwrap_or(text.trim());
    let digits = if digits.len() % 2 == 1 {
        format!("0{digits}")
    } else {
        digits.to_string()
    };
    let bytes = hex::decode(digits).ok()?;
    if bytes.len() > WORD_SIZE {
        return None;
    }
    let mut word = [0u8; WORD_SIZE];
    word[WORD_SIZE - bytes.len()..].copy_from_slice(&bytes);
    Some(B256::from(word))
}
