//! Per-session read cache for storage words.
//!
//! An in-memory LRU that sits in front of any [`WordProvider`]. Packed array
//! elements and struct members that share a slot hit the same word more than
//! once per resolution; the cache turns those repeats into one provider read.
//!
//! Architecture:
//! ```text
//!   Resolver
//!     → CachedProvider   (this module, in-memory LRU)
//!       → SnapshotProvider / GenesisProvider / node client
//! ```
//!
//! A cache lives as long as the `CachedProvider` wrapping it; build a fresh one
//! per resolution request so that no state outlives the session.

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::errors::ProviderError;
use crate::provider::WordProvider;

/// Configuration for the word cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of `(contract, slot) → word` entries held in RAM.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_entries: 1_024 }
    }
}

/// Snapshot of cache performance counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of reads that were satisfied from the cache.
    pub hits: u64,
    /// Number of reads that required a provider lookup.
    pub misses: u64,
    /// Number of entries evicted to make room for new ones.
    pub evictions: u64,
    /// Current number of entries in the cache.
    pub current_entries: usize,
    /// Maximum configured capacity.
    pub max_entries: usize,
}

impl CacheStats {
    /// Cache hit rate in the range `[0.0, 1.0]`.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// LRU cache mapping `(Address, slot) → B256`.
///
/// Front of `order` is least recently used, back is most recently used.
#[derive(Debug)]
pub struct WordCache {
    map: HashMap<(Address, U256), B256>,
    order: VecDeque<(Address, U256)>,
    max_entries: usize,
    stats: CacheStats,
}

impl WordCache {
    /// Create a new cache with the given capacity (at least one entry).
    pub fn new(max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            map: HashMap::with_capacity(max_entries),
            order: VecDeque::with_capacity(max_entries),
            max_entries,
            stats: CacheStats {
                max_entries,
                ..Default::default()
            },
        }
    }

    /// Look up a word. Updates LRU order on hit.
    pub fn get(&mut self, contract: Address, slot: U256) -> Option<B256> {
        let key = (contract, slot);
        if let Some(&word) = self.map.get(&key) {
            self.stats.hits += 1;
            self.touch(key);
            Some(word)
        } else {
            self.stats.misses += 1;
            None
        }
    }

    /// Insert or update a word. Evicts the LRU entry if at capacity.
    pub fn insert(&mut self, contract: Address, slot: U256, word: B256) {
        let key = (contract, slot);
        if self.map.insert(key, word).is_some() {
            self.touch(key);
        } else {
            if self.map.len() > self.max_entries {
                if let Some(lru) = self.order.pop_front() {
                    self.map.remove(&lru);
                    self.stats.evictions += 1;
                }
            }
            self.order.push_back(key);
        }
        self.stats.current_entries = self.map.len();
    }

    fn touch(&mut self, key: (Address, U256)) {
        if let Some(pos) = self.order.iter().position(|k| *k == key) {
            self.order.remove(pos);
            self.order.push_back(key);
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Snapshot of performance counters.
    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }
}

/// A [`WordProvider`] wrapper that serves repeated reads from a [`WordCache`].
///
/// Failed reads are not cached.
pub struct CachedProvider<P> {
    inner: P,
    cache: Mutex<WordCache>,
}

impl<P: WordProvider> CachedProvider<P> {
    /// Wrap `inner` with a new cache.
    pub fn new(inner: P, config: CacheConfig) -> Self {
        Self {
            inner,
            cache: Mutex::new(WordCache::new(config.max_entries)),
        }
    }

    /// Return a snapshot of cache performance counters.
    pub fn stats(&self) -> CacheStats {
        self.cache.lock().expect("cache lock poisoned").stats()
    }

    /// Borrow the inner provider.
    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: WordProvider> WordProvider for CachedProvider<P> {
    async fn read_word(&self, contract: Address, slot: U256) -> Result<B256, ProviderError> {
        // Fast path: the guard is dropped before awaiting the provider
        let cached = self
            .cache
            .lock()
            .expect("cache lock poisoned")
            .get(contract, slot);
        if let Some(word) = cached {
            return Ok(word);
        }
        let word = self.inner.read_word(contract, slot).await?;
        self.cache
            .lock()
            .expect("cache lock poisoned")
            .insert(contract, slot, word);
        Ok(word)
    }
}
