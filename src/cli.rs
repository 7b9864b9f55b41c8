use alloy_primitives::Address;
use clap::{ArgGroup, Parser};
use std::path::PathBuf;

use crate::cache::CacheConfig;
use crate::config::{BoolDecoding, ResolverConfig};
use crate::constants::{DEFAULT_MAX_ARRAY_LENGTH, DEFAULT_MAX_CONCURRENT_READS};
use crate::resolver::KeySet;

/// CLI arguments for the storage slot scanner
#[derive(Parser, Debug)]
#[command(
    name = "slotscan",
    about = "Resolve contract storage variables from a compiler storage layout",
    group(ArgGroup::new("source").required(true).args(["snapshot", "genesis"]))
)]
pub struct Cli {
    /// Storage layout JSON (`storageLayout` output of solc, or a full artifact)
    #[arg(long)]
    pub layout: PathBuf,

    /// Storage snapshot JSON: `{ "<address>": { "<slot>": "<word>" } }`
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Genesis JSON whose `alloc` holds the contract's storage
    #[arg(long)]
    pub genesis: Option<PathBuf>,

    /// Address of the contract to scan
    #[arg(long)]
    pub contract: Address,

    /// Resolve only this top-level variable.
    #[arg(long)]
    pub variable: Option<String>,

    /// Mapping key path, as `label=key1,key2`. Repeat for several entries.
    ///
    /// Keys are given outermost first. Integers accept decimal or `0x` hex,
    /// negative values for signed keys; `bytesN` keys are hex.
    #[arg(long = "key", value_name = "LABEL=KEYS")]
    pub keys: Vec<String>,

    /// Print the result as JSON instead of coloured text.
    #[arg(long)]
    pub json: bool,

    /// Maximum number of storage reads in flight at one aggregation point.
    ///
    /// Set to 0 for unlimited.
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT_READS)]
    pub max_concurrent_reads: usize,

    /// Treat any non-zero boolean word as `true` (default: only `1` is `true`).
    #[arg(long)]
    pub lenient_bool: bool,

    /// Maximum number of words held in the read cache.
    /// Set to 0 to disable caching.
    #[arg(long, default_value = "1024")]
    pub cache_size: usize,

    /// Dynamic and static arrays longer than this are truncated.
    #[arg(long, default_value_t = DEFAULT_MAX_ARRAY_LENGTH)]
    pub max_array_length: u64,
}

impl Cli {
    /// Resolver settings from the command line flags.
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            max_concurrent_reads: self.max_concurrent_reads,
            bool_decoding: if self.lenient_bool {
                BoolDecoding::NonZero
            } else {
                BoolDecoding::Strict
            },
            max_array_length: self.max_array_length,
        }
    }

    /// Cache settings, or `None` when caching is disabled.
    pub fn cache_config(&self) -> Option<CacheConfig> {
        (self.cache_size > 0).then(|| CacheConfig {
            max_entries: self.cache_size,
        })
    }

    /// Mapping key paths from the repeated `--key` flags.
    pub fn key_set(&self) -> Result<KeySet, String> {
        KeySet::from_args(&self.keys)
    }
}
