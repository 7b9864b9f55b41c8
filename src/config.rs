//! Resolver configuration.
//!
//! A [`ResolverConfig`] is handed to [`crate::resolver::Resolver::new`] and stays
//! fixed for the life of that resolver. The CLI builds one from its flags.

use crate::constants::{DEFAULT_MAX_ARRAY_LENGTH, DEFAULT_MAX_CONCURRENT_READS};

/// How boolean storage values are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoolDecoding {
    /// Only the integer `1` is `true`; every other value is `false`.
    #[default]
    Strict,
    /// Any non-zero value is `true`.
    NonZero,
}

/// Settings for one resolver instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Upper bound on reads polled concurrently at one aggregation point (0 = unbounded).
    pub max_concurrent_reads: usize,
    /// Boolean interpretation rule.
    pub bool_decoding: BoolDecoding,
    /// Dynamic arrays longer than this are truncated to this many elements.
    pub max_array_length: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_concurrent_reads: DEFAULT_MAX_CONCURRENT_READS,
            bool_decoding: BoolDecoding::Strict,
            max_array_length: DEFAULT_MAX_ARRAY_LENGTH,
        }
    }
}

impl ResolverConfig {
    /// Config that treats any non-zero boolean word as `true`.
    pub fn lenient() -> Self {
        Self {
            bool_decoding: BoolDecoding::NonZero,
            ..Default::default()
        }
    }

    /// Effective in-flight limit for `count` pending operations.
    pub fn concurrency_for(&self, count: usize) -> usize {
        if self.max_concurrent_reads == 0 {
            count.max(1)
        } else {
            self.max_concurrent_reads.min(count.max(1))
        }
    }
}
