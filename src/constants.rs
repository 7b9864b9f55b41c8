/// Size of one storage word in bytes
pub const WORD_SIZE: usize = 32;
/// Ethereum address length (20 bytes)
pub const ADDRESS_LENGTH: usize = 20;
/// Elements at or below this byte width share a slot inside arrays
pub const MAX_PACKED_ELEMENT_SIZE: usize = 16;
/// Default number of word reads kept in flight by one aggregation point
pub const DEFAULT_MAX_CONCURRENT_READS: usize = 64;
/// Default cap on the number of elements read from one dynamic array
pub const DEFAULT_MAX_ARRAY_LENGTH: u64 = 4_096;
/// Deepest type nesting accepted when building descriptors
pub const MAX_TYPE_DEPTH: usize = 32;
