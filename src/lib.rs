//! # Storage Slot Resolver
//!
//! Reconstructs the values of a contract's state variables from raw storage
//! words, driven by the storage layout metadata the compiler emits.
//!
//! Given a layout and a [`provider::WordProvider`], a [`resolver::Resolver`]
//! works out which slots to read (packed scalars, dynamic arrays, mappings,
//! structs), reads them concurrently and decodes the words into typed
//! [`value::Value`]s. A failed read degrades only the position that needed it.

pub mod cache;
pub mod cli;
pub mod codec;
pub mod config;
pub mod constants;
pub mod errors;
pub mod layout;
pub mod output;
pub mod provider;
pub mod resolver;
pub mod slots;
pub mod unpack;
pub mod value;

pub use config::{BoolDecoding, ResolverConfig};
pub use errors::{ErrorKind, ProviderError, ResolveError};
pub use layout::StorageLayout;
pub use provider::WordProvider;
pub use resolver::{KeySet, Resolver};
pub use value::{SlotValue, Value};
