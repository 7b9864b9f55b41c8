//! Compiler storage layout metadata.
//!
//! Mirrors the `storageLayout` section emitted by solc:
//!
//! ```text
//!   {
//!     "storage": [ { "label": "count", "slot": "0", "offset": 0, "type": "t_uint256" }, ... ],
//!     "types":   { "t_uint256": { "encoding": "inplace", "label": "uint256", "numberOfBytes": "32" }, ... }
//!   }
//! ```
//!
//! The layout is read-only once loaded. [`group_slots`] derives the
//! [`SlotGroup`]s used by the resolver, and [`descriptor`] turns the flat type
//! table into a tree that is parsed once per type.

pub mod descriptor;

pub use descriptor::{ArrayLength, Descriptor, Member, ScalarKind};

use alloy_primitives::U256;
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::errors::{LayoutError, ResolveError};

/// Type identifier as emitted by the compiler (e.g. `t_uint256`).
pub type TypeId = String;

/// One declared variable, at top level or inside a struct.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotEntry {
    pub label: String,
    #[serde(rename = "type")]
    pub type_id: TypeId,
    /// Decimal slot number (relative to the struct base for members).
    pub slot: String,
    /// Byte offset inside the slot, counted from the least-significant end.
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub ast_id: Option<u64>,
    #[serde(default)]
    pub contract: Option<String>,
}

impl SlotEntry {
    pub fn new(label: &str, type_id: &str, slot: &str, offset: usize) -> Self {
        Self {
            label: label.to_string(),
            type_id: type_id.to_string(),
            slot: slot.to_string(),
            offset,
            ast_id: None,
            contract: None,
        }
    }

    /// Parse the declared slot number.
    pub fn slot_number(&self) -> Result<U256, ResolveError> {
        parse_slot(&self.slot).ok_or_else(|| {
            ResolveError::malformed(&self.type_id, format!("slot `{}` of `{}` is not a number", self.slot, self.label))
        })
    }
}

/// Storage encoding of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    Inplace,
    Bytes,
    DynamicArray,
    Mapping,
}

/// Type table entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeInfo {
    pub encoding: Encoding,
    pub label: String,
    #[serde(deserialize_with = "deserialize_byte_count")]
    pub number_of_bytes: usize,
    /// Element type of arrays.
    #[serde(default)]
    pub base: Option<TypeId>,
    /// Key type of mappings.
    #[serde(default, alias = "keyType")]
    pub key: Option<TypeId>,
    /// Value type of mappings.
    #[serde(default, alias = "valueType")]
    pub value: Option<TypeId>,
    /// Struct members with struct-relative slots.
    #[serde(default)]
    pub members: Option<Vec<SlotEntry>>,
}

impl TypeInfo {
    /// Number of whole slots the type spans (at least one).
    pub fn slot_count(&self) -> u64 {
        (self.number_of_bytes as u64).div_ceil(32).max(1)
    }
}

/// A full contract layout: declared variables plus the type table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StorageLayout {
    #[serde(default)]
    pub storage: Vec<SlotEntry>,
    #[serde(default)]
    pub types: HashMap<TypeId, TypeInfo>,
}

impl StorageLayout {
    /// Parse a layout document.
    ///
    /// Accepts either the bare `{ storage, types }` object or any JSON object
    /// nesting it under a `storageLayout` key (compiler artifact output).
    pub fn from_json(json: &str) -> Result<Self, LayoutError> {
        let mut doc: serde_json::Value = serde_json::from_str(json)?;
        if let Some(inner) = doc.get_mut("storageLayout") {
            doc = inner.take();
        }
        // solc emits `"types": null` for contracts without state variables
        if doc.get("types").is_some_and(serde_json::Value::is_null) {
            if let Some(obj) = doc.as_object_mut() {
                obj.remove("types");
            }
        }
        Ok(serde_json::from_value(doc)?)
    }

    /// Read and parse a layout file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LayoutError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Look up a type by id.
    pub fn type_info(&self, type_id: &str) -> Result<&TypeInfo, ResolveError> {
        self.types
            .get(type_id)
            .ok_or_else(|| ResolveError::UnknownType(type_id.to_string()))
    }

    /// Find a top-level variable by label.
    pub fn variable(&self, label: &str) -> Result<&SlotEntry, ResolveError> {
        self.storage
            .iter()
            .find(|e| e.label == label)
            .ok_or_else(|| ResolveError::UnknownVariable(label.to_string()))
    }
}

/// Variables sharing one physical slot, ordered by ascending offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotGroup {
    pub slot: U256,
    pub entries: Vec<SlotEntry>,
}

impl SlotGroup {
    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.label.clone()).collect()
    }
}

/// Group entries by slot number, ascending; entries within a group by offset.
pub fn group_slots(entries: &[SlotEntry]) -> Result<Vec<SlotGroup>, ResolveError> {
    let mut groups: BTreeMap<U256, Vec<SlotEntry>> = BTreeMap::new();
    for entry in entries {
        groups
            .entry(entry.slot_number()?)
            .or_default()
            .push(entry.clone());
    }
    Ok(groups
        .into_iter()
        .map(|(slot, mut entries)| {
            entries.sort_by_key(|e| e.offset);
            SlotGroup { slot, entries }
        })
        .collect())
}

/// Parse a slot number given in decimal or `0x` hex.
pub fn parse_slot(text: &str) -> Option<U256> {
    let text = text.trim();
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => U256::from_str_radix(hex, 16).ok(),
        None => U256::from_str_radix(text, 10).ok(),
    }
}

fn deserialize_byte_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ByteCount {
        Number(usize),
        Text(String),
    }

    match ByteCount::deserialize(deserializer)? {
        ByteCount::Number(n) => Ok(n),
        ByteCount::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
