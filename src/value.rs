//! Decoded storage values.
//!
//! A [`Value`] mirrors the shape of the declared type: scalars are leaves,
//! arrays become [`Value::List`], structs and packed slots carry their member
//! labels, and mappings list one [`MappingEntry`] per key path that was asked for.

use alloy_primitives::{Address, U256};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;

/// Lowercase, `0x`-prefixed hex rendering of an address (no checksum).
pub fn address_hex(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_slice()))
}

/// A decoded storage value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Unsigned integer (also enums).
    Uint(U256),
    /// Boolean.
    Bool(bool),
    /// Address or contract reference.
    Address(Address),
    /// Short string or bytes, NUL-truncated.
    Text(String),
    /// A mapping reference found where a value was expected.
    NotAValue,
    /// A mapping entry whose storage is all zero (indistinguishable from unset).
    Absent,
    /// Placeholder for a position whose resolution failed.
    Empty,
    /// A construct that is recognised but deliberately not decoded.
    Skipped(String),
    /// Array elements in index order.
    List(Vec<Value>),
    /// Variables packed into one slot, in declaration order.
    Packed(Vec<Labeled>),
    /// Struct members in declaration order.
    Struct(Vec<Labeled>),
    /// Mapping entries for the key paths that were supplied.
    Mapping(Vec<MappingEntry>),
}

/// A value tagged with the variable or member label it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Labeled {
    pub label: String,
    pub value: Value,
}

impl Labeled {
    pub fn new(label: impl Into<String>, value: Value) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// One looked-up mapping entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingEntry {
    /// Keys from the outermost mapping inwards.
    pub keys: Vec<String>,
    pub value: Value,
}

/// The resolved content of one distinct top-level slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotValue {
    /// Declared slot number.
    #[serde(serialize_with = "serialize_decimal")]
    pub slot: U256,
    /// Labels of the variables stored in this slot, in declaration order.
    pub labels: Vec<String>,
    pub value: Value,
}

impl Value {
    /// Whether the value carries no information beyond "storage is zero".
    ///
    /// Failed positions ([`Value::Empty`]) are never considered zero so that a
    /// transport error is not reported as an unset entry.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Uint(v) => v.is_zero(),
            Value::Bool(b) => !b,
            Value::Address(a) => a.is_zero(),
            Value::Text(s) => s.is_empty(),
            Value::NotAValue | Value::Absent | Value::Skipped(_) | Value::Mapping(_) => true,
            Value::Empty => false,
            Value::List(items) => items.iter().all(Value::is_zero),
            Value::Packed(members) | Value::Struct(members) => {
                members.iter().all(|m| m.value.is_zero())
            }
        }
    }

    /// Whether this is the failure placeholder.
    pub fn is_empty_placeholder(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// The integer payload, if this is a [`Value::Uint`].
    pub fn as_uint(&self) -> Option<U256> {
        match self {
            Value::Uint(v) => Some(*v),
            _ => None,
        }
    }

    /// Look up a member of a struct or packed slot by label.
    pub fn member(&self, label: &str) -> Option<&Value> {
        match self {
            Value::Packed(members) | Value::Struct(members) => members
                .iter()
                .find(|m| m.label == label)
                .map(|m| &m.value),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Uint(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Address(a) => f.write_str(&address_hex(a)),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::NotAValue => f.write_str("<mapping>"),
            Value::Absent => f.write_str("<unset>"),
            Value::Empty => f.write_str("<unavailable>"),
            Value::Skipped(reason) => write!(f, "<skipped: {reason}>"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Packed(members) | Value::Struct(members) => {
                f.write_str("{")?;
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", m.label, m.value)?;
                }
                f.write_str("}")
            }
            Value::Mapping(entries) => {
                f.write_str("{")?;
                for (i, e) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    for key in &e.keys {
                        write!(f, "[{key}]")?;
                    }
                    write!(f, " => {}", e.value)?;
                }
                f.write_str("}")
            }
        }
    }
}

// Integers are emitted as decimal strings so 256-bit values survive JSON.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Uint(v) => serializer.serialize_str(&v.to_string()),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Address(a) => serializer.serialize_str(&address_hex(a)),
            Value::Text(s) => serializer.serialize_str(s),
            Value::NotAValue => marker(serializer, "notAValue", None),
            Value::Absent => serializer.serialize_none(),
            Value::Empty => marker(serializer, "unavailable", None),
            Value::Skipped(reason) => marker(serializer, "skipped", Some(reason)),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Packed(members) | Value::Struct(members) => {
                let mut map = serializer.serialize_map(Some(members.len()))?;
                for m in members {
                    map.serialize_entry(&m.label, &m.value)?;
                }
                map.end()
            }
            Value::Mapping(entries) => {
                let mut seq = serializer.serialize_seq(Some(entries.len()))?;
                for e in entries {
                    seq.serialize_element(e)?;
                }
                seq.end()
            }
        }
    }
}

fn marker<S: Serializer>(
    serializer: S,
    kind: &str,
    reason: Option<&String>,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(None)?;
    map.serialize_entry("kind", kind)?;
    if let Some(reason) = reason {
        map.serialize_entry("reason", reason)?;
    }
    map.end()
}

fn serialize_decimal<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}
