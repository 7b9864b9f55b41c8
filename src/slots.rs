//! Storage slot address derivation.
//!
//! The same rules the compiler uses to place data:
//!
//! ```text
//!   uint256[] values   at slot p:  length at p,  values[i] at keccak256(p) + i
//!   mapping(K => V) m  at slot p:  m[k] at keccak256(encode(k) ++ p)
//!   m[k1][k2]                   :  keccak256(encode(k2) ++ keccak256(encode(k1) ++ p))
//!   struct S s         at slot p:  member with relative slot r at p + r
//! ```
//!
//! All functions are pure; slot arithmetic wraps modulo 2^256 like the EVM.

use alloy_primitives::{Address, Keccak256, B256, U256};

use crate::constants::{MAX_PACKED_ELEMENT_SIZE, WORD_SIZE};
use crate::errors::ResolveError;
use crate::layout::descriptor::type_name;
use crate::layout::parse_slot;

/// How a mapping key type is encoded before hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Unsigned integers and enums.
    Uint,
    /// Signed integers (two's complement).
    Int,
    Bool,
    /// Addresses and contract references.
    Address,
    /// `bytesN`, right-padded.
    FixedBytes(usize),
    /// `string`, hashed unpadded.
    String,
    /// Dynamic `bytes`, hashed unpadded.
    Bytes,
}

impl KeyKind {
    /// Classify a mapping key type id.
    pub fn classify(type_id: &str) -> Option<Self> {
        let name = type_name(type_id);
        if name.starts_with("uint") || name.starts_with("enum") {
            Some(Self::Uint)
        } else if name.starts_with("int") {
            Some(Self::Int)
        } else if name == "bool" {
            Some(Self::Bool)
        } else if name.starts_with("address") || name.starts_with("contract") {
            Some(Self::Address)
        } else if name.starts_with("string") {
            Some(Self::String)
        } else if let Some(rest) = name.strip_prefix("bytes") {
            let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
            match digits.parse::<usize>() {
                Ok(n) if (1..=WORD_SIZE).contains(&n) => Some(Self::FixedBytes(n)),
                Ok(_) => None,
                Err(_) => Some(Self::Bytes),
            }
        } else {
            None
        }
    }
}

/// A mapping key in its pre-hash encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MappingKey(Vec<u8>);

impl MappingKey {
    /// A 32-byte big-endian integer key.
    pub fn from_u256(value: U256) -> Self {
        Self(B256::from(value.to_be_bytes()).to_vec())
    }

    /// An address key, left-padded to 32 bytes.
    pub fn from_address(address: Address) -> Self {
        let mut padded = [0u8; WORD_SIZE];
        padded[12..32].copy_from_slice(address.as_slice());
        Self(padded.to_vec())
    }

    pub fn from_bool(value: bool) -> Self {
        Self::from_u256(U256::from(value as u8))
    }

    /// A `bytesN` key, right-padded to 32 bytes.
    pub fn from_fixed_bytes(bytes: &[u8]) -> Self {
        let mut padded = [0u8; WORD_SIZE];
        let len = bytes.len().min(WORD_SIZE);
        padded[..len].copy_from_slice(&bytes[..len]);
        Self(padded.to_vec())
    }

    /// A `string` or `bytes` key, used unpadded.
    pub fn from_raw(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    /// Parse caller-supplied key text according to the key type.
    pub fn parse(kind: KeyKind, text: &str) -> Result<Self, ResolveError> {
        let text = text.trim();
        match kind {
            KeyKind::Uint => parse_slot(text)
                .map(Self::from_u256)
                .ok_or_else(|| ResolveError::invalid_key(text, "not an unsigned integer")),
            KeyKind::Int => {
                let (negative, digits) = match text.strip_prefix('-') {
                    Some(rest) => (true, rest),
                    None => (false, text),
                };
                let magnitude = parse_slot(digits)
                    .ok_or_else(|| ResolveError::invalid_key(text, "not an integer"))?;
                Ok(Self::from_u256(if negative {
                    magnitude.wrapping_neg()
                } else {
                    magnitude
                }))
            }
            KeyKind::Bool => match text {
                "true" | "1" => Ok(Self::from_bool(true)),
                "false" | "0" => Ok(Self::from_bool(false)),
                _ => Err(ResolveError::invalid_key(text, "not a boolean")),
            },
            KeyKind::Address => text
                .parse::<Address>()
                .map(Self::from_address)
                .map_err(|e| ResolveError::invalid_key(text, e.to_string())),
            KeyKind::FixedBytes(n) => {
                let bytes = decode_hex(text)?;
                if bytes.len() > n {
                    return Err(ResolveError::invalid_key(
                        text,
                        format!("longer than {n} bytes"),
                    ));
                }
                Ok(Self::from_fixed_bytes(&bytes))
            }
            KeyKind::String => Ok(Self::from_raw(text.as_bytes())),
            KeyKind::Bytes => {
                if text.starts_with("0x") {
                    Ok(Self::from_raw(&decode_hex(text)?))
                } else {
                    Ok(Self::from_raw(text.as_bytes()))
                }
            }
        }
    }

    /// The bytes hashed in front of the base slot.
    pub fn encoded(&self) -> &[u8] {
        &self.0
    }
}

fn decode_hex(text: &str) -> Result<Vec<u8>, ResolveError> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(digits).map_err(|e| ResolveError::invalid_key(text, e.to_string()))
}

/// Slot of `mapping[key]` for a mapping whose base slot is `base`.
pub fn mapping_slot(key: &MappingKey, base: U256) -> U256 {
    let mut hasher = Keccak256::new();
    hasher.update(key.encoded());
    hasher.update(B256::from(base.to_be_bytes()).as_slice());
    U256::from_be_bytes(hasher.finalize().0)
}

/// First data slot of a dynamic array declared at `declared`.
pub fn array_base_slot(declared: U256) -> U256 {
    let mut hasher = Keccak256::new();
    hasher.update(B256::from(declared.to_be_bytes()).as_slice());
    U256::from_be_bytes(hasher.finalize().0)
}

/// `slot + delta`, wrapping at 2^256.
pub fn next_slot(slot: U256, delta: u64) -> U256 {
    slot.wrapping_add(U256::from(delta))
}

/// Slot and low-end byte offset of element `index` of an array whose data starts at `base`.
///
/// Elements of up to 16 bytes are packed `32 / element_bytes` per slot; larger
/// elements occupy `ceil(element_bytes / 32)` whole slots each.
pub fn array_element_position(base: U256, index: u64, element_bytes: usize) -> (U256, usize) {
    if element_bytes > 0 && element_bytes <= MAX_PACKED_ELEMENT_SIZE {
        let per_slot = (WORD_SIZE / element_bytes) as u64;
        let slot = next_slot(base, index / per_slot);
        let offset = (index % per_slot) as usize * element_bytes;
        (slot, offset)
    } else {
        let stride = (element_bytes as u64).div_ceil(WORD_SIZE as u64).max(1);
        (base.wrapping_add(U256::from(index).wrapping_mul(U256::from(stride))), 0)
    }
}

/// Base slot of the struct at `index` of a dynamic array declared at `declared`.
pub fn struct_base_in_array(declared: U256, index: u64, slots_per_element: u64) -> U256 {
    array_base_slot(declared)
        .wrapping_add(U256::from(index).wrapping_mul(U256::from(slots_per_element)))
}

/// Base slot of the struct stored at `mapping[key]`.
pub fn struct_base_in_mapping(key: &MappingKey, base: U256) -> U256 {
    mapping_slot(key, base)
}
