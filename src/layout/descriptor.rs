//! Type descriptor trees.
//!
//! The compiler's type table is flat and refers to nested types by id. A
//! [`Descriptor`] is the same information resolved into a tree once, so the
//! resolver can pattern-match on it instead of re-reading type ids at every
//! level.
//!
//! ```text
//!   t_mapping(t_address,t_struct(User)12_storage)
//!     → Mapping { key: Address, value: Struct { members: [name: Scalar, age: Scalar] } }
//! ```

use alloy_primitives::U256;
use std::collections::HashMap;

use super::{Encoding, TypeId, TypeInfo};
use crate::constants::MAX_TYPE_DEPTH;
use crate::errors::ResolveError;
use crate::slots::KeyKind;

/// Scalar value categories the codec can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// Unsigned integers and enums.
    Uint,
    Bool,
    /// Addresses and contract references.
    Address,
    /// `bytesN`, read as NUL-terminated text.
    FixedBytes,
    /// `string` and `bytes` in their short in-slot form.
    String,
}

impl ScalarKind {
    /// Classify an inplace or `bytes` type id.
    ///
    /// Returns `None` for types outside the supported scalar set.
    pub fn classify(type_id: &str) -> Option<Self> {
        let name = type_name(type_id);
        if name.starts_with("uint") || name.starts_with("enum") {
            Some(Self::Uint)
        } else if name == "bool" {
            Some(Self::Bool)
        } else if name.starts_with("address") || name.starts_with("contract") {
            Some(Self::Address)
        } else if name.starts_with("string") {
            Some(Self::String)
        } else if let Some(rest) = name.strip_prefix("bytes") {
            if rest.starts_with(|c: char| c.is_ascii_digit()) {
                Some(Self::FixedBytes)
            } else {
                Some(Self::String)
            }
        } else {
            None
        }
    }
}

/// Strip the `t_` prefix from a type id.
pub(crate) fn type_name(type_id: &str) -> &str {
    type_id.strip_prefix("t_").unwrap_or(type_id)
}

/// Length of an array type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayLength {
    /// Length stored at the declared slot, elements at `keccak256(slot)`.
    Dynamic,
    /// Length fixed by the type, elements start at the declared slot.
    Fixed(u64),
}

/// One struct member with its struct-relative position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub label: String,
    /// Slot offset from the struct base.
    pub slot: U256,
    /// Byte offset inside that slot.
    pub offset: usize,
    pub descriptor: Descriptor,
}

/// A type resolved into a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    Scalar {
        type_id: TypeId,
        kind: ScalarKind,
        /// Width in bytes.
        width: usize,
    },
    Array {
        type_id: TypeId,
        element: Box<Descriptor>,
        length: ArrayLength,
        /// Element width in bytes; drives packing and stride.
        element_bytes: usize,
    },
    Mapping {
        type_id: TypeId,
        key: KeyKind,
        value: Box<Descriptor>,
    },
    Struct {
        type_id: TypeId,
        members: Vec<Member>,
        /// Slots occupied by one instance.
        slot_count: u64,
    },
    /// Recognised but not decoded (signed integers, arrays inside structs, ...).
    Deferred { type_id: TypeId, reason: String },
    /// Nested type metadata that could not be built; fails only its own position.
    Broken { type_id: TypeId, reason: String },
}

impl Descriptor {
    /// Build the descriptor for a top-level type.
    ///
    /// Errors at this level (unknown id, struct without members) are returned;
    /// errors in nested types are recorded as [`Descriptor::Broken`] so that only
    /// the affected sub-resolution fails.
    pub fn build(types: &HashMap<TypeId, TypeInfo>, type_id: &str) -> Result<Self, ResolveError> {
        Builder { types }.build(type_id, 0, false)
    }

    pub fn type_id(&self) -> &str {
        match self {
            Descriptor::Scalar { type_id, .. }
            | Descriptor::Array { type_id, .. }
            | Descriptor::Mapping { type_id, .. }
            | Descriptor::Struct { type_id, .. }
            | Descriptor::Deferred { type_id, .. }
            | Descriptor::Broken { type_id, .. } => type_id,
        }
    }

    /// Number of slots one value of this type occupies when stored inline.
    pub fn slot_count(&self) -> u64 {
        match self {
            Descriptor::Struct { slot_count, .. } => *slot_count,
            Descriptor::Array {
                length: ArrayLength::Fixed(n),
                element,
                element_bytes,
                ..
            } => fixed_array_slots(*n, element, *element_bytes),
            _ => 1,
        }
    }

    /// Width in bytes when stored inline.
    pub fn width(&self) -> usize {
        match self {
            Descriptor::Scalar { width, .. } => *width,
            other => (other.slot_count() as usize).saturating_mul(32),
        }
    }
}

/// Slots used by a fixed array of `n` elements.
fn fixed_array_slots(n: u64, element: &Descriptor, element_bytes: usize) -> u64 {
    if element_bytes > 0 && element_bytes <= 16 && matches!(element, Descriptor::Scalar { .. }) {
        let per_slot = (32 / element_bytes) as u64;
        n.div_ceil(per_slot).max(1)
    } else {
        n.saturating_mul(element.slot_count()).max(1)
    }
}

struct Builder<'a> {
    types: &'a HashMap<TypeId, TypeInfo>,
}

impl Builder<'_> {
    fn build(&self, type_id: &str, depth: usize, in_struct: bool) -> Result<Descriptor, ResolveError> {
        if depth > MAX_TYPE_DEPTH {
            return Err(ResolveError::TypeTooDeep(type_id.to_string()));
        }
        let info = self
            .types
            .get(type_id)
            .ok_or_else(|| ResolveError::UnknownType(type_id.to_string()))?;

        match info.encoding {
            Encoding::Mapping | Encoding::DynamicArray if in_struct => Ok(Descriptor::Deferred {
                type_id: type_id.to_string(),
                reason: format!("{} member inside a struct", info.label),
            }),
            Encoding::Mapping => self.mapping(type_id, info, depth),
            Encoding::DynamicArray => self.array(type_id, info, ArrayLength::Dynamic, depth),
            Encoding::Bytes => Ok(self.scalar(type_id, info)),
            Encoding::Inplace => {
                if info.members.is_some() || type_name(type_id).starts_with("struct") {
                    self.structure(type_id, info, depth)
                } else if type_name(type_id).starts_with("array") {
                    if in_struct {
                        return Ok(Descriptor::Deferred {
                            type_id: type_id.to_string(),
                            reason: format!("{} member inside a struct", info.label),
                        });
                    }
                    let length = fixed_length(&info.label).ok_or_else(|| {
                        ResolveError::malformed(type_id, "static array label carries no length")
                    })?;
                    self.array(type_id, info, ArrayLength::Fixed(length), depth)
                } else {
                    Ok(self.scalar(type_id, info))
                }
            }
        }
    }

    /// Build a nested type, turning failures into a `Broken` node.
    fn child(&self, type_id: &str, depth: usize, in_struct: bool) -> Descriptor {
        self.build(type_id, depth + 1, in_struct)
            .unwrap_or_else(|err| Descriptor::Broken {
                type_id: type_id.to_string(),
                reason: err.to_string(),
            })
    }

    fn scalar(&self, type_id: &str, info: &TypeInfo) -> Descriptor {
        match ScalarKind::classify(type_id) {
            Some(kind) => Descriptor::Scalar {
                type_id: type_id.to_string(),
                kind,
                width: info.number_of_bytes.clamp(1, 32),
            },
            None => Descriptor::Deferred {
                type_id: type_id.to_string(),
                reason: format!("value type `{}` is not decoded", info.label),
            },
        }
    }

    fn mapping(&self, type_id: &str, info: &TypeInfo, depth: usize) -> Result<Descriptor, ResolveError> {
        let key_id = info
            .key
            .as_deref()
            .ok_or_else(|| ResolveError::malformed(type_id, "mapping has no key type"))?;
        let value_id = info
            .value
            .as_deref()
            .ok_or_else(|| ResolveError::malformed(type_id, "mapping has no value type"))?;
        let key = match KeyKind::classify(key_id) {
            Some(key) => key,
            None => {
                return Ok(Descriptor::Deferred {
                    type_id: type_id.to_string(),
                    reason: format!("mapping key type `{key_id}` is not supported"),
                })
            }
        };
        Ok(Descriptor::Mapping {
            type_id: type_id.to_string(),
            key,
            value: Box::new(self.child(value_id, depth, false)),
        })
    }

    fn array(
        &self,
        type_id: &str,
        info: &TypeInfo,
        length: ArrayLength,
        depth: usize,
    ) -> Result<Descriptor, ResolveError> {
        let base_id = info
            .base
            .as_deref()
            .ok_or_else(|| ResolveError::malformed(type_id, "array has no base type"))?;
        let element = self.child(base_id, depth, false);
        let element_bytes = match &element {
            Descriptor::Scalar { width, .. } => *width,
            // Dynamic arrays, mappings and strings take a full slot of their own
            Descriptor::Array {
                length: ArrayLength::Dynamic,
                ..
            }
            | Descriptor::Mapping { .. } => 32,
            _ => self
                .types
                .get(base_id)
                .map(|t| t.number_of_bytes.max(1))
                .unwrap_or(32),
        };
        Ok(Descriptor::Array {
            type_id: type_id.to_string(),
            element: Box::new(element),
            length,
            element_bytes,
        })
    }

    fn structure(&self, type_id: &str, info: &TypeInfo, depth: usize) -> Result<Descriptor, ResolveError> {
        let entries = info
            .members
            .as_ref()
            .ok_or_else(|| ResolveError::MissingMembers(type_id.to_string()))?;
        let mut members = Vec::with_capacity(entries.len());
        for entry in entries {
            members.push(Member {
                label: entry.label.clone(),
                slot: entry.slot_number()?,
                offset: entry.offset,
                descriptor: self.child(&entry.type_id, depth, true),
            });
        }
        Ok(Descriptor::Struct {
            type_id: type_id.to_string(),
            members,
            slot_count: info.slot_count(),
        })
    }
}

/// Extract `N` from a label ending in `[N]`.
fn fixed_length(label: &str) -> Option<u64> {
    let inner = label.strip_suffix(']')?;
    let open = inner.rfind('[')?;
    inner[open + 1..].parse().ok()
}
