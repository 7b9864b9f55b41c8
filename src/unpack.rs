//! Packed slot decoding.
//!
//! Variables declared next to each other share a word when they fit. The
//! first-declared one takes the least-significant bytes:
//!
//! ```text
//!   uint8 a; uint8 b;   at slot 3, word 0x…0203
//!                                          ^^ a = 3
//!                                        ^^   b = 2
//! ```

use alloy_primitives::B256;

use crate::codec;
use crate::config::BoolDecoding;
use crate::constants::WORD_SIZE;
use crate::errors::ResolveError;
use crate::layout::ScalarKind;
use crate::value::Value;

/// One scalar field of a packed word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedField {
    pub kind: ScalarKind,
    /// Width in bytes.
    pub width: usize,
}

impl PackedField {
    pub fn new(kind: ScalarKind, width: usize) -> Self {
        Self { kind, width }
    }
}

/// Decode `fields` from `word` in declaration order, low-order bytes first.
///
/// `slot` only labels the overflow error.
pub fn unpack(
    word: &B256,
    fields: &[PackedField],
    bools: BoolDecoding,
    slot: &str,
) -> Result<Vec<Value>, ResolveError> {
    let total_bytes: usize = fields.iter().map(|f| f.width).sum();
    if total_bytes > WORD_SIZE {
        return Err(ResolveError::SlotOverflow {
            slot: slot.to_string(),
            total_bytes,
        });
    }

    let bytes = word.as_slice();
    let mut cursor = WORD_SIZE;
    let mut values = Vec::with_capacity(fields.len());
    for field in fields {
        cursor -= field.width;
        values.push(codec::decode(
            &bytes[cursor..cursor + field.width],
            field.kind,
            bools,
        ));
    }
    Ok(values)
}

/// Bytes of the `width`-byte field that starts `offset` bytes from the low end.
pub fn slice_at_offset<'w>(
    word: &'w B256,
    offset: usize,
    width: usize,
    slot: &str,
) -> Result<&'w [u8], ResolveError> {
    let end = match offset.checked_add(width) {
        Some(end) if end <= WORD_SIZE => end,
        end => {
            return Err(ResolveError::SlotOverflow {
                slot: slot.to_string(),
                total_bytes: end.unwrap_or(usize::MAX),
            })
        }
    };
    Ok(&word.as_slice()[WORD_SIZE - end..WORD_SIZE - offset])
}
