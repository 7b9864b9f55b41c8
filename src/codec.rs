//! Scalar decoding.
//!
//! Turns the bytes of one field of a storage word into a [`Value`]. Fields are
//! big-endian and right-aligned in the word; callers hand over exactly the
//! field's bytes.

use alloy_primitives::{Address, B256, U256};
use tracing::{debug, warn};

use crate::config::BoolDecoding;
use crate::constants::{ADDRESS_LENGTH, WORD_SIZE};
use crate::layout::ScalarKind;
use crate::value::Value;

/// Decode a field of at most 32 bytes.
pub fn decode(bytes: &[u8], kind: ScalarKind, bools: BoolDecoding) -> Value {
    let bytes = &bytes[bytes.len().saturating_sub(WORD_SIZE)..];
    match kind {
        ScalarKind::Uint => Value::Uint(U256::from_be_slice(bytes)),
        ScalarKind::Bool => Value::Bool(decode_bool(bytes, bools)),
        ScalarKind::Address => Value::Address(decode_address(bytes)),
        ScalarKind::FixedBytes => Value::Text(text_until_nul(bytes)),
        ScalarKind::String => Value::Text(decode_short_string(bytes)),
    }
}

/// Decode a whole word.
pub fn decode_word(word: &B256, kind: ScalarKind, bools: BoolDecoding) -> Value {
    decode(word.as_slice(), kind, bools)
}

fn decode_bool(bytes: &[u8], bools: BoolDecoding) -> bool {
    let value = U256::from_be_slice(bytes);
    match bools {
        BoolDecoding::NonZero => !value.is_zero(),
        BoolDecoding::Strict => {
            if value > U256::from(1) {
                warn!(%value, "non-canonical boolean decoded as false");
            }
            value == U256::from(1)
        }
    }
}

/// Right-aligned 20-byte address; shorter slices are left-padded.
fn decode_address(bytes: &[u8]) -> Address {
    let mut buf = [0u8; ADDRESS_LENGTH];
    let take = bytes.len().min(ADDRESS_LENGTH);
    buf[ADDRESS_LENGTH - take..].copy_from_slice(&bytes[bytes.len() - take..]);
    Address::from(buf)
}

/// `string` / `bytes` held in one slot.
///
/// A full word carries the short-form marker in its lowest byte: `len * 2` for
/// values of up to 31 bytes, `len * 2 + 1` when the data lives in hashed slots.
/// Long values are not followed and decode to the empty string.
fn decode_short_string(bytes: &[u8]) -> String {
    if bytes.len() != WORD_SIZE {
        return text_until_nul(bytes);
    }
    let marker = bytes[WORD_SIZE - 1];
    if marker & 1 == 1 {
        debug!(marker, "long-form string storage is not followed");
        return String::new();
    }
    let len = (marker / 2) as usize;
    if len < WORD_SIZE {
        text_until_nul(&bytes[..len])
    } else {
        text_until_nul(&bytes[..WORD_SIZE - 1])
    }
}

/// Lossy UTF-8 up to the first NUL byte.
fn text_until_nul(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    fn word_from_u64(n: u64) -> B256 {
        B256::from(U256::from(n).to_be_bytes())
    }

    fn string_word(s: &str) -> B256 {
        let mut word = [0u8; 32];
        word[..s.len()].copy_from_slice(s.as_bytes());
        word[31] = (s.len() * 2) as u8;
        B256::from(word)
    }

    #[test]
    fn test_one_decodes_across_kinds() {
        let one = word_from_u64(1);
        assert_eq!(
            decode_word(&one, ScalarKind::Uint, BoolDecoding::Strict),
            Value::Uint(U256::from(1))
        );
        assert_eq!(
            decode_word(&one, ScalarKind::Bool, BoolDecoding::Strict),
            Value::Bool(true)
        );
        assert_eq!(
            decode_word(&one, ScalarKind::Address, BoolDecoding::Strict).to_string(),
            "0x0000000000000000000000000000000000000001"
        );
    }

    #[test]
    fn test_uint_is_not_truncated() {
        assert_eq!(
            decode_word(&B256::repeat_byte(0xff), ScalarKind::Uint, BoolDecoding::Strict),
            Value::Uint(U256::MAX)
        );
        assert_eq!(
            decode(&[0x01, 0x00], ScalarKind::Uint, BoolDecoding::Strict),
            Value::Uint(U256::from(256))
        );
    }

    #[test]
    fn test_strict_and_lenient_bool() {
        let two = word_from_u64(2);
        assert_eq!(
            decode_word(&two, ScalarKind::Bool, BoolDecoding::Strict),
            Value::Bool(false)
        );
        assert_eq!(
            decode_word(&two, ScalarKind::Bool, BoolDecoding::NonZero),
            Value::Bool(true)
        );
        assert_eq!(
            decode_word(&B256::ZERO, ScalarKind::Bool, BoolDecoding::NonZero),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_address_is_low_twenty_bytes() {
        let a = address!("d8da6bf26964af9d7eed9e03e53415d37aa96045");
        let mut word = [0xeeu8; 32];
        word[12..].copy_from_slice(a.as_slice());
        assert_eq!(
            decode(&word, ScalarKind::Address, BoolDecoding::Strict),
            Value::Address(a)
        );
        assert_eq!(
            decode(a.as_slice(), ScalarKind::Address, BoolDecoding::Strict).to_string(),
            "0xd8da6bf26964af9d7eed9e03e53415d37aa96045"
        );
    }

    #[test]
    fn test_short_string() {
        assert_eq!(
            decode_word(&string_word("alice"), ScalarKind::String, BoolDecoding::Strict),
            Value::Text("alice".into())
        );
        assert_eq!(
            decode_word(&B256::ZERO, ScalarKind::String, BoolDecoding::Strict),
            Value::Text(String::new())
        );
    }

    #[test]
    fn test_thirty_one_byte_string() {
        let s = "abcdefghijklmnopqrstuvwxyz01234";
        assert_eq!(
            decode_word(&string_word(s), ScalarKind::String, BoolDecoding::Strict),
            Value::Text(s.into())
        );
    }

    #[test]
    fn test_long_string_marker_decodes_empty() {
        // 40-byte string: marker is 40 * 2 + 1, payload lives elsewhere
        let word = word_from_u64(81);
        assert_eq!(
            decode_word(&word, ScalarKind::String, BoolDecoding::Strict),
            Value::Text(String::new())
        );
    }

    #[test]
    fn test_fixed_bytes_truncate_at_nul() {
        let mut word = [0u8; 32];
        word[..3].copy_from_slice(b"abc");
        word[31] = 0x41;
        assert_eq!(
            decode(&word, ScalarKind::FixedBytes, BoolDecoding::Strict),
            Value::Text("abc".into())
        );
    }
}
