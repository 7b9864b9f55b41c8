//! Error types shared by the resolver, the codec and the word providers.

use alloy_primitives::{Address, U256};
use thiserror::Error;

/// Coarse classification of a [`ResolveError`].
///
/// The resolver uses the kind to decide how far a failure propagates: only a
/// [`ErrorKind::LayoutInconsistency`] at the top-level entry point fails a whole
/// request, everything else is contained at the slot, element or member that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A word read failed in the provider.
    TransportFailure,
    /// Type metadata is missing or malformed.
    LayoutInconsistency,
    /// A packed group does not fit into one word.
    SlotOverflow,
    /// The layout uses a construct this resolver does not decode.
    UnsupportedConstruct,
    /// A caller-supplied mapping key could not be used.
    InvalidKey,
}

/// Errors produced while resolving storage values
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The word provider could not read a slot
    #[error("failed to read slot {slot:#x} of {contract}: {source}")]
    Transport {
        /// Contract that was queried
        contract: Address,
        /// Slot that was queried
        slot: U256,
        /// Underlying provider failure
        #[source]
        source: ProviderError,
    },

    /// A type id is referenced but absent from the type table
    #[error("type `{0}` is not present in the layout type table")]
    UnknownType(String),

    /// A struct type carries no member list
    #[error("struct type `{0}` has no member metadata")]
    MissingMembers(String),

    /// A type entry is present but cannot be interpreted
    #[error("type `{type_id}` is malformed: {reason}")]
    MalformedType {
        /// Offending type id
        type_id: String,
        /// What is wrong with it
        reason: String,
    },

    /// Type nesting exceeds the configured depth
    #[error("type `{0}` nests deeper than the supported limit")]
    TypeTooDeep(String),

    /// No top-level variable has the requested label
    #[error("no storage variable named `{0}`")]
    UnknownVariable(String),

    /// Packed members of one slot add up to more than a word
    #[error("slot {slot} packs {total_bytes} bytes, more than one word")]
    SlotOverflow {
        /// Slot whose members overflow
        slot: String,
        /// Sum of member widths in bytes
        total_bytes: usize,
    },

    /// The construct is recognised but intentionally not decoded
    #[error("unsupported construct: {0}")]
    Unsupported(String),

    /// A mapping key could not be parsed or applied
    #[error("invalid mapping key `{key}`: {reason}")]
    InvalidKey {
        /// Key text as supplied
        key: String,
        /// Why the key was rejected
        reason: String,
    },
}

impl ResolveError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::TransportFailure,
            Self::UnknownType(_)
            | Self::MissingMembers(_)
            | Self::MalformedType { .. }
            | Self::TypeTooDeep(_)
            | Self::UnknownVariable(_) => ErrorKind::LayoutInconsistency,
            Self::SlotOverflow { .. } => ErrorKind::SlotOverflow,
            Self::Unsupported(_) => ErrorKind::UnsupportedConstruct,
            Self::InvalidKey { .. } => ErrorKind::InvalidKey,
        }
    }

    pub(crate) fn malformed(type_id: &str, reason: impl Into<String>) -> Self {
        Self::MalformedType {
            type_id: type_id.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_key(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by word providers
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider has no state for the requested contract
    #[error("no storage known for contract {0}")]
    UnknownContract(Address),

    /// The underlying transport failed
    #[error("transport error: {0}")]
    Transport(String),

    /// A storage snapshot could not be read from disk
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),

    /// A storage snapshot is not valid JSON
    #[error("failed to parse snapshot: {0}")]
    Json(#[from] serde_json::Error),

    /// A snapshot entry holds an unparsable address, slot or word
    #[error("invalid snapshot entry `{0}`")]
    InvalidEntry(String),
}

/// Errors raised while loading layout metadata
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The layout file could not be read
    #[error("failed to read layout: {0}")]
    Io(#[from] std::io::Error),

    /// The layout document is not valid layout JSON
    #[error("failed to parse layout: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let transport = ResolveError::Transport {
            contract: Address::ZERO,
            slot: U256::from(3),
            source: ProviderError::Transport("timeout".into()),
        };
        assert_eq!(transport.kind(), ErrorKind::TransportFailure);
        assert_eq!(
            ResolveError::UnknownType("t_foo".into()).kind(),
            ErrorKind::LayoutInconsistency
        );
        assert_eq!(
            ResolveError::MissingMembers("t_struct(A)1_storage".into()).kind(),
            ErrorKind::LayoutInconsistency
        );
        assert_eq!(
            ResolveError::SlotOverflow {
                slot: "4".into(),
                total_bytes: 40
            }
            .kind(),
            ErrorKind::SlotOverflow
        );
        assert_eq!(
            ResolveError::Unsupported("x".into()).kind(),
            ErrorKind::UnsupportedConstruct
        );
        assert_eq!(
            ResolveError::invalid_key("zz", "not hex").kind(),
            ErrorKind::InvalidKey
        );
    }

    #[test]
    fn test_transport_error_message_mentions_slot() {
        let err = ResolveError::Transport {
            contract: Address::ZERO,
            slot: U256::from(255),
            source: ProviderError::Transport("connection reset".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("ff"), "{msg}");
        assert!(msg.contains("connection reset"), "{msg}");
    }
}
