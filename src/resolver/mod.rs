//! Composite value resolution.
//!
//! The [`Resolver`] walks a variable's [`Descriptor`] and decides, at every
//! level, which slot to read next:
//!
//! ```text
//!   Scalar        read one word at the slot, slice by offset, decode
//!   Packed group  read one word, unpack every co-resident scalar
//!   Array         read length (dynamic only), then every element at base + i
//!   Mapping       hash each caller key into the slot, resolve the value there
//!   Struct        resolve each member group at base + relative slot
//! ```
//!
//! Reads that do not depend on each other are issued together through
//! [`aggregate`]; only an array's length is awaited before its elements.
//! Failures stay at the position that produced them and surface as
//! placeholder values, except for a broken top-level type, which fails the
//! whole request.

pub mod aggregate;
pub mod keys;

pub use aggregate::{fetch_all, placeholder, settle_all};
pub use keys::KeySet;

use alloy_primitives::{Address, B256, U256};
use futures_util::future::{BoxFuture, FutureExt};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::codec;
use crate::config::ResolverConfig;
use crate::errors::ResolveError;
use crate::constants::{MAX_PACKED_ELEMENT_SIZE, WORD_SIZE};
use crate::layout::{group_slots, ArrayLength, Descriptor, Member, ScalarKind, SlotGroup, StorageLayout};
use crate::provider::WordProvider;
use crate::slots::{
    array_base_slot, array_element_position, mapping_slot, next_slot, struct_base_in_array,
    struct_base_in_mapping, MappingKey,
};
use crate::unpack::{slice_at_offset, unpack, PackedField};
use crate::value::{Labeled, MappingEntry, SlotValue, Value};

/// Resolves storage variables of one contract.
///
/// Holds the word provider, the contract address, the layout and the config;
/// nothing else is kept between calls.
pub struct Resolver<P> {
    provider: P,
    contract: Address,
    layout: StorageLayout,
    config: ResolverConfig,
}

/// A co-resident field of a packed word.
struct PackedSlotMember<'a> {
    label: &'a str,
    descriptor: &'a Descriptor,
    offset: usize,
}

impl<P: WordProvider> Resolver<P> {
    pub fn new(provider: P, contract: Address, layout: StorageLayout, config: ResolverConfig) -> Self {
        Self {
            provider,
            contract,
            layout,
            config,
        }
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Top-level slot groups in ascending slot order.
    pub fn slot_groups(&self) -> Result<Vec<SlotGroup>, ResolveError> {
        group_slots(&self.layout.storage)
    }

    /// Resolve every declared variable.
    ///
    /// Returns one [`SlotValue`] per distinct slot. Packed slots collapse into a
    /// single [`Value::Packed`]; mapping variables list the entries named in
    /// `keys`. Fails only if a top-level variable's type cannot be built.
    pub async fn resolve_all(&self, keys: &KeySet) -> Result<Vec<SlotValue>, ResolveError> {
        let groups = self.slot_groups()?;
        let mut plans = Vec::with_capacity(groups.len());
        for group in &groups {
            let descriptors = group
                .entries
                .iter()
                .map(|entry| Descriptor::build(&self.layout.types, &entry.type_id))
                .collect::<Result<Vec<_>, _>>()?;
            plans.push((group, descriptors));
        }
        debug!(contract = %self.contract, slots = plans.len(), "resolving storage layout");

        let ops = plans
            .iter()
            .map(|(group, descriptors)| self.resolve_group(group, descriptors, keys));
        let values = fetch_all(ops, self.config.concurrency_for(plans.len())).await;

        Ok(plans
            .iter()
            .zip(values)
            .map(|((group, _), value)| SlotValue {
                slot: group.slot,
                labels: group.labels(),
                value,
            })
            .collect())
    }

    /// Resolve one top-level variable by label.
    pub async fn resolve_variable(&self, label: &str, keys: &KeySet) -> Result<Value, ResolveError> {
        let entry = self.layout.variable(label)?;
        let descriptor = Descriptor::build(&self.layout.types, &entry.type_id)?;
        let slot = entry.slot_number()?;
        self.resolve_at(&descriptor, slot, entry.offset, Some(keys.paths(label)))
            .await
    }

    /// Resolve the given key paths of a top-level mapping.
    pub async fn resolve_mapping(&self, label: &str, paths: &[Vec<String>]) -> Result<Value, ResolveError> {
        let entry = self.layout.variable(label)?;
        let descriptor = Descriptor::build(&self.layout.types, &entry.type_id)?;
        if !matches!(descriptor, Descriptor::Mapping { .. }) {
            return Err(ResolveError::malformed(
                &entry.type_id,
                format!("`{label}` is not a mapping"),
            ));
        }
        let slot = entry.slot_number()?;
        self.resolve_at(&descriptor, slot, 0, Some(paths)).await
    }

    async fn read(&self, slot: U256) -> Result<B256, ResolveError> {
        debug!(contract = %self.contract, %slot, "reading storage word");
        self.provider
            .read_word(self.contract, slot)
            .await
            .map_err(|source| ResolveError::Transport {
                contract: self.contract,
                slot,
                source,
            })
    }

    async fn resolve_group(
        &self,
        group: &SlotGroup,
        descriptors: &[Descriptor],
        keys: &KeySet,
    ) -> Result<Value, ResolveError> {
        if let ([entry], [descriptor]) = (group.entries.as_slice(), descriptors) {
            return self
                .resolve_at(descriptor, group.slot, entry.offset, Some(keys.paths(&entry.label)))
                .await;
        }
        let members: Vec<PackedSlotMember<'_>> = group
            .entries
            .iter()
            .zip(descriptors)
            .map(|(entry, descriptor)| PackedSlotMember {
                label: &entry.label,
                descriptor,
                offset: entry.offset,
            })
            .collect();
        let word = self.read(group.slot).await?;
        Ok(Value::Packed(self.decode_packed(&word, &members, group.slot)?))
    }

    /// Resolve `descriptor` stored at `slot`, `offset` bytes from the low end.
    ///
    /// `keys` is `Some` only for top-level variables; a mapping reached without
    /// keys (e.g. as an array element) is not a value.
    fn resolve_at<'a>(
        &'a self,
        descriptor: &'a Descriptor,
        slot: U256,
        offset: usize,
        keys: Option<&'a [Vec<String>]>,
    ) -> BoxFuture<'a, Result<Value, ResolveError>> {
        async move {
            match descriptor {
                Descriptor::Scalar { kind, width, .. } => {
                    let word = self.read(slot).await?;
                    let bytes = slice_at_offset(&word, offset, *width, &slot.to_string())?;
                    Ok(codec::decode(bytes, *kind, self.config.bool_decoding))
                }
                Descriptor::Array {
                    element,
                    length,
                    element_bytes,
                    ..
                } => self.resolve_array(element, *length, *element_bytes, slot).await,
                Descriptor::Mapping { .. } => match keys {
                    Some(paths) => self.resolve_mapping_entries(descriptor, slot, paths).await,
                    None => Ok(Value::NotAValue),
                },
                Descriptor::Struct { members, .. } => self.resolve_struct(members, slot).await,
                Descriptor::Deferred { reason, .. } => Ok(Value::Skipped(reason.clone())),
                Descriptor::Broken { type_id, reason } => {
                    Err(ResolveError::malformed(type_id, reason.clone()))
                }
            }
        }
        .boxed()
    }

    async fn resolve_array(
        &self,
        element: &Descriptor,
        length: ArrayLength,
        element_bytes: usize,
        declared: U256,
    ) -> Result<Value, ResolveError> {
        let (base, len) = match length {
            ArrayLength::Dynamic => {
                let word = self.read(declared).await?;
                let len = U256::from_be_bytes(word.0);
                if len.is_zero() {
                    return Ok(Value::List(Vec::new()));
                }
                (array_base_slot(declared), self.clamp_length(len, declared))
            }
            ArrayLength::Fixed(n) => (declared, self.clamp_length(U256::from(n), declared)),
        };

        if let Descriptor::Scalar { kind, width, .. } = element {
            if element_bytes <= MAX_PACKED_ELEMENT_SIZE {
                return Ok(Value::List(
                    self.resolve_packed_elements(*kind, *width, element_bytes, base, len)
                        .await,
                ));
            }
        }

        let ops = (0..len).map(move |index| {
            let (slot, offset) = match (length, element) {
                (ArrayLength::Dynamic, Descriptor::Struct { slot_count, .. }) => {
                    (struct_base_in_array(declared, index, *slot_count), 0)
                }
                _ => array_element_position(base, index, element_bytes),
            };
            self.resolve_at(element, slot, offset, None)
        });
        let limit = self.config.concurrency_for(len as usize);
        Ok(Value::List(fetch_all(ops, limit).await))
    }

    /// Elements of at most 16 bytes share words; read each word once and slice it.
    async fn resolve_packed_elements(
        &self,
        kind: ScalarKind,
        width: usize,
        element_bytes: usize,
        base: U256,
        len: u64,
    ) -> Vec<Value> {
        let per_slot = (WORD_SIZE / element_bytes) as u64;
        let words = len.div_ceil(per_slot);
        let ops = (0..words).map(move |word_index| async move {
            let slot = next_slot(base, word_index);
            let word = self.read(slot).await?;
            let slot_label = slot.to_string();
            let first = word_index * per_slot;
            (first..len.min(first + per_slot))
                .map(|index| {
                    let (_, offset) = array_element_position(base, index, element_bytes);
                    let bytes = slice_at_offset(&word, offset, width, &slot_label)?;
                    Ok(codec::decode(bytes, kind, self.config.bool_decoding))
                })
                .collect::<Result<Vec<_>, ResolveError>>()
        });
        let outcomes = settle_all(ops, self.config.concurrency_for(words as usize)).await;

        let mut values = Vec::with_capacity(len as usize);
        for (word_index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(decoded) => values.extend(decoded),
                Err(err) => {
                    warn!(word_index, error = %err, "packed array word degraded to placeholder");
                    let first = word_index as u64 * per_slot;
                    let count = len.min(first + per_slot) - first;
                    values.extend((0..count).map(|_| placeholder(&err)));
                }
            }
        }
        values
    }

    fn clamp_length(&self, len: U256, declared: U256) -> u64 {
        let max = self.config.max_array_length;
        if len > U256::from(max) {
            warn!(slot = %declared, length = %len, max, "array length truncated");
            max
        } else {
            len.as_limbs()[0]
        }
    }

    async fn resolve_mapping_entries(
        &self,
        descriptor: &Descriptor,
        base: U256,
        paths: &[Vec<String>],
    ) -> Result<Value, ResolveError> {
        let ops = paths
            .iter()
            .map(|path| self.resolve_mapping_entry(descriptor, base, path));
        let values = fetch_all(ops, self.config.concurrency_for(paths.len())).await;
        Ok(Value::Mapping(
            paths
                .iter()
                .zip(values)
                .map(|(keys, value)| MappingEntry {
                    keys: keys.clone(),
                    value,
                })
                .collect(),
        ))
    }

    async fn resolve_mapping_entry(
        &self,
        descriptor: &Descriptor,
        base: U256,
        path: &[String],
    ) -> Result<Value, ResolveError> {
        let mut current = descriptor;
        let mut slot = base;
        for key_text in path {
            match current {
                Descriptor::Mapping { key, value, .. } => {
                    let key = MappingKey::parse(*key, key_text)?;
                    slot = match **value {
                        Descriptor::Struct { .. } => struct_base_in_mapping(&key, slot),
                        _ => mapping_slot(&key, slot),
                    };
                    current = &**value;
                }
                _ => {
                    return Err(ResolveError::invalid_key(
                        key_text,
                        "more keys than mapping levels",
                    ))
                }
            }
        }

        match current {
            Descriptor::Mapping { .. } => Ok(Value::NotAValue),
            Descriptor::Scalar { kind, width, .. } => {
                let word = self.read(slot).await?;
                if word.is_zero() {
                    return Ok(Value::Absent);
                }
                let bytes = slice_at_offset(&word, 0, *width, &slot.to_string())?;
                Ok(codec::decode(bytes, *kind, self.config.bool_decoding))
            }
            other => {
                let value = self.resolve_at(other, slot, 0, None).await?;
                if value.is_zero() {
                    Ok(Value::Absent)
                } else {
                    Ok(value)
                }
            }
        }
    }

    /// Resolve struct members laid out relative to `base`.
    async fn resolve_struct(&self, members: &[Member], base: U256) -> Result<Value, ResolveError> {
        let mut groups: BTreeMap<U256, Vec<&Member>> = BTreeMap::new();
        for member in members {
            groups.entry(member.slot).or_default().push(member);
        }
        for group in groups.values_mut() {
            group.sort_by_key(|m| m.offset);
        }

        let ops = groups.iter().map(|(relative, group)| {
            let slot = base.wrapping_add(*relative);
            self.resolve_member_group(group, slot)
        });
        let outcomes = settle_all(ops, self.config.concurrency_for(groups.len())).await;

        let mut resolved = Vec::with_capacity(members.len());
        for (group, outcome) in groups.values().zip(outcomes) {
            match outcome {
                Ok(values) => resolved.extend(values),
                Err(err) => {
                    warn!(error = %err, "struct member degraded to placeholder");
                    let filler = placeholder(&err);
                    resolved.extend(group.iter().map(|m| Labeled::new(&m.label, filler.clone())));
                }
            }
        }
        Ok(Value::Struct(resolved))
    }

    async fn resolve_member_group(&self, group: &[&Member], slot: U256) -> Result<Vec<Labeled>, ResolveError> {
        if let [member] = group {
            let value = self
                .resolve_at(&member.descriptor, slot, member.offset, None)
                .await?;
            return Ok(vec![Labeled::new(&member.label, value)]);
        }
        let fields: Vec<PackedSlotMember<'_>> = group
            .iter()
            .map(|m| PackedSlotMember {
                label: &m.label,
                descriptor: &m.descriptor,
                offset: m.offset,
            })
            .collect();
        let word = self.read(slot).await?;
        self.decode_packed(&word, &fields, slot)
    }

    /// Decode the variables sharing one word.
    ///
    /// All-scalar groups go through [`unpack`]; groups holding an undecodable
    /// scalar fall back to per-member offsets so the other members still decode.
    fn decode_packed(
        &self,
        word: &B256,
        members: &[PackedSlotMember<'_>],
        slot: U256,
    ) -> Result<Vec<Labeled>, ResolveError> {
        let slot_label = slot.to_string();
        let fields: Option<Vec<PackedField>> = members
            .iter()
            .map(|m| match m.descriptor {
                Descriptor::Scalar { kind, width, .. } => Some(PackedField::new(*kind, *width)),
                _ => None,
            })
            .collect();

        if let Some(fields) = fields {
            let values = unpack(word, &fields, self.config.bool_decoding, &slot_label)?;
            return Ok(members
                .iter()
                .zip(values)
                .map(|(m, value)| Labeled::new(m.label, value))
                .collect());
        }

        let total_bytes: usize = members
            .iter()
            .map(|m| m.offset.saturating_add(m.descriptor.width()))
            .max()
            .unwrap_or(0);
        members
            .iter()
            .map(|m| {
                let value = match m.descriptor {
                    Descriptor::Scalar { kind, width, .. } => {
                        let bytes = slice_at_offset(word, m.offset, *width, &slot_label)?;
                        codec::decode(bytes, *kind, self.config.bool_decoding)
                    }
                    Descriptor::Deferred { reason, .. } => Value::Skipped(reason.clone()),
                    other => {
                        return Err(ResolveError::malformed(
                            other.type_id(),
                            format!("shares slot {slot_label} ({total_bytes} bytes) with other variables"),
                        ))
                    }
                };
                Ok(Labeled::new(m.label, value))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use crate::layout::{SlotEntry, TypeId, TypeInfo};
    use crate::provider::SnapshotProvider;
    use crate::slots::KeyKind;
    use alloy_primitives::address;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CONTRACT: Address = address!("c0ffee0000000000000000000000000000000000");

    const TYPES: &str = r#"{
        "t_uint256": { "encoding": "inplace", "label": "uint256", "numberOfBytes": "32" },
        "t_uint8": { "encoding": "inplace", "label": "uint8", "numberOfBytes": "1" },
        "t_bool": { "encoding": "inplace", "label": "bool", "numberOfBytes": "1" },
        "t_address": { "encoding": "inplace", "label": "address", "numberOfBytes": "20" },
        "t_string_storage": { "encoding": "bytes", "label": "string", "numberOfBytes": "32" },
        "t_array(t_uint256)dyn_storage": { "encoding": "dynamic_array", "label": "uint256[]", "numberOfBytes": "32", "base": "t_uint256" },
        "t_array(t_uint8)dyn_storage": { "encoding": "dynamic_array", "label": "uint8[]", "numberOfBytes": "32", "base": "t_uint8" },
        "t_array(t_array(t_uint256)dyn_storage)dyn_storage": { "encoding": "dynamic_array", "label": "uint256[][]", "numberOfBytes": "32", "base": "t_array(t_uint256)dyn_storage" },
        "t_array(t_uint256)2_storage": { "encoding": "inplace", "label": "uint256[2]", "numberOfBytes": "64", "base": "t_uint256" },
        "t_array(t_ghost)dyn_storage": { "encoding": "dynamic_array", "label": "ghost[]", "numberOfBytes": "32", "base": "t_ghost" },
        "t_struct(User)1_storage": { "encoding": "inplace", "label": "struct User", "numberOfBytes": "64", "members": [
            { "label": "name", "offset": 0, "slot": "0", "type": "t_string_storage" },
            { "label": "age", "offset": 0, "slot": "1", "type": "t_uint256" }
        ] },
        "t_struct(Bag)2_storage": { "encoding": "inplace", "label": "struct Bag", "numberOfBytes": "64", "members": [
            { "label": "owner", "offset": 0, "slot": "0", "type": "t_address" },
            { "label": "flag", "offset": 20, "slot": "0", "type": "t_bool" },
            { "label": "items", "offset": 0, "slot": "1", "type": "t_array(t_uint256)dyn_storage" }
        ] },
        "t_struct(P)3_storage": { "encoding": "inplace", "label": "struct P", "numberOfBytes": "64", "members": [
            { "label": "a", "offset": 0, "slot": "0", "type": "t_uint8" },
            { "label": "b", "offset": 1, "slot": "0", "type": "t_uint8" },
            { "label": "c", "offset": 0, "slot": "1", "type": "t_uint256" }
        ] },
        "t_array(t_struct(P)3_storage)dyn_storage": { "encoding": "dynamic_array", "label": "struct P[]", "numberOfBytes": "32", "base": "t_struct(P)3_storage" },
        "t_struct(Outer)4_storage": { "encoding": "inplace", "label": "struct Outer", "numberOfBytes": "96", "members": [
            { "label": "p", "offset": 0, "slot": "0", "type": "t_struct(P)3_storage" },
            { "label": "z", "offset": 0, "slot": "2", "type": "t_uint256" }
        ] },
        "t_array(t_array(t_uint256)2_storage)dyn_storage": { "encoding": "dynamic_array", "label": "uint256[2][]", "numberOfBytes": "32", "base": "t_array(t_uint256)2_storage" },
        "t_mapping(t_address,t_array(t_uint256)dyn_storage)": { "encoding": "mapping", "label": "mapping(address => uint256[])", "numberOfBytes": "32", "key": "t_address", "value": "t_array(t_uint256)dyn_storage" },
        "t_mapping(t_address,t_uint256)": { "encoding": "mapping", "label": "mapping(address => uint256)", "numberOfBytes": "32", "key": "t_address", "value": "t_uint256" },
        "t_mapping(t_address,t_mapping(t_address,t_uint256))": { "encoding": "mapping", "label": "mapping(address => mapping(address => uint256))", "numberOfBytes": "32", "key": "t_address", "value": "t_mapping(t_address,t_uint256)" },
        "t_mapping(t_address,t_struct(User)1_storage)": { "encoding": "mapping", "label": "mapping(address => struct User)", "numberOfBytes": "32", "key": "t_address", "value": "t_struct(User)1_storage" }
    }"#;

    // ── Test helpers ──────────────────────────────────────────────────────────

    /// Provider that counts reads and fails for the configured slots.
    struct MockProvider {
        words: SnapshotProvider,
        failing: HashSet<U256>,
        reads: AtomicUsize,
    }

    #[async_trait]
    impl WordProvider for MockProvider {
        async fn read_word(&self, contract: Address, slot: U256) -> Result<B256, ProviderError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(&slot) {
                return Err(ProviderError::Transport("connection reset".into()));
            }
            self.words.read_word(contract, slot).await
        }
    }

    fn layout(storage: &[(&str, &str, usize, &str)]) -> StorageLayout {
        let types: HashMap<TypeId, TypeInfo> = serde_json::from_str(TYPES).unwrap();
        StorageLayout {
            storage: storage
                .iter()
                .map(|(label, slot, offset, ty)| SlotEntry::new(label, ty, slot, *offset))
                .collect(),
            types,
        }
    }

    fn resolver_with(
        storage: &[(&str, &str, usize, &str)],
        words: &[(U256, B256)],
        failing: &[u64],
        config: ResolverConfig,
    ) -> Resolver<MockProvider> {
        let mut snapshot = SnapshotProvider::new().with_contract(CONTRACT);
        for (slot, word) in words {
            snapshot.set(CONTRACT, *slot, *word);
        }
        let provider = MockProvider {
            words: snapshot,
            failing: failing.iter().map(|s| U256::from(*s)).collect(),
            reads: AtomicUsize::new(0),
        };
        Resolver::new(provider, CONTRACT, layout(storage), config)
    }

    fn resolver(storage: &[(&str, &str, usize, &str)], words: &[(U256, B256)]) -> Resolver<MockProvider> {
        resolver_with(storage, words, &[], ResolverConfig::default())
    }

    fn reads(resolver: &Resolver<MockProvider>) -> usize {
        resolver.provider().reads.load(Ordering::SeqCst)
    }

    fn word(n: u64) -> B256 {
        B256::from(U256::from(n).to_be_bytes())
    }

    fn uint(n: u64) -> Value {
        Value::Uint(U256::from(n))
    }

    fn at(n: u64) -> U256 {
        U256::from(n)
    }

    // ── Top-level resolution ──────────────────────────────────────────────────

    #[tokio::test]
    async fn test_single_uint_end_to_end() {
        let r = resolver(&[("count", "0", 0, "t_uint256")], &[(at(0), word(1))]);
        let values = r.resolve_all(&KeySet::new()).await.unwrap();
        assert_eq!(
            values,
            vec![SlotValue {
                slot: U256::ZERO,
                labels: vec!["count".to_string()],
                value: uint(1),
            }]
        );
        assert_eq!(reads(&r), 1);
    }

    #[tokio::test]
    async fn test_packed_slot_reads_once() {
        let mut packed = [0u8; 32];
        packed[30] = 0x02;
        packed[31] = 0x03;
        let r = resolver(
            &[("a", "3", 0, "t_uint8"), ("b", "3", 1, "t_uint8")],
            &[(at(3), B256::from(packed))],
        );
        let values = r.resolve_all(&KeySet::new()).await.unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].labels, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            values[0].value,
            Value::Packed(vec![Labeled::new("a", uint(3)), Labeled::new("b", uint(2))])
        );
        assert_eq!(reads(&r), 1);
    }

    #[tokio::test]
    async fn test_slots_come_back_in_ascending_order() {
        let r = resolver(
            &[("late", "7", 0, "t_uint256"), ("early", "1", 0, "t_uint256")],
            &[(at(1), word(10)), (at(7), word(70))],
        );
        let values = r.resolve_all(&KeySet::new()).await.unwrap();
        let slots: Vec<U256> = values.iter().map(|v| v.slot).collect();
        assert_eq!(slots, vec![at(1), at(7)]);
        assert_eq!(values[1].value, uint(70));
    }

    // ── Arrays ────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_empty_dynamic_array_reads_only_length() {
        let r = resolver(&[("values", "2", 0, "t_array(t_uint256)dyn_storage")], &[]);
        let value = r.resolve_variable("values", &KeySet::new()).await.unwrap();
        assert_eq!(value, Value::List(Vec::new()));
        assert_eq!(reads(&r), 1);
    }

    #[tokio::test]
    async fn test_dynamic_array_elements_follow_hashed_base() {
        let three = array_base_slot(at(2));
        let one = array_base_slot(at(4));
        let r = resolver(
            &[
                ("values", "2", 0, "t_array(t_uint256)dyn_storage"),
                ("single", "4", 0, "t_array(t_uint256)dyn_storage"),
            ],
            &[
                (at(2), word(3)),
                (three, word(10)),
                (three + at(1), word(20)),
                (three + at(2), word(30)),
                (at(4), word(1)),
                (one, word(99)),
            ],
        );
        assert_eq!(
            r.resolve_variable("values", &KeySet::new()).await.unwrap(),
            Value::List(vec![uint(10), uint(20), uint(30)])
        );
        assert_eq!(reads(&r), 4);
        assert_eq!(
            r.resolve_variable("single", &KeySet::new()).await.unwrap(),
            Value::List(vec![uint(99)])
        );
    }

    #[tokio::test]
    async fn test_nested_dynamic_array() {
        let outer = array_base_slot(at(0));
        let first = array_base_slot(outer);
        let second = array_base_slot(outer + at(1));
        let r = resolver(
            &[("grid", "0", 0, "t_array(t_array(t_uint256)dyn_storage)dyn_storage")],
            &[
                (at(0), word(2)),
                (outer, word(2)),
                (outer + at(1), word(2)),
                (first, word(1)),
                (first + at(1), word(2)),
                (second, word(3)),
                (second + at(1), word(4)),
            ],
        );
        assert_eq!(
            r.resolve_variable("grid", &KeySet::new()).await.unwrap(),
            Value::List(vec![
                Value::List(vec![uint(1), uint(2)]),
                Value::List(vec![uint(3), uint(4)]),
            ])
        );
    }

    #[tokio::test]
    async fn test_packed_uint8_array() {
        let base = array_base_slot(at(0));
        let mut packed = [0u8; 32];
        packed[31] = 1;
        packed[30] = 2;
        packed[29] = 3;
        let r = resolver(
            &[("small", "0", 0, "t_array(t_uint8)dyn_storage")],
            &[(at(0), word(3)), (base, B256::from(packed))],
        );
        assert_eq!(
            r.resolve_variable("small", &KeySet::new()).await.unwrap(),
            Value::List(vec![uint(1), uint(2), uint(3)])
        );
        // length word plus one shared element word
        assert_eq!(reads(&r), 2);
    }

    #[tokio::test]
    async fn test_packed_array_reads_each_word_once() {
        let base = array_base_slot(at(0));
        let mut tail = [0u8; 32];
        tail[31] = 5;
        let r = resolver(
            &[("small", "0", 0, "t_array(t_uint8)dyn_storage")],
            &[
                (at(0), word(33)),
                (base, B256::repeat_byte(0x01)),
                (base + at(1), B256::from(tail)),
            ],
        );
        let value = r.resolve_variable("small", &KeySet::new()).await.unwrap();
        let mut expected = vec![uint(1); 32];
        expected.push(uint(5));
        assert_eq!(value, Value::List(expected));
        assert_eq!(reads(&r), 3);
    }

    #[tokio::test]
    async fn test_fixed_array_starts_at_declared_slot() {
        let r = resolver(
            &[("pair", "5", 0, "t_array(t_uint256)2_storage")],
            &[(at(5), word(11)), (at(6), word(12))],
        );
        assert_eq!(
            r.resolve_variable("pair", &KeySet::new()).await.unwrap(),
            Value::List(vec![uint(11), uint(12)])
        );
        assert_eq!(reads(&r), 2);
    }

    #[tokio::test]
    async fn test_array_length_is_clamped() {
        let base = array_base_slot(at(0));
        let config = ResolverConfig {
            max_array_length: 2,
            ..Default::default()
        };
        let r = resolver_with(
            &[("values", "0", 0, "t_array(t_uint256)dyn_storage")],
            &[(at(0), word(5)), (base, word(1)), (base + at(1), word(2))],
            &[],
            config,
        );
        assert_eq!(
            r.resolve_variable("values", &KeySet::new()).await.unwrap(),
            Value::List(vec![uint(1), uint(2)])
        );
    }

    #[tokio::test]
    async fn test_struct_elements_of_dynamic_array() {
        let base = array_base_slot(at(0));
        let mut first = [0u8; 32];
        first[31] = 1;
        first[30] = 2;
        let mut second = [0u8; 32];
        second[31] = 3;
        second[30] = 4;
        let r = resolver(
            &[("points", "0", 0, "t_array(t_struct(P)3_storage)dyn_storage")],
            &[
                (at(0), word(2)),
                (base, B256::from(first)),
                (base + at(1), word(7)),
                (base + at(2), B256::from(second)),
                (base + at(3), word(8)),
            ],
        );
        let point = |a, b, c| {
            Value::Struct(vec![
                Labeled::new("a", uint(a)),
                Labeled::new("b", uint(b)),
                Labeled::new("c", uint(c)),
            ])
        };
        assert_eq!(
            r.resolve_variable("points", &KeySet::new()).await.unwrap(),
            Value::List(vec![point(1, 2, 7), point(3, 4, 8)])
        );
    }

    #[tokio::test]
    async fn test_fixed_arrays_inside_dynamic_array() {
        let base = array_base_slot(at(4));
        let r = resolver(
            &[("pairs", "4", 0, "t_array(t_array(t_uint256)2_storage)dyn_storage")],
            &[
                (at(4), word(2)),
                (base, word(1)),
                (base + at(1), word(2)),
                (base + at(2), word(3)),
                (base + at(3), word(4)),
            ],
        );
        assert_eq!(
            r.resolve_variable("pairs", &KeySet::new()).await.unwrap(),
            Value::List(vec![
                Value::List(vec![uint(1), uint(2)]),
                Value::List(vec![uint(3), uint(4)]),
            ])
        );
    }

    // ── Mappings ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_struct_value_in_mapping() {
        let key = address!("00000000000000000000000000000000000000aa");
        let base = mapping_slot(&MappingKey::from_address(key), at(1));
        let mut name = [0u8; 32];
        name[..3].copy_from_slice(b"bob");
        name[31] = 6;
        let r = resolver(
            &[("users", "1", 0, "t_mapping(t_address,t_struct(User)1_storage)")],
            &[(base, B256::from(name)), (base + at(1), word(42))],
        );
        let key_text = "0x00000000000000000000000000000000000000aa";
        let keys = KeySet::new().with_path("users", [key_text]);
        let value = r.resolve_variable("users", &keys).await.unwrap();
        assert_eq!(
            value,
            Value::Mapping(vec![MappingEntry {
                keys: vec![key_text.to_string()],
                value: Value::Struct(vec![
                    Labeled::new("name", Value::Text("bob".into())),
                    Labeled::new("age", uint(42)),
                ]),
            }])
        );
    }

    #[tokio::test]
    async fn test_mapping_entry_outcomes() {
        let alice = "0x00000000000000000000000000000000000000a1";
        let bob = "0x00000000000000000000000000000000000000b0";
        let inner = mapping_slot(&MappingKey::parse(KeyKind::Address, alice).unwrap(), at(1));
        let slot = mapping_slot(&MappingKey::parse(KeyKind::Address, bob).unwrap(), inner);
        let r = resolver(
            &[("allowances", "1", 0, "t_mapping(t_address,t_mapping(t_address,t_uint256))")],
            &[(slot, word(5))],
        );
        let paths = vec![
            vec![alice.to_string(), bob.to_string()],
            vec![bob.to_string(), alice.to_string()],
            vec![alice.to_string()],
            vec![alice.to_string(), bob.to_string(), bob.to_string()],
            vec!["not-an-address".to_string(), bob.to_string()],
        ];
        let value = r.resolve_mapping("allowances", &paths).await.unwrap();
        let values: Vec<Value> = match value {
            Value::Mapping(entries) => entries.into_iter().map(|e| e.value).collect(),
            other => panic!("unexpected value {other:?}"),
        };
        assert_eq!(
            values,
            vec![uint(5), Value::Absent, Value::NotAValue, Value::Empty, Value::Empty]
        );
    }

    #[tokio::test]
    async fn test_mapping_without_keys_is_empty() {
        let r = resolver(&[("balances", "0", 0, "t_mapping(t_address,t_uint256)")], &[]);
        let values = r.resolve_all(&KeySet::new()).await.unwrap();
        assert_eq!(values[0].value, Value::Mapping(Vec::new()));
        assert_eq!(reads(&r), 0);
    }

    #[tokio::test]
    async fn test_resolve_mapping_rejects_non_mapping() {
        let r = resolver(&[("count", "0", 0, "t_uint256")], &[]);
        assert!(r.resolve_mapping("count", &[]).await.is_err());
        assert!(matches!(
            r.resolve_mapping("nope", &[]).await,
            Err(ResolveError::UnknownVariable(_))
        ));
    }

    // ── Structs ───────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_struct_array_member_is_skipped() {
        let owner = address!("1111111111111111111111111111111111111111");
        let mut packed = [0u8; 32];
        packed[12..].copy_from_slice(owner.as_slice());
        packed[11] = 1;
        let r = resolver(&[("bag", "0", 0, "t_struct(Bag)2_storage")], &[(at(0), B256::from(packed))]);
        let value = r.resolve_variable("bag", &KeySet::new()).await.unwrap();
        assert_eq!(value.member("owner"), Some(&Value::Address(owner)));
        assert_eq!(value.member("flag"), Some(&Value::Bool(true)));
        assert!(matches!(value.member("items"), Some(Value::Skipped(_))));
        assert_eq!(reads(&r), 1);
    }

    #[tokio::test]
    async fn test_nested_struct_members() {
        let mut packed = [0u8; 32];
        packed[31] = 9;
        packed[30] = 8;
        let r = resolver(
            &[("outer", "10", 0, "t_struct(Outer)4_storage")],
            &[(at(10), B256::from(packed)), (at(11), word(70)), (at(12), word(99))],
        );
        let value = r.resolve_variable("outer", &KeySet::new()).await.unwrap();
        assert_eq!(
            value.member("p"),
            Some(&Value::Struct(vec![
                Labeled::new("a", uint(9)),
                Labeled::new("b", uint(8)),
                Labeled::new("c", uint(70)),
            ]))
        );
        assert_eq!(value.member("z"), Some(&uint(99)));
    }

    #[tokio::test]
    async fn test_dynamic_array_value_in_mapping() {
        let holder = "0x00000000000000000000000000000000000000cc";
        let slot = mapping_slot(&MappingKey::parse(KeyKind::Address, holder).unwrap(), at(3));
        let base = array_base_slot(slot);
        let r = resolver(
            &[("history", "3", 0, "t_mapping(t_address,t_array(t_uint256)dyn_storage)")],
            &[(slot, word(2)), (base, word(40)), (base + at(1), word(41))],
        );
        let value = r
            .resolve_mapping("history", &[vec![holder.to_string()]])
            .await
            .unwrap();
        assert_eq!(
            value,
            Value::Mapping(vec![MappingEntry {
                keys: vec![holder.to_string()],
                value: Value::List(vec![uint(40), uint(41)]),
            }])
        );
    }

    // ── Failure containment ───────────────────────────────────────────────────

    #[tokio::test]
    async fn test_transport_failure_is_contained() {
        let r = resolver_with(
            &[
                ("count", "0", 0, "t_uint256"),
                ("other", "1", 0, "t_uint256"),
                ("last", "2", 0, "t_uint256"),
            ],
            &[(at(0), word(1)), (at(2), word(3))],
            &[1],
            ResolverConfig::default(),
        );
        let values: Vec<Value> = r
            .resolve_all(&KeySet::new())
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.value)
            .collect();
        assert_eq!(values, vec![uint(1), Value::Empty, uint(3)]);
    }

    #[tokio::test]
    async fn test_out_of_range_offset_is_contained() {
        let r = resolver(
            &[("x", "0", usize::MAX, "t_uint8"), ("y", "1", 0, "t_uint256")],
            &[(at(1), word(0))],
        );
        let values: Vec<Value> = r
            .resolve_all(&KeySet::new())
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.value)
            .collect();
        assert_eq!(values, vec![Value::Empty, uint(0)]);
    }

    #[tokio::test]
    async fn test_missing_top_level_type_fails_request() {
        let r = resolver(&[("count", "0", 0, "t_uint256"), ("mystery", "1", 0, "t_nope")], &[]);
        assert!(matches!(
            r.resolve_all(&KeySet::new()).await,
            Err(ResolveError::UnknownType(_))
        ));
        assert_eq!(reads(&r), 0);
    }

    #[tokio::test]
    async fn test_broken_nested_type_is_contained() {
        let r = resolver(
            &[("ghosts", "0", 0, "t_array(t_ghost)dyn_storage"), ("count", "1", 0, "t_uint256")],
            &[(at(0), word(2)), (at(1), word(7))],
        );
        let values = r.resolve_all(&KeySet::new()).await.unwrap();
        assert_eq!(values[0].value, Value::List(vec![Value::Empty, Value::Empty]));
        assert_eq!(values[1].value, uint(7));
    }

    // ── Config ────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_lenient_bool_decoding() {
        let storage = [("flag", "0", 0, "t_bool")];
        let words = [(at(0), word(2))];
        let strict = resolver(&storage, &words);
        assert_eq!(
            strict.resolve_variable("flag", &KeySet::new()).await.unwrap(),
            Value::Bool(false)
        );
        let lenient = resolver_with(&storage, &words, &[], ResolverConfig::lenient());
        assert_eq!(
            lenient.resolve_variable("flag", &KeySet::new()).await.unwrap(),
            Value::Bool(true)
        );
    }
}
