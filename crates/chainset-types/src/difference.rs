//! A keyed difference: the set of changes between two snapshots.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::entry::{DifferenceEntry, DifferenceType};
use crate::error::{TypeError, TypeResult};
use crate::identity::EntryKey;
use crate::partition::KindPartition;

/// A set of [`DifferenceEntry`] values with pairwise distinct keys.
///
/// Distinctness is checked on construction, so a `Difference` can never hold
/// two changes to the same record; callers with such input must squash it
/// first. Iteration is in ascending key order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Difference<T, K> {
    entries: BTreeMap<K, DifferenceEntry<T, K>>,
}

impl<T, K: EntryKey> Default for Difference<T, K> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T, K: EntryKey> Difference<T, K> {
    /// An empty difference.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect entries, failing with [`TypeError::DuplicateKey`] on the first
    /// key seen twice.
    pub fn from_entries(entries: impl IntoIterator<Item = DifferenceEntry<T, K>>) -> TypeResult<Self> {
        let mut map = BTreeMap::new();
        for entry in entries {
            let key = entry.key().clone();
            if map.contains_key(&key) {
                return Err(TypeError::DuplicateKey(format!("{key:?}")));
            }
            map.insert(key, entry);
        }
        Ok(Self { entries: map })
    }

    /// Returns `true` if there are no changes.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of changes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: &K) -> Option<&DifferenceEntry<T, K>> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DifferenceEntry<T, K>> {
        self.entries.values()
    }

    /// Number of added records.
    pub fn additions(&self) -> usize {
        self.count(DifferenceType::Add)
    }

    /// Number of removed records.
    pub fn removals(&self) -> usize {
        self.count(DifferenceType::Delete)
    }

    /// Number of modified records.
    pub fn modifications(&self) -> usize {
        self.count(DifferenceType::Update)
    }

    fn count(&self, kind: DifferenceType) -> usize {
        self.iter().filter(|e| e.kind() == kind).count()
    }

    /// Keys grouped by kind.
    pub fn partition(&self) -> KindPartition<K> {
        KindPartition::of(self.iter())
    }

    /// The entries in key order.
    pub fn into_entries(self) -> Vec<DifferenceEntry<T, K>> {
        self.entries.into_values().collect()
    }

    /// The difference that undoes this one.
    pub fn into_inverse(self) -> Self {
        Self {
            entries: self
                .entries
                .into_iter()
                .map(|(key, entry)| (key, entry.into_inverse()))
                .collect(),
        }
    }
}

impl<T: Clone, K: EntryKey> Difference<T, K> {
    pub fn inverse(&self) -> Self {
        self.clone().into_inverse()
    }
}

impl<T, K: EntryKey> IntoIterator for Difference<T, K> {
    type Item = DifferenceEntry<T, K>;
    type IntoIter = std::collections::btree_map::IntoValues<K, DifferenceEntry<T, K>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}

impl<'a, T, K: EntryKey> IntoIterator for &'a Difference<T, K> {
    type Item = &'a DifferenceEntry<T, K>;
    type IntoIter = std::collections::btree_map::Values<'a, K, DifferenceEntry<T, K>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}

/// Serialized as an ordered list of entries.
impl<T: Serialize, K> Serialize for Difference<T, K> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.values())
    }
}
