//! JSON encoding of differences and reference plans.
//!
//! Differences are written as arrays of `{ kind, before, after }` objects.
//! On the way back in only `before` and `after` are trusted: keys and kinds
//! are recomputed through the caller's [`Identity`], and distinctness is
//! checked again.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::difference::Difference;
use crate::entry::{DifferenceEntry, DifferenceRecord};
use crate::error::{TypeError, TypeResult};
use crate::identity::{EntryKey, Identity};
use crate::reference::ReferenceDifference;

impl<T, K: EntryKey> Identity<T, K> {
    /// Turn a decoded record into a checked entry.
    pub fn restore(&self, record: DifferenceRecord<T>) -> TypeResult<DifferenceEntry<T, K>> {
        self.entry(record.before, record.after)
    }
}

/// Encode a difference as compact JSON.
pub fn difference_to_json<T: Serialize, K>(difference: &Difference<T, K>) -> TypeResult<String> {
    serde_json::to_string(difference).map_err(|e| TypeError::Serialization(e.to_string()))
}

/// Encode a difference as indented JSON.
pub fn difference_to_json_pretty<T: Serialize, K>(difference: &Difference<T, K>) -> TypeResult<String> {
    serde_json::to_string_pretty(difference).map_err(|e| TypeError::Serialization(e.to_string()))
}

/// Decode a difference, recomputing every key with `identity`.
pub fn difference_from_json<T: DeserializeOwned, K: EntryKey>(
    identity: &Identity<T, K>,
    json: &str,
) -> TypeResult<Difference<T, K>> {
    let records: Vec<DifferenceRecord<T>> =
        serde_json::from_str(json).map_err(|e| TypeError::Serialization(e.to_string()))?;
    let entries = records
        .into_iter()
        .map(|record| identity.restore(record))
        .collect::<TypeResult<Vec<_>>>()?;
    Difference::from_entries(entries)
}

pub fn plan_to_json<K: Serialize>(plan: &[ReferenceDifference<K>]) -> TypeResult<String> {
    serde_json::to_string_pretty(plan).map_err(|e| TypeError::Serialization(e.to_string()))
}

pub fn plan_from_json<K>(json: &str) -> TypeResult<Vec<ReferenceDifference<K>>>
where
    K: DeserializeOwned + PartialEq + std::fmt::Debug,
{
    serde_json::from_str(json).map_err(|e| TypeError::Serialization(e.to_string()))
}
