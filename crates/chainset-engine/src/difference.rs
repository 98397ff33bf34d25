//! Planning the difference between two snapshots from their keys alone.

use std::collections::BTreeSet;

use chainset_types::{EntryKey, RefTag, ReferenceDifference, TypeError};

use crate::error::EngineResult;

fn distinct<K: EntryKey>(keys: impl IntoIterator<Item = K>) -> EngineResult<BTreeSet<K>> {
    let mut set = BTreeSet::new();
    for key in keys {
        if set.contains(&key) {
            return Err(TypeError::DuplicateKey(format!("{key:?}")).into());
        }
        set.insert(key);
    }
    Ok(set)
}

/// Plan the difference between a snapshot with keys `keys1` and one with
/// keys `keys2`.
///
/// Keys only in `keys1` become deletes read from the first source, keys only
/// in `keys2` adds read from the second, and shared keys tentative updates
/// that materialization drops when the values turn out equal. The plan is
/// ordered by key.
pub fn reference_difference<K: EntryKey>(
    keys1: impl IntoIterator<Item = K>,
    keys2: impl IntoIterator<Item = K>,
) -> EngineResult<Vec<ReferenceDifference<K>>> {
    let first = distinct(keys1)?;
    let mut second = distinct(keys2)?;

    let mut plan = Vec::with_capacity(first.len().max(second.len()));
    for key in first {
        if second.remove(&key) {
            plan.push(ReferenceDifference::updated(key, RefTag::Source1, RefTag::Source2));
        } else {
            plan.push(ReferenceDifference::deleted(key, RefTag::Source1));
        }
    }
    plan.extend(
        second
            .into_iter()
            .map(|key| ReferenceDifference::added(key, RefTag::Source2)),
    );
    plan.sort_by(|a, b| a.key().cmp(b.key()));
    Ok(plan)
}
