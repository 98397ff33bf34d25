//! Progression: from the result of one difference to the result of another,
//! both taken against the same base snapshot.
//!
//! If `first = diff(S, S1)` and `second = diff(S, S2)`, the progression is
//! `diff(S1, S2)`. Per key the rule depends only on the kinds the key has in
//! each input:
//!
//! | first  | second | result                                  |
//! |--------|--------|-----------------------------------------|
//! | –      | Add    | add, after of second                    |
//! | –      | Delete | delete, before of second                |
//! | –      | Update | update, before → after of second        |
//! | Add    | –      | delete, after of first                  |
//! | Delete | –      | add, before of first                    |
//! | Update | –      | update, after → before of first         |
//! | Add    | Add    | update, after of first → after of second|
//! | Update | Update | update, after of first → after of second|
//! | Delete | Update | add, after of second                    |
//! | Update | Delete | delete, after of first                  |
//! | Delete | Delete | nothing                                 |
//!
//! Add against Delete or Update is impossible from a shared base.

use std::collections::BTreeSet;

use chainset_types::{DifferenceType, EntryKey, KindPartition, RefTag, ReferenceDifference};

use crate::error::{ConsistencyRule, EngineError, EngineResult};

use DifferenceType::{Add, Delete, Update};

/// The plan for a single key, or `None` when the key drops out.
pub(crate) fn progress_key<K: EntryKey>(
    key: &K,
    first: Option<DifferenceType>,
    second: Option<DifferenceType>,
) -> EngineResult<Option<ReferenceDifference<K>>> {
    let key = key.clone();
    let planned = match (first, second) {
        (None, None) | (Some(Delete), Some(Delete)) => None,
        (None, Some(Add)) => Some(ReferenceDifference::added(key, RefTag::AfterOfSecond)),
        (None, Some(Delete)) => Some(ReferenceDifference::deleted(key, RefTag::BeforeOfSecond)),
        (None, Some(Update)) => Some(ReferenceDifference::updated(
            key,
            RefTag::BeforeOfSecond,
            RefTag::AfterOfSecond,
        )),
        (Some(Add), None) => Some(ReferenceDifference::deleted(key, RefTag::AfterOfFirst)),
        (Some(Delete), None) => Some(ReferenceDifference::added(key, RefTag::BeforeOfFirst)),
        (Some(Update), None) => Some(ReferenceDifference::updated(
            key,
            RefTag::AfterOfFirst,
            RefTag::BeforeOfFirst,
        )),
        (Some(Add), Some(Add)) | (Some(Update), Some(Update)) => Some(ReferenceDifference::updated(
            key,
            RefTag::AfterOfFirst,
            RefTag::AfterOfSecond,
        )),
        (Some(Delete), Some(Update)) => Some(ReferenceDifference::added(key, RefTag::AfterOfSecond)),
        (Some(Update), Some(Delete)) => Some(ReferenceDifference::deleted(key, RefTag::AfterOfFirst)),
        (Some(Add), Some(Delete)) | (Some(Delete), Some(Add)) => {
            return Err(EngineError::inconsistency(ConsistencyRule::ProgressionAddDelete, &key))
        }
        (Some(Add), Some(Update)) | (Some(Update), Some(Add)) => {
            return Err(EngineError::inconsistency(ConsistencyRule::ProgressionAddUpdate, &key))
        }
    };
    Ok(planned)
}

/// Plan the progression from the kind partitions of two differences.
///
/// The result is ordered by key. Forbidden kind pairs fail with
/// [`EngineError::Inconsistency`] whether or not validation ran beforehand.
pub fn plan_progression<K: EntryKey>(
    first: &KindPartition<K>,
    second: &KindPartition<K>,
) -> EngineResult<Vec<ReferenceDifference<K>>> {
    let keys: BTreeSet<&K> = first.keys().chain(second.keys()).collect();
    let mut plan = Vec::with_capacity(keys.len());
    for key in keys {
        if let Some(planned) = progress_key(key, first.kind_of(key), second.kind_of(key))? {
            plan.push(planned);
        }
    }
    Ok(plan)
}
