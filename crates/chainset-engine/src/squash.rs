//! Squash: two consecutive differences collapsed into one.
//!
//! If `before = diff(S0, S1)` and `after = diff(S1, S2)`, the squash is
//! `diff(S0, S2)`.
//!
//! | before | after  | result                                   |
//! |--------|--------|------------------------------------------|
//! | Add    | –      | add, after of first                      |
//! | Add    | Update | add, after of second                     |
//! | Add    | Delete | nothing                                  |
//! | –      | Add    | add, after of second                     |
//! | Delete | –      | delete, before of first                  |
//! | –      | Delete | delete, before of second                 |
//! | Update | Delete | delete, before of first                  |
//! | Update | –      | update, before → after of first          |
//! | –      | Update | update, before → after of second         |
//! | Update | Update | update, before of first → after of second|
//! | Delete | Add    | update, before of first → after of second|
//!
//! Add/Add, Delete/Delete, Delete/Update and Update/Add can't occur in a
//! real chain.

use std::collections::BTreeSet;

use chainset_types::{DifferenceType, EntryKey, KindPartition, RefTag, ReferenceDifference};

use crate::error::{ConsistencyRule, EngineError, EngineResult};

use DifferenceType::{Add, Delete, Update};

pub(crate) fn squash_key<K: EntryKey>(
    key: &K,
    before: Option<DifferenceType>,
    after: Option<DifferenceType>,
) -> EngineResult<Option<ReferenceDifference<K>>> {
    let rule = match (before, after) {
        (Some(Add), Some(Add)) => Some(ConsistencyRule::SquashAddAdd),
        (Some(Delete), Some(Delete)) => Some(ConsistencyRule::SquashDeleteDelete),
        (Some(Delete), Some(Update)) => Some(ConsistencyRule::SquashDeleteUpdate),
        (Some(Update), Some(Add)) => Some(ConsistencyRule::SquashUpdateAdd),
        _ => None,
    };
    if let Some(rule) = rule {
        return Err(EngineError::inconsistency(rule, key));
    }

    let key = key.clone();
    let planned = match (before, after) {
        (Some(Add), None) => Some(ReferenceDifference::added(key, RefTag::AfterOfFirst)),
        (Some(Add), Some(Update)) | (None, Some(Add)) => {
            Some(ReferenceDifference::added(key, RefTag::AfterOfSecond))
        }
        (Some(Delete), None) | (Some(Update), Some(Delete)) => {
            Some(ReferenceDifference::deleted(key, RefTag::BeforeOfFirst))
        }
        (None, Some(Delete)) => Some(ReferenceDifference::deleted(key, RefTag::BeforeOfSecond)),
        (Some(Update), None) => Some(ReferenceDifference::updated(
            key,
            RefTag::BeforeOfFirst,
            RefTag::AfterOfFirst,
        )),
        (None, Some(Update)) => Some(ReferenceDifference::updated(
            key,
            RefTag::BeforeOfSecond,
            RefTag::AfterOfSecond,
        )),
        (Some(Update), Some(Update)) | (Some(Delete), Some(Add)) => Some(
            ReferenceDifference::updated(key, RefTag::BeforeOfFirst, RefTag::AfterOfSecond),
        ),
        _ => None,
    };
    Ok(planned)
}

/// Plan the squash of `before` followed by `after`, ordered by key.
///
/// Impossible kind pairs fail with [`EngineError::Inconsistency`] whether or
/// not validation ran beforehand.
pub fn plan_squash<K: EntryKey>(
    before: &KindPartition<K>,
    after: &KindPartition<K>,
) -> EngineResult<Vec<ReferenceDifference<K>>> {
    let keys: BTreeSet<&K> = before.keys().chain(after.keys()).collect();
    let mut plan = Vec::with_capacity(keys.len());
    for key in keys {
        if let Some(planned) = squash_key(key, before.kind_of(key), after.kind_of(key))? {
            plan.push(planned);
        }
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partition(add: &[u32], delete: &[u32], update: &[u32]) -> KindPartition<u32> {
        KindPartition {
            add: add.iter().copied().collect(),
            delete: delete.iter().copied().collect(),
            update: update.iter().copied().collect(),
        }
    }

    fn tags(p: &ReferenceDifference<u32>) -> (u32, Option<RefTag>, Option<RefTag>) {
        (*p.key(), p.before_tag(), p.after_tag())
    }

    #[test]
    fn chained_kinds() {
        // 1: add then update, 2: add then delete, 3: update then delete,
        // 4: update twice, 5: delete then re-add.
        let before = partition(&[1, 2], &[5], &[3, 4]);
        let after = partition(&[5], &[2, 3], &[1, 4]);
        let plan: Vec<_> = plan_squash(&before, &after).unwrap().iter().map(tags).collect();
        assert_eq!(
            plan,
            vec![
                (1, None, Some(RefTag::AfterOfSecond)),
                (3, Some(RefTag::BeforeOfFirst), None),
                (4, Some(RefTag::BeforeOfFirst), Some(RefTag::AfterOfSecond)),
                (5, Some(RefTag::BeforeOfFirst), Some(RefTag::AfterOfSecond)),
            ]
        );
    }

    #[test]
    fn one_sided_keys() {
        let before = partition(&[1], &[2], &[3]);
        let after = partition(&[4], &[5], &[6]);
        let plan: Vec<_> = plan_squash(&before, &after).unwrap().iter().map(tags).collect();
        assert_eq!(
            plan,
            vec![
                (1, None, Some(RefTag::AfterOfFirst)),
                (2, Some(RefTag::BeforeOfFirst), None),
                (3, Some(RefTag::BeforeOfFirst), Some(RefTag::AfterOfFirst)),
                (4, None, Some(RefTag::AfterOfSecond)),
                (5, Some(RefTag::BeforeOfSecond), None),
                (6, Some(RefTag::BeforeOfSecond), Some(RefTag::AfterOfSecond)),
            ]
        );
    }

    #[test]
    fn impossible_chains_fail() {
        let cases = [
            (partition(&[1], &[], &[]), partition(&[1], &[], &[]), ConsistencyRule::SquashAddAdd),
            (partition(&[], &[1], &[]), partition(&[], &[1], &[]), ConsistencyRule::SquashDeleteDelete),
            (partition(&[], &[1], &[]), partition(&[], &[], &[1]), ConsistencyRule::SquashDeleteUpdate),
            (partition(&[], &[], &[1]), partition(&[1], &[], &[]), ConsistencyRule::SquashUpdateAdd),
        ];
        for (before, after, expected) in cases {
            match plan_squash(&before, &after) {
                Err(EngineError::Inconsistency { rule, key }) => {
                    assert_eq!(rule, expected);
                    assert_eq!(key, "1");
                }
                other => panic!("expected {expected:?}, got {other:?}"),
            }
        }
    }
}
