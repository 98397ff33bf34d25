//! Plan materialization.
//!
//! A reference plan names, per key, which slot of which input each side of a
//! change comes from. Materialization walks the two inputs in lock-step
//! batches, fills in planned slots as matching items go by, and emits a
//! difference entry as soon as a key is fully resolved. At any time only the
//! current pair of batches and the still-unresolved planned keys are held in
//! memory.
//!
//! What an input item *is* differs between operations: plain differences
//! read whole snapshot entries, progressions and squashes read the sides of
//! stored difference entries. [`SlotReader`] captures that difference so the
//! batching loop is written once.

use std::borrow::Borrow;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::debug;

use chainset_types::{
    Difference, DifferenceEntry, EntryKey, Identity, RefTag, ReferenceDifference, Side,
};

use crate::error::{EngineError, EngineResult};

/// Reads keys and slot values out of the items of an input.
pub trait SlotReader<T, K> {
    type Item;

    /// The key an item belongs to.
    fn key_of(&self, item: &Self::Item) -> K;

    /// The value `item`, coming from input `side`, provides for `tag`, if
    /// any.
    fn read(&self, item: &Self::Item, side: Side, tag: RefTag) -> Option<T>;
}

/// Reads snapshot entries: an entry of the first input resolves
/// [`RefTag::Source1`], one of the second input [`RefTag::Source2`].
pub struct SnapshotReader<'a, T, K> {
    identity: &'a Identity<T, K>,
}

impl<'a, T, K> SnapshotReader<'a, T, K> {
    pub fn new(identity: &'a Identity<T, K>) -> Self {
        Self { identity }
    }
}

impl<T: Clone, K: EntryKey> SlotReader<T, K> for SnapshotReader<'_, T, K> {
    type Item = T;

    fn key_of(&self, item: &T) -> K {
        self.identity.key(item)
    }

    fn read(&self, item: &T, side: Side, tag: RefTag) -> Option<T> {
        match (side, tag) {
            (Side::First, RefTag::Source1) | (Side::Second, RefTag::Source2) => Some(item.clone()),
            _ => None,
        }
    }
}

/// Reads stored difference entries: the before/after slots of the first
/// and second input.
pub struct DifferenceReader;

impl<T: Clone, K: EntryKey> SlotReader<T, K> for DifferenceReader {
    type Item = DifferenceEntry<T, K>;

    fn key_of(&self, item: &DifferenceEntry<T, K>) -> K {
        item.key().clone()
    }

    fn read(&self, item: &DifferenceEntry<T, K>, side: Side, tag: RefTag) -> Option<T> {
        if tag == RefTag::before_of(side) {
            item.before().cloned()
        } else if tag == RefTag::after_of(side) {
            item.after().cloned()
        } else {
            None
        }
    }
}

struct Pending<T, K> {
    plan: ReferenceDifference<K>,
    before: Option<T>,
    after: Option<T>,
}

impl<T, K: EntryKey> Pending<T, K> {
    fn new(plan: ReferenceDifference<K>) -> Self {
        Self {
            plan,
            before: None,
            after: None,
        }
    }

    fn offer<R: SlotReader<T, K>>(&mut self, reader: &R, item: &R::Item, side: Side) {
        if let Some(tag) = self.plan.before_tag() {
            if self.before.is_none() && tag.side() == Some(side) {
                self.before = reader.read(item, side, tag);
            }
        }
        if let Some(tag) = self.plan.after_tag() {
            if self.after.is_none() && tag.side() == Some(side) {
                self.after = reader.read(item, side, tag);
            }
        }
    }

    fn is_resolved(&self) -> bool {
        self.plan.before_tag().is_some() == self.before.is_some()
            && self.plan.after_tag().is_some() == self.after.is_some()
    }

    /// The resolved entry, or `None` for an update whose values turned out
    /// equal.
    fn finish(self, identity: &Identity<T, K>) -> EngineResult<Option<DifferenceEntry<T, K>>> {
        match (self.before, self.after) {
            (Some(before), Some(after)) => Ok(identity.update(before, after)?),
            (before, after) => Ok(Some(identity.entry(before, after)?)),
        }
    }
}

/// Keys listed in a [`EngineError::MissingData`] error.
const MISSING_KEYS_REPORTED: usize = 10;

/// Materialize `plan` against two inputs, pulling `chunk_size` items from
/// each per batch.
///
/// Tentative updates whose values compare equal are dropped. Items not
/// named by the plan are skipped. Reading stops as soon as every planned key
/// is resolved; if the inputs run dry first, the call fails with
/// [`EngineError::MissingData`].
pub fn materialize<T, K, R, I1, I2>(
    identity: &Identity<T, K>,
    reader: &R,
    plan: impl IntoIterator<Item = ReferenceDifference<K>>,
    source1: I1,
    source2: I2,
    chunk_size: usize,
) -> EngineResult<Difference<T, K>>
where
    K: EntryKey,
    R: SlotReader<T, K>,
    I1: IntoIterator,
    I1::Item: Borrow<R::Item>,
    I2: IntoIterator,
    I2::Item: Borrow<R::Item>,
{
    if chunk_size == 0 {
        return Err(EngineError::InvalidConfig(
            "chunk_size must be at least 1".into(),
        ));
    }

    let mut pending: HashMap<K, Pending<T, K>> = HashMap::new();
    for planned in plan {
        if planned.before_tag() == Some(RefTag::Stored) || planned.after_tag() == Some(RefTag::Stored)
        {
            return Err(EngineError::InvalidPlan(format!(
                "key {:?} refers to stored values, not to an input",
                planned.key()
            )));
        }
        match pending.entry(planned.key().clone()) {
            Entry::Occupied(slot) => {
                return Err(chainset_types::TypeError::DuplicateKey(format!("{:?}", slot.key())).into())
            }
            Entry::Vacant(slot) => {
                slot.insert(Pending::new(planned));
            }
        }
    }
    let planned = pending.len();

    let mut iter1 = source1.into_iter();
    let mut iter2 = source2.into_iter();
    let mut done1 = false;
    let mut done2 = false;
    let mut batches = 0usize;
    let mut resolved = Vec::with_capacity(planned);

    while !pending.is_empty() && !(done1 && done2) {
        if !done1 {
            let chunk: Vec<I1::Item> = iter1.by_ref().take(chunk_size).collect();
            done1 = chunk.len() < chunk_size;
            absorb(identity, reader, &mut pending, &mut resolved, chunk, Side::First)?;
        }
        if !done2 {
            let chunk: Vec<I2::Item> = iter2.by_ref().take(chunk_size).collect();
            done2 = chunk.len() < chunk_size;
            absorb(identity, reader, &mut pending, &mut resolved, chunk, Side::Second)?;
        }
        batches += 1;
    }

    if !pending.is_empty() {
        let mut keys: Vec<&K> = pending.keys().collect();
        keys.sort();
        return Err(EngineError::MissingData {
            count: keys.len(),
            keys: keys
                .into_iter()
                .take(MISSING_KEYS_REPORTED)
                .map(|k| format!("{k:?}"))
                .collect(),
        });
    }

    debug!(planned, batches, emitted = resolved.len(), "materialized plan");
    Ok(Difference::from_entries(resolved)?)
}

fn absorb<T, K, R, I>(
    identity: &Identity<T, K>,
    reader: &R,
    pending: &mut HashMap<K, Pending<T, K>>,
    resolved: &mut Vec<DifferenceEntry<T, K>>,
    chunk: Vec<I>,
    side: Side,
) -> EngineResult<()>
where
    K: EntryKey,
    R: SlotReader<T, K>,
    I: Borrow<R::Item>,
{
    for item in chunk {
        let item = item.borrow();
        if let Entry::Occupied(mut slot) = pending.entry(reader.key_of(item)) {
            slot.get_mut().offer(reader, item, side);
            if slot.get().is_resolved() {
                if let Some(entry) = slot.remove().finish(identity)? {
                    resolved.push(entry);
                }
            }
        }
    }
    Ok(())
}
