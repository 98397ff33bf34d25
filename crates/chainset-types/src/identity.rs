use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::entry::DifferenceEntry;
use crate::error::{TypeError, TypeResult};

/// Bounds every key type must satisfy.
///
/// Keys are hashed for set arithmetic and ordered so that composed
/// differences and chunked scans come out in a deterministic order.
pub trait EntryKey: Clone + Eq + Hash + Ord + fmt::Debug {}

impl<K: Clone + Eq + Hash + Ord + fmt::Debug> EntryKey for K {}

type KeyFn<T, K> = Arc<dyn Fn(&T) -> K + Send + Sync>;
type EqFn<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// How entries are identified and compared.
///
/// An `Identity` bundles the caller's key selector (entry to key) with a
/// value-equality predicate (entry x entry to bool). Two entries with equal
/// keys are the same logical record across snapshots; the predicate decides
/// whether that record changed. It is cheap to clone and carries no state.
pub struct Identity<T, K> {
    key_fn: KeyFn<T, K>,
    eq_fn: EqFn<T>,
}

impl<T, K> Clone for Identity<T, K> {
    fn clone(&self) -> Self {
        Self {
            key_fn: Arc::clone(&self.key_fn),
            eq_fn: Arc::clone(&self.eq_fn),
        }
    }
}

impl<T, K> fmt::Debug for Identity<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity").finish_non_exhaustive()
    }
}

impl<T: PartialEq + 'static, K: EntryKey> Identity<T, K> {
    /// Identity using `key_fn` for keys and `T`'s own `PartialEq` for values.
    pub fn new(key_fn: impl Fn(&T) -> K + Send + Sync + 'static) -> Self {
        Self {
            key_fn: Arc::new(key_fn),
            eq_fn: Arc::new(|a: &T, b: &T| a == b),
        }
    }
}

impl<T, K: EntryKey> Identity<T, K> {
    /// Identity with a custom value-equality predicate.
    ///
    /// The predicate must be an equivalence relation at least as fine as key
    /// equality: entries it calls equal must also have equal keys.
    pub fn with_equality(
        key_fn: impl Fn(&T) -> K + Send + Sync + 'static,
        eq_fn: impl Fn(&T, &T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            key_fn: Arc::new(key_fn),
            eq_fn: Arc::new(eq_fn),
        }
    }

    /// The key of an entry.
    pub fn key(&self, entry: &T) -> K {
        (self.key_fn)(entry)
    }

    /// Whether two entries carry the same value.
    pub fn values_equal(&self, a: &T, b: &T) -> bool {
        (self.eq_fn)(a, b)
    }

    /// Value equality lifted to optional entries; two absent sides are equal.
    pub fn option_equal(&self, a: Option<&T>, b: Option<&T>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => self.values_equal(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Build a difference entry, checking both invariants: at least one side
    /// present, and matching keys when both are.
    pub fn entry(&self, before: Option<T>, after: Option<T>) -> TypeResult<DifferenceEntry<T, K>> {
        let key = match (&before, &after) {
            (None, None) => {
                return Err(TypeError::InvalidDifferenceEntry(
                    "at least one of before/after must be present".into(),
                ))
            }
            (Some(b), None) => self.key(b),
            (None, Some(a)) => self.key(a),
            (Some(b), Some(a)) => {
                let before_key = self.key(b);
                let after_key = self.key(a);
                if before_key != after_key {
                    return Err(TypeError::InvalidDifferenceEntry(format!(
                        "before key {before_key:?} differs from after key {after_key:?}"
                    )));
                }
                before_key
            }
        };
        Ok(DifferenceEntry::from_parts(key, before, after))
    }

    /// An `Add` entry for a record that only exists afterwards.
    pub fn add(&self, after: T) -> DifferenceEntry<T, K> {
        DifferenceEntry::from_parts(self.key(&after), None, Some(after))
    }

    /// A `Delete` entry for a record that only existed before.
    pub fn delete(&self, before: T) -> DifferenceEntry<T, K> {
        DifferenceEntry::from_parts(self.key(&before), Some(before), None)
    }

    /// An `Update` entry between two versions of one record.
    ///
    /// Returns `Ok(None)` when the values compare equal (no change), and
    /// [`TypeError::KeyMismatch`] when the two entries are different records.
    pub fn update(&self, before: T, after: T) -> TypeResult<Option<DifferenceEntry<T, K>>> {
        let before_key = self.key(&before);
        let after_key = self.key(&after);
        if before_key != after_key {
            return Err(TypeError::KeyMismatch {
                before: format!("{before_key:?}"),
                after: format!("{after_key:?}"),
            });
        }
        if self.values_equal(&before, &after) {
            return Ok(None);
        }
        Ok(Some(DifferenceEntry::from_parts(
            before_key,
            Some(before),
            Some(after),
        )))
    }

    /// Full difference equality: same key, same kind, equal before and after.
    pub fn entries_equal(&self, a: &DifferenceEntry<T, K>, b: &DifferenceEntry<T, K>) -> bool {
        a.key() == b.key()
            && a.kind() == b.kind()
            && self.option_equal(a.before(), b.before())
            && self.option_equal(a.after(), b.after())
    }
}
