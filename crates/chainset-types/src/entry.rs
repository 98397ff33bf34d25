//! The atomic change record and its derived kind.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of a change. Never stored; always derived from which sides of a
/// [`DifferenceEntry`] are present.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferenceType {
    Add,
    Delete,
    Update,
}

impl fmt::Display for DifferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Delete => write!(f, "delete"),
            Self::Update => write!(f, "update"),
        }
    }
}

/// One change to one record: the value before and the value after.
///
/// Invariants, upheld by every constructor in this crate (see
/// [`Identity::entry`](crate::Identity::entry)):
///
/// - `before` and `after` are never both absent.
/// - When both are present they have the same key.
///
/// Entries are immutable. Composition steps clone or invert them rather than
/// share them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DifferenceEntry<T, K> {
    key: K,
    before: Option<T>,
    after: Option<T>,
}

impl<T, K> DifferenceEntry<T, K> {
    pub(crate) fn from_parts(key: K, before: Option<T>, after: Option<T>) -> Self {
        debug_assert!(before.is_some() || after.is_some());
        Self { key, before, after }
    }

    /// The key of the changed record.
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn before(&self) -> Option<&T> {
        self.before.as_ref()
    }

    pub fn after(&self) -> Option<&T> {
        self.after.as_ref()
    }

    /// `Add` iff `before` is absent, `Delete` iff `after` is absent,
    /// `Update` otherwise.
    pub fn kind(&self) -> DifferenceType {
        match (&self.before, &self.after) {
            (None, _) => DifferenceType::Add,
            (_, None) => DifferenceType::Delete,
            _ => DifferenceType::Update,
        }
    }

    /// Whichever side is present, preferring `before`.
    pub fn example(&self) -> &T {
        match (&self.before, &self.after) {
            (Some(before), _) => before,
            (None, Some(after)) => after,
            (None, None) => unreachable!("difference entry without values"),
        }
    }

    /// Decompose into `(key, before, after)`.
    pub fn into_parts(self) -> (K, Option<T>, Option<T>) {
        (self.key, self.before, self.after)
    }

    /// The change that undoes this one.
    pub fn into_inverse(self) -> Self {
        Self {
            key: self.key,
            before: self.after,
            after: self.before,
        }
    }
}

impl<T: Clone, K: Clone> DifferenceEntry<T, K> {
    /// A copy of the change that undoes this one.
    pub fn inverse(&self) -> Self {
        self.clone().into_inverse()
    }
}

#[derive(Serialize)]
struct EntryView<'a, T> {
    kind: DifferenceType,
    before: Option<&'a T>,
    after: Option<&'a T>,
}

/// Serialized as `{ "kind", "before", "after" }`. The kind is informational;
/// see [`DifferenceRecord`] for the decoding side.
impl<T: Serialize, K> Serialize for DifferenceEntry<T, K> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        EntryView {
            kind: self.kind(),
            before: self.before.as_ref(),
            after: self.after.as_ref(),
        }
        .serialize(serializer)
    }
}

/// The wire form of a difference entry before its key is recomputed.
///
/// Only `before` and `after` are read; a `kind` field, if present, is
/// ignored and re-derived. Turn a record into a checked entry with
/// [`Identity::restore`](crate::Identity::restore).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct DifferenceRecord<T> {
    pub before: Option<T>,
    pub after: Option<T>,
}
