//! Reference differences: difference entries expressed only in keys and
//! source tags.
//!
//! A reference plan says *where* the values of a future difference entry will
//! come from without carrying them. Plans are cheap to build from key sets
//! alone and are materialized later against the real sources.

use serde::{Deserialize, Serialize};

use crate::entry::{DifferenceEntry, DifferenceType};
use crate::error::{TypeError, TypeResult};

/// One of the two inputs a plan draws from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    First,
    Second,
}

/// Which source, or which slot of which source, a referenced value lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefTag {
    /// The entry itself, from the first snapshot of a plain difference.
    Source1,
    /// The entry itself, from the second snapshot of a plain difference.
    Source2,
    BeforeOfFirst,
    AfterOfFirst,
    BeforeOfSecond,
    AfterOfSecond,
    /// The value already held by a stored difference entry. Used by trivial
    /// plans, which only record presence.
    Stored,
}

impl RefTag {
    /// The input this tag reads from, if it names one.
    pub fn side(self) -> Option<Side> {
        match self {
            Self::Source1 | Self::BeforeOfFirst | Self::AfterOfFirst => Some(Side::First),
            Self::Source2 | Self::BeforeOfSecond | Self::AfterOfSecond => Some(Side::Second),
            Self::Stored => None,
        }
    }

    /// The `before` slot of `side`.
    pub fn before_of(side: Side) -> Self {
        match side {
            Side::First => Self::BeforeOfFirst,
            Side::Second => Self::BeforeOfSecond,
        }
    }

    /// The `after` slot of `side`.
    pub fn after_of(side: Side) -> Self {
        match side {
            Side::First => Self::AfterOfFirst,
            Side::Second => Self::AfterOfSecond,
        }
    }
}

/// A key plus the tag saying where its value is found.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryRef<K> {
    pub key: K,
    pub tag: RefTag,
}

/// A [`DifferenceEntry`] over [`EntryRef`]s instead of values.
///
/// Same invariants as a difference entry: at least one side present, and
/// both sides naming the same key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawReference<K>")]
#[serde(bound(deserialize = "K: Deserialize<'de> + PartialEq + std::fmt::Debug"))]
pub struct ReferenceDifference<K> {
    before: Option<EntryRef<K>>,
    after: Option<EntryRef<K>>,
}

impl<K: Clone> ReferenceDifference<K> {
    /// A reference entry for `key` whose sides are pulled from the given
    /// tags. Absent tags mean absent sides.
    pub fn new(key: K, before: Option<RefTag>, after: Option<RefTag>) -> TypeResult<Self> {
        if before.is_none() && after.is_none() {
            return Err(TypeError::InvalidDifferenceEntry(
                "reference difference needs at least one side".into(),
            ));
        }
        Ok(Self {
            before: before.map(|tag| EntryRef {
                key: key.clone(),
                tag,
            }),
            after: after.map(|tag| EntryRef { key, tag }),
        })
    }

    /// An `Add` reference whose value comes from `tag`.
    pub fn added(key: K, tag: RefTag) -> Self {
        Self {
            before: None,
            after: Some(EntryRef { key, tag }),
        }
    }

    /// A `Delete` reference whose value comes from `tag`.
    pub fn deleted(key: K, tag: RefTag) -> Self {
        Self {
            before: Some(EntryRef { key, tag }),
            after: None,
        }
    }

    /// A tentative `Update` reference: it survives materialization only if
    /// the two referenced values differ.
    pub fn updated(key: K, before: RefTag, after: RefTag) -> Self {
        Self {
            before: Some(EntryRef {
                key: key.clone(),
                tag: before,
            }),
            after: Some(EntryRef { key, tag: after }),
        }
    }

    /// The trivial plan of a stored entry: same presence, values left where
    /// they are.
    pub fn trivial<T>(entry: &DifferenceEntry<T, K>) -> Self {
        let stored = |present: bool| present.then_some(RefTag::Stored);
        Self {
            before: stored(entry.before().is_some()).map(|tag| EntryRef {
                key: entry.key().clone(),
                tag,
            }),
            after: stored(entry.after().is_some()).map(|tag| EntryRef {
                key: entry.key().clone(),
                tag,
            }),
        }
    }
}

impl<K> ReferenceDifference<K> {
    pub fn key(&self) -> &K {
        match (&self.before, &self.after) {
            (Some(before), _) => &before.key,
            (None, Some(after)) => &after.key,
            (None, None) => unreachable!("reference difference without sides"),
        }
    }

    pub fn before(&self) -> Option<&EntryRef<K>> {
        self.before.as_ref()
    }

    pub fn after(&self) -> Option<&EntryRef<K>> {
        self.after.as_ref()
    }

    pub fn before_tag(&self) -> Option<RefTag> {
        self.before.as_ref().map(|r| r.tag)
    }

    pub fn after_tag(&self) -> Option<RefTag> {
        self.after.as_ref().map(|r| r.tag)
    }

    pub fn kind(&self) -> DifferenceType {
        match (&self.before, &self.after) {
            (None, _) => DifferenceType::Add,
            (_, None) => DifferenceType::Delete,
            _ => DifferenceType::Update,
        }
    }

    /// Whether any side reads from `side`.
    pub fn reads_from(&self, side: Side) -> bool {
        [self.before_tag(), self.after_tag()]
            .into_iter()
            .flatten()
            .any(|tag| tag.side() == Some(side))
    }

    pub fn into_inverse(self) -> Self {
        Self {
            before: self.after,
            after: self.before,
        }
    }
}

#[derive(Deserialize)]
struct RawReference<K> {
    before: Option<EntryRef<K>>,
    after: Option<EntryRef<K>>,
}

impl<K: PartialEq + std::fmt::Debug> TryFrom<RawReference<K>> for ReferenceDifference<K> {
    type Error = TypeError;

    fn try_from(raw: RawReference<K>) -> TypeResult<Self> {
        match (&raw.before, &raw.after) {
            (None, None) => Err(TypeError::InvalidDifferenceEntry(
                "reference difference needs at least one side".into(),
            )),
            (Some(b), Some(a)) if b.key != a.key => Err(TypeError::InvalidDifferenceEntry(format!(
                "reference sides name different keys: {:?} and {:?}",
                b.key, a.key
            ))),
            _ => Ok(Self {
                before: raw.before,
                after: raw.after,
            }),
        }
    }
}
