//! Grouping changes by kind.
//!
//! Every composition rule is phrased in terms of three key sets per input:
//! the keys it adds, deletes, and updates. [`KindPartition`] builds them in
//! a single pass, and [`Change`] lets the same pass run over materialized
//! entries and over reference plans alike.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use crate::entry::{DifferenceEntry, DifferenceType};
use crate::error::{TypeError, TypeResult};
use crate::reference::ReferenceDifference;

/// Anything that is a keyed change of a known kind.
pub trait Change<K> {
    fn change_key(&self) -> &K;
    fn change_kind(&self) -> DifferenceType;
}

impl<T, K> Change<K> for DifferenceEntry<T, K> {
    fn change_key(&self) -> &K {
        self.key()
    }

    fn change_kind(&self) -> DifferenceType {
        self.kind()
    }
}

impl<K> Change<K> for ReferenceDifference<K> {
    fn change_key(&self) -> &K {
        self.key()
    }

    fn change_kind(&self) -> DifferenceType {
        self.kind()
    }
}

/// The keys of a difference, split into add/delete/update buckets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KindPartition<K: Eq + Hash> {
    pub add: HashSet<K>,
    pub delete: HashSet<K>,
    pub update: HashSet<K>,
}

impl<K: Eq + Hash> Default for KindPartition<K> {
    fn default() -> Self {
        Self {
            add: HashSet::new(),
            delete: HashSet::new(),
            update: HashSet::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> KindPartition<K> {
    /// Partition a sequence of changes in one pass.
    pub fn of<'a, C>(changes: impl IntoIterator<Item = &'a C>) -> Self
    where
        C: Change<K> + 'a,
        K: 'a,
    {
        let mut partition = Self::default();
        for change in changes {
            partition
                .bucket_mut(change.change_kind())
                .insert(change.change_key().clone());
        }
        partition
    }

    /// Like [`KindPartition::of`], but a key seen twice, under any kinds,
    /// is a [`TypeError::DuplicateKey`].
    pub fn distinct<'a, C>(changes: impl IntoIterator<Item = &'a C>) -> TypeResult<Self>
    where
        C: Change<K> + 'a,
        K: fmt::Debug + 'a,
    {
        let mut partition = Self::default();
        for change in changes {
            let key = change.change_key();
            if partition.kind_of(key).is_some() {
                return Err(TypeError::DuplicateKey(format!("{key:?}")));
            }
            partition.bucket_mut(change.change_kind()).insert(key.clone());
        }
        Ok(partition)
    }
}

impl<K: Eq + Hash> KindPartition<K> {
    pub fn bucket(&self, kind: DifferenceType) -> &HashSet<K> {
        match kind {
            DifferenceType::Add => &self.add,
            DifferenceType::Delete => &self.delete,
            DifferenceType::Update => &self.update,
        }
    }

    fn bucket_mut(&mut self, kind: DifferenceType) -> &mut HashSet<K> {
        match kind {
            DifferenceType::Add => &mut self.add,
            DifferenceType::Delete => &mut self.delete,
            DifferenceType::Update => &mut self.update,
        }
    }

    /// The kind under which `key` appears, if at all.
    pub fn kind_of(&self, key: &K) -> Option<DifferenceType> {
        if self.add.contains(key) {
            Some(DifferenceType::Add)
        } else if self.delete.contains(key) {
            Some(DifferenceType::Delete)
        } else if self.update.contains(key) {
            Some(DifferenceType::Update)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.add.len() + self.delete.len() + self.update.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every key in any bucket.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.add.iter().chain(&self.delete).chain(&self.update)
    }

    /// Keys present under `mine` here and under `theirs` in `other`.
    pub fn overlap<'a>(
        &'a self,
        mine: DifferenceType,
        other: &'a KindPartition<K>,
        theirs: DifferenceType,
    ) -> impl Iterator<Item = &'a K> {
        let their_bucket = other.bucket(theirs);
        self.bucket(mine)
            .iter()
            .filter(move |key| their_bucket.contains(*key))
    }
}
