use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::Path;
use std::sync::RwLock;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use chainset_types::{Difference, DifferenceType, EntryKey, Identity};

use crate::error::{StoreError, StoreResult};
use crate::traits::EntrySource;

/// In-memory, key-ordered entry store.
///
/// Intended for tests, the CLI and embedding. Entries live in a `BTreeMap`
/// behind a `RwLock`, keyed by the identity selector; reads clone.
pub struct MemoryStore<T, K> {
    identity: Identity<T, K>,
    entries: RwLock<BTreeMap<K, T>>,
}

impl<T: Clone, K: EntryKey> MemoryStore<T, K> {
    /// Create a new empty store.
    pub fn new(identity: Identity<T, K>) -> Self {
        Self {
            identity,
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a store holding `entries`; fails on a repeated key.
    pub fn with_entries(identity: Identity<T, K>, entries: impl IntoIterator<Item = T>) -> StoreResult<Self> {
        let store = Self::new(identity);
        store.insert_all(entries)?;
        Ok(store)
    }

    pub fn identity(&self) -> &Identity<T, K> {
        &self.identity
    }

    /// Insert a new entry. Fails if its key is taken.
    pub fn insert(&self, entry: T) -> StoreResult<()> {
        self.insert_all([entry]).map(|_| ())
    }

    /// Insert entries. Fails without inserting anything if a key is taken
    /// or repeated within `entries`.
    pub fn insert_all(&self, entries: impl IntoIterator<Item = T>) -> StoreResult<usize> {
        let mut map = self.entries.write().expect("lock poisoned");
        let mut staged = BTreeMap::new();
        for entry in entries {
            let key = self.identity.key(&entry);
            if map.contains_key(&key) || staged.contains_key(&key) {
                return Err(StoreError::AlreadyPresent(format!("{key:?}")));
            }
            staged.insert(key, entry);
        }
        let count = staged.len();
        map.extend(staged);
        Ok(count)
    }

    /// Replace an existing entry. Fails if its key isn't stored.
    pub fn update(&self, entry: T) -> StoreResult<()> {
        let key = self.identity.key(&entry);
        let mut map = self.entries.write().expect("lock poisoned");
        match map.get_mut(&key) {
            Some(slot) => {
                *slot = entry;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("{key:?}"))),
        }
    }

    /// Insert or replace. Returns the previous entry, if any.
    pub fn upsert(&self, entry: T) -> Option<T> {
        let key = self.identity.key(&entry);
        self.entries.write().expect("lock poisoned").insert(key, entry)
    }

    /// Remove and return the entry under `key`.
    pub fn delete(&self, key: &K) -> StoreResult<T> {
        self.entries
            .write()
            .expect("lock poisoned")
            .remove(key)
            .ok_or_else(|| StoreError::NotFound(format!("{key:?}")))
    }

    /// Remove everything. Returns how many entries were dropped.
    pub fn reset(&self) -> usize {
        let mut map = self.entries.write().expect("lock poisoned");
        let count = map.len();
        map.clear();
        count
    }

    /// All entries, ascending by key.
    pub fn snapshot(&self) -> Vec<T> {
        self.entries.read().expect("lock poisoned").values().cloned().collect()
    }

    /// Apply a difference computed against this store's current contents.
    ///
    /// An add needs its key absent; a delete or update needs the stored
    /// value to equal the change's before-value, and an update must actually
    /// change it. Every change is checked before any is applied, so a failed
    /// call leaves the store untouched. Returns the number of changes
    /// applied.
    pub fn apply_difference(&self, difference: &Difference<T, K>) -> StoreResult<usize> {
        let mut map = self.entries.write().expect("lock poisoned");

        for change in difference {
            let key = change.key();
            let stored = map.get(key);
            match change.kind() {
                DifferenceType::Add => {
                    if stored.is_some() {
                        return Err(StoreError::AlreadyPresent(format!("{key:?}")));
                    }
                }
                DifferenceType::Delete | DifferenceType::Update => {
                    let Some(stored) = stored else {
                        return Err(StoreError::NotFound(format!("{key:?}")));
                    };
                    if !self.identity.option_equal(change.before(), Some(stored)) {
                        return Err(StoreError::Stale {
                            key: format!("{key:?}"),
                            reason: "stored value differs from the change's before-value".into(),
                        });
                    }
                    if change.kind() == DifferenceType::Update
                        && self.identity.option_equal(change.after(), Some(stored))
                    {
                        return Err(StoreError::Stale {
                            key: format!("{key:?}"),
                            reason: "after-value already stored".into(),
                        });
                    }
                }
            }
        }

        for change in difference {
            match change.after() {
                Some(after) => {
                    map.insert(change.key().clone(), after.clone());
                }
                None => {
                    map.remove(change.key());
                }
            }
        }

        debug!(
            additions = difference.additions(),
            removals = difference.removals(),
            modifications = difference.modifications(),
            stored = map.len(),
            "applied difference"
        );
        Ok(difference.len())
    }
}

impl<T: Clone + Serialize, K: EntryKey> MemoryStore<T, K> {
    /// All entries as a JSON array, ascending by key.
    pub fn export_json(&self) -> StoreResult<String> {
        let map = self.entries.read().expect("lock poisoned");
        let values: Vec<&T> = map.values().collect();
        serde_json::to_string_pretty(&values).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Write [`export_json`](Self::export_json) output to a file.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        std::fs::write(path, self.export_json()?)?;
        Ok(())
    }
}

impl<T: Clone + DeserializeOwned, K: EntryKey> MemoryStore<T, K> {
    /// Insert every entry of a JSON array, or none if any key is taken.
    pub fn import_json(&self, json: &str) -> StoreResult<usize> {
        let entries: Vec<T> =
            serde_json::from_str(json).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.insert_all(entries)
    }

    /// Import a JSON array from a file.
    pub fn load(&self, path: &Path) -> StoreResult<usize> {
        let json = std::fs::read_to_string(path)?;
        self.import_json(&json)
    }
}

impl<T: Clone, K: EntryKey> EntrySource<T, K> for MemoryStore<T, K> {
    fn keys(&self) -> StoreResult<Vec<K>> {
        Ok(self.entries.read().expect("lock poisoned").keys().cloned().collect())
    }

    fn get(&self, key: &K) -> StoreResult<Option<T>> {
        Ok(self.entries.read().expect("lock poisoned").get(key).cloned())
    }

    fn scan_after(&self, last: Option<&K>, limit: usize) -> StoreResult<Vec<T>> {
        let map = self.entries.read().expect("lock poisoned");
        let lower = match last {
            Some(key) => Bound::Excluded(key),
            None => Bound::Unbounded,
        };
        Ok(map
            .range::<K, _>((lower, Bound::Unbounded))
            .take(limit)
            .map(|(_, entry)| entry.clone())
            .collect())
    }

    fn key_of(&self, entry: &T) -> K {
        self.identity.key(entry)
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.entries.read().expect("lock poisoned").len())
    }
}

impl<T, K> std::fmt::Debug for MemoryStore<T, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.entries.read().map(|m| m.len()).unwrap_or_default();
        f.debug_struct("MemoryStore")
            .field("entry_count", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Row = (u32, &'static str);

    fn store(rows: &[Row]) -> MemoryStore<Row, u32> {
        MemoryStore::with_entries(Identity::new(|r: &Row| r.0), rows.iter().copied()).unwrap()
    }

    // -----------------------------------------------------------------------
    // Core CRUD
    // -----------------------------------------------------------------------

    #[test]
    fn insert_rejects_taken_keys() {
        let s = store(&[(1, "a")]);
        assert!(matches!(s.insert((1, "b")), Err(StoreError::AlreadyPresent(_))));
        s.insert((2, "b")).unwrap();
        assert_eq!(s.len().unwrap(), 2);
    }

    #[test]
    fn insert_all_is_all_or_nothing() {
        let s = store(&[(5, "e")]);
        let err = s.insert_all([(1, "a"), (2, "b"), (5, "x"), (6, "f")]).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyPresent(_)));
        assert_eq!(s.snapshot(), vec![(5, "e")]);

        assert!(s.insert_all([(7, "g"), (7, "h")]).is_err());
        assert_eq!(s.len().unwrap(), 1);

        assert_eq!(s.insert_all([(3, "c"), (1, "a")]).unwrap(), 2);
        assert_eq!(s.keys().unwrap(), vec![1, 3, 5]);
    }

    #[test]
    fn update_and_delete_need_presence() {
        let s = store(&[(1, "a")]);
        s.update((1, "b")).unwrap();
        assert_eq!(s.get(&1).unwrap(), Some((1, "b")));
        assert!(matches!(s.update((2, "x")), Err(StoreError::NotFound(_))));
        assert_eq!(s.delete(&1).unwrap(), (1, "b"));
        assert!(matches!(s.delete(&1), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn upsert_and_reset() {
        let s = store(&[(1, "a")]);
        assert_eq!(s.upsert((1, "b")), Some((1, "a")));
        assert_eq!(s.upsert((2, "c")), None);
        assert_eq!(s.reset(), 2);
        assert!(s.is_empty().unwrap());
    }

    // -----------------------------------------------------------------------
    // Ordered and paged scans
    // -----------------------------------------------------------------------

    #[test]
    fn scans_are_key_ordered() {
        let s = store(&[(5, "e"), (1, "a"), (3, "c")]);
        assert_eq!(s.keys().unwrap(), vec![1, 3, 5]);
        assert_eq!(s.scan().unwrap(), vec![(1, "a"), (3, "c"), (5, "e")]);
        assert_eq!(s.scan_after(Some(&1), 1).unwrap(), vec![(3, "c")]);
        assert_eq!(s.scan_after(Some(&2), 10).unwrap(), vec![(3, "c"), (5, "e")]);
        assert!(s.scan_after(Some(&5), 10).unwrap().is_empty());
    }

    #[test]
    fn paged_iteration_visits_everything_once() {
        let rows: Vec<Row> = (0..23).map(|k| (k, "v")).collect();
        let s = store(&rows);
        let mut paged = s.paged(5).unwrap();
        let seen: Vec<Row> = paged.by_ref().collect();
        assert_eq!(seen, rows);
        assert_eq!(paged.pages_fetched(), 5);
        assert!(paged.take_error().is_none());
        assert!(s.paged(0).is_err());
    }

    #[test]
    fn get_many_keeps_order() {
        let s = store(&[(1, "a"), (2, "b")]);
        assert_eq!(s.get_many(&[2, 9, 1]).unwrap(), vec![Some((2, "b")), None, Some((1, "a"))]);
    }

    // -----------------------------------------------------------------------
    // Applying differences
    // -----------------------------------------------------------------------

    #[test]
    fn apply_checks_every_change_first() {
        let s = store(&[(1, "a"), (2, "b")]);
        let id = s.identity().clone();
        let diff = Difference::from_entries(vec![
            id.delete((1, "a")),
            id.update((2, "stale"), (2, "c")).unwrap().unwrap(),
        ])
        .unwrap();
        assert!(matches!(s.apply_difference(&diff), Err(StoreError::Stale { .. })));
        // Nothing applied.
        assert_eq!(s.snapshot(), vec![(1, "a"), (2, "b")]);
    }

    #[test]
    fn apply_rejects_present_adds_and_missing_deletes() {
        let s = store(&[(1, "a")]);
        let id = s.identity().clone();
        let add = Difference::from_entries(vec![id.add((1, "x"))]).unwrap();
        assert!(matches!(s.apply_difference(&add), Err(StoreError::AlreadyPresent(_))));
        let delete = Difference::from_entries(vec![id.delete((7, "x"))]).unwrap();
        assert!(matches!(s.apply_difference(&delete), Err(StoreError::NotFound(_))));
    }

    // -----------------------------------------------------------------------
    // JSON
    // -----------------------------------------------------------------------

    #[test]
    fn json_export_import() {
        let s: MemoryStore<(u32, String), u32> = MemoryStore::new(Identity::new(|r: &(u32, String)| r.0));
        assert_eq!(s.import_json(r#"[[2, "b"], [1, "a"]]"#).unwrap(), 2);
        let json = s.export_json().unwrap();

        let copy: MemoryStore<(u32, String), u32> = MemoryStore::new(Identity::new(|r: &(u32, String)| r.0));
        copy.import_json(&json).unwrap();
        assert_eq!(copy.snapshot(), s.snapshot());
        assert!(matches!(copy.import_json(&json), Err(StoreError::AlreadyPresent(_))));
        assert!(matches!(copy.import_json("{"), Err(StoreError::Serialization(_))));

        let err = copy.import_json(r#"[[9, "z"], [1, "again"]]"#).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyPresent(_)));
        assert_eq!(copy.snapshot(), s.snapshot());
    }
}
