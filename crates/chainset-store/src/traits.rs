use std::collections::VecDeque;

use crate::error::{StoreError, StoreResult};

/// Keyed, ordered source of snapshot entries.
///
/// All implementations must satisfy these invariants:
/// - Keys are unique; each key maps to at most one entry.
/// - `keys()`, `scan()` and paged scans return entries in ascending key
///   order.
/// - `scan_after(last, limit)` returns the next at most `limit` entries with
///   a key strictly greater than `last`, so paging never skips or repeats an
///   entry while the store is unchanged.
pub trait EntrySource<T, K> {
    /// Every stored key, ascending.
    fn keys(&self) -> StoreResult<Vec<K>>;

    /// The entry stored under `key`, if any.
    fn get(&self, key: &K) -> StoreResult<Option<T>>;

    /// Up to `limit` entries following `last` (from the start if `None`).
    fn scan_after(&self, last: Option<&K>, limit: usize) -> StoreResult<Vec<T>>;

    /// Key of an entry, used to continue paging.
    fn key_of(&self, entry: &T) -> K;

    /// Number of stored entries.
    fn len(&self) -> StoreResult<usize> {
        Ok(self.keys()?.len())
    }

    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Entries for several keys at once, in the order asked for.
    ///
    /// Default implementation calls `get()` for each key.
    fn get_many(&self, keys: &[K]) -> StoreResult<Vec<Option<T>>> {
        keys.iter().map(|key| self.get(key)).collect()
    }

    /// Every entry, ascending by key.
    fn scan(&self) -> StoreResult<Vec<T>> {
        self.scan_after(None, usize::MAX)
    }

    /// A lazy iterator over all entries that fetches `page_size` at a time.
    fn paged(&self, page_size: usize) -> StoreResult<Paged<'_, Self, T, K>>
    where
        Self: Sized,
    {
        if page_size == 0 {
            return Err(StoreError::InvalidArgument(
                "page size must be at least 1".into(),
            ));
        }
        Ok(Paged {
            source: self,
            page_size,
            last: None,
            buffer: VecDeque::new(),
            exhausted: false,
            error: None,
            pages: 0,
        })
    }
}

/// Keyset-paged iteration over an [`EntrySource`].
///
/// A failed page read ends the iteration; the error is kept and can be
/// collected with [`Paged::take_error`] once the consumer is done.
pub struct Paged<'a, S, T, K> {
    source: &'a S,
    page_size: usize,
    last: Option<K>,
    buffer: VecDeque<T>,
    exhausted: bool,
    error: Option<StoreError>,
    pages: usize,
}

impl<S, T, K> Paged<'_, S, T, K> {
    /// Pages fetched so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    /// The error that ended iteration early, if any.
    pub fn take_error(&mut self) -> Option<StoreError> {
        self.error.take()
    }
}

impl<S: EntrySource<T, K>, T, K> Iterator for Paged<'_, S, T, K> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.buffer.is_empty() && !self.exhausted {
            match self.source.scan_after(self.last.as_ref(), self.page_size) {
                Ok(page) => {
                    self.pages += 1;
                    self.exhausted = page.len() < self.page_size;
                    if let Some(tail) = page.last() {
                        self.last = Some(self.source.key_of(tail));
                    }
                    self.buffer.extend(page);
                }
                Err(err) => {
                    self.exhausted = true;
                    self.error = Some(err);
                }
            }
        }
        self.buffer.pop_front()
    }
}
