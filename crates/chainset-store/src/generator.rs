//! Random snapshots for tests, benchmarks and the CLI.
//!
//! A snapshot draws `entries` distinct ids from `0..ids` and gives each a
//! value picked from a small pool of templates, so two snapshots generated
//! with the same parameters overlap in keys and often agree on values. That
//! mix of adds, deletes, updates and unchanged records is what difference
//! computations need to be exercised against.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use chainset_types::Identity;

use crate::error::{StoreError, StoreResult};

/// A generated record. `id` is the key; the other fields come from a
/// template.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub name: String,
    pub group: String,
    pub flag: String,
}

impl Record {
    pub fn new(id: impl Into<String>, name: impl Into<String>, group: impl Into<String>, flag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            group: group.into(),
            flag: flag.into(),
        }
    }

    /// Identity keyed by `id`, compared on every field.
    pub fn identity() -> Identity<Record, String> {
        Identity::new(|r: &Record| r.id.clone())
    }
}

/// Parameters for [`SnapshotGenerator::generate`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotGenerator {
    /// Records per snapshot.
    pub entries: usize,
    /// Size of the id space records draw from. Must be at least `entries`.
    pub ids: usize,
    /// Size of the template pool; defaults to `floor(sqrt(entries))`.
    pub templates: Option<usize>,
    /// Seed for reproducible output.
    pub seed: Option<u64>,
}

impl SnapshotGenerator {
    pub fn new(entries: usize, ids: usize) -> Self {
        Self {
            entries,
            ids,
            templates: None,
            seed: None,
        }
    }

    pub fn with_templates(mut self, templates: usize) -> Self {
        self.templates = Some(templates);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn template_count(&self) -> usize {
        self.templates
            .unwrap_or_else(|| (self.entries as f64).sqrt().floor() as usize)
            .max(1)
    }

    /// One random snapshot, in no particular order.
    pub fn generate(&self) -> StoreResult<Vec<Record>> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.generate_with(&mut rng)
    }

    /// `count` snapshots drawn from one random stream.
    pub fn generate_many(&self, count: usize) -> StoreResult<Vec<Vec<Record>>> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        (0..count).map(|_| self.generate_with(&mut rng)).collect()
    }

    fn generate_with<R: Rng>(&self, rng: &mut R) -> StoreResult<Vec<Record>> {
        if self.ids < self.entries {
            return Err(StoreError::InvalidArgument(format!(
                "id space of {} can't hold {} distinct entries",
                self.ids, self.entries
            )));
        }
        let pool = templates(self.template_count());
        Ok(index::sample(rng, self.ids, self.entries)
            .into_iter()
            .map(|id| {
                let template = &pool[rng.gen_range(0..pool.len())];
                Record {
                    id: id.to_string(),
                    ..template.clone()
                }
            })
            .collect())
    }
}

/// `n` distinct templates: a cube of `(name, group, flag)` digits, topped up
/// along one more `name` layer when `n` isn't a perfect cube.
fn templates(n: usize) -> Vec<Record> {
    let side = (n as f64).cbrt().floor() as usize;
    let mut pool = Vec::with_capacity(n);
    'cube: for i in 0..side {
        for j in 0..side {
            for k in 0..side {
                if pool.len() == n {
                    break 'cube;
                }
                pool.push(Record::new("", i.to_string(), j.to_string(), k.to_string()));
            }
        }
    }
    let mut extra = 0;
    while pool.len() < n {
        let (j, k) = if side == 0 { (extra, 0) } else { (extra / side, extra % side) };
        pool.push(Record::new("", side.to_string(), j.to_string(), k.to_string()));
        extra += 1;
    }
    pool
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn template_pool_is_distinct() {
        for n in [1, 2, 7, 8, 9, 30, 64, 100] {
            let pool = templates(n);
            assert_eq!(pool.len(), n);
            let distinct: HashSet<_> = pool.iter().collect();
            assert_eq!(distinct.len(), n, "pool of {n}");
        }
    }

    #[test]
    fn ids_are_distinct_and_in_range() {
        let snapshot = SnapshotGenerator::new(50, 60).with_seed(7).generate().unwrap();
        assert_eq!(snapshot.len(), 50);
        let ids: HashSet<u32> = snapshot.iter().map(|r| r.id.parse().unwrap()).collect();
        assert_eq!(ids.len(), 50);
        assert!(ids.iter().all(|&id| id < 60));
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let generator = SnapshotGenerator::new(20, 40).with_templates(5).with_seed(42);
        assert_eq!(generator.generate().unwrap(), generator.generate().unwrap());
        let many = generator.generate_many(3).unwrap();
        assert_eq!(many.len(), 3);
        assert_eq!(many[0], generator.generate().unwrap());
    }

    #[test]
    fn too_few_ids_rejected() {
        assert!(matches!(
            SnapshotGenerator::new(10, 5).generate(),
            Err(StoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn empty_snapshot() {
        assert!(SnapshotGenerator::new(0, 0).generate().unwrap().is_empty());
    }
}
