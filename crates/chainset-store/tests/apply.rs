//! Store round trips: applying diff(A, B) to a store holding A yields B.

use chainset_engine::{ComparerConfig, DifferenceComparer};
use chainset_store::{EntrySource, MemoryStore, Record, SnapshotGenerator, StoreError};
use proptest::prelude::*;

fn comparer() -> DifferenceComparer<Record, String> {
    DifferenceComparer::new(Record::identity())
}

fn sorted(mut records: Vec<Record>) -> Vec<Record> {
    records.sort_by(|a, b| a.id.cmp(&b.id));
    records
}

proptest! {
    #[test]
    fn apply_difference_reaches_target(seed in any::<u64>(), entries in 0usize..40) {
        let generator = SnapshotGenerator::new(entries, entries + 20).with_templates(4).with_seed(seed);
        let states = generator.generate_many(2).unwrap();
        let (a, b) = (&states[0], &states[1]);

        let store = MemoryStore::with_entries(Record::identity(), a.iter().cloned()).unwrap();
        let diff = comparer().difference(a, b).unwrap();
        prop_assert_eq!(store.apply_difference(&diff).unwrap(), diff.len());
        prop_assert_eq!(store.snapshot(), sorted(b.clone()));
    }

    #[test]
    fn applying_the_inverse_restores(seed in any::<u64>()) {
        let states = SnapshotGenerator::new(25, 40).with_seed(seed).generate_many(2).unwrap();
        let store = MemoryStore::with_entries(Record::identity(), states[0].iter().cloned()).unwrap();
        let diff = comparer().difference(&states[0], &states[1]).unwrap();
        store.apply_difference(&diff).unwrap();
        store.apply_difference(&diff.inverse()).unwrap();
        prop_assert_eq!(store.snapshot(), sorted(states[0].clone()));
    }
}

#[test]
fn squashed_chain_applies_in_one_step() {
    let states = SnapshotGenerator::new(30, 45).with_seed(3).generate_many(4).unwrap();
    let c = comparer();
    let diffs: Vec<_> = states
        .windows(2)
        .map(|pair| c.difference(&pair[0], &pair[1]).unwrap())
        .collect();

    let store = MemoryStore::with_entries(Record::identity(), states[0].iter().cloned()).unwrap();
    store.apply_difference(&c.squash(&diffs).unwrap()).unwrap();
    assert_eq!(store.snapshot(), sorted(states[3].clone()));
}

#[test]
fn same_difference_twice_fails_cleanly() {
    let states = SnapshotGenerator::new(10, 12).with_seed(9).generate_many(2).unwrap();
    let diff = comparer().difference(&states[0], &states[1]).unwrap();
    let store = MemoryStore::with_entries(Record::identity(), states[0].iter().cloned()).unwrap();
    store.apply_difference(&diff).unwrap();
    if !diff.is_empty() {
        assert!(store.apply_difference(&diff).is_err());
        assert_eq!(store.snapshot(), sorted(states[1].clone()));
    }
}

#[test]
fn paged_sources_feed_materialization() {
    let states = SnapshotGenerator::new(200, 260).with_seed(11).generate_many(2).unwrap();
    let first = MemoryStore::with_entries(Record::identity(), states[0].iter().cloned()).unwrap();
    let second = MemoryStore::with_entries(Record::identity(), states[1].iter().cloned()).unwrap();

    let c = DifferenceComparer::with_config(
        Record::identity(),
        ComparerConfig::default().with_chunk_size(16),
    )
    .unwrap();
    let plan = c
        .reference_difference(first.keys().unwrap(), second.keys().unwrap())
        .unwrap();
    let mut pages1 = first.paged(7).unwrap();
    let mut pages2 = second.paged(13).unwrap();
    let streamed = c.materialize_difference(plan, &mut pages1, &mut pages2).unwrap();
    assert!(pages1.take_error().is_none());
    assert!(pages2.take_error().is_none());

    assert_eq!(streamed, c.difference(&states[0], &states[1]).unwrap());
}

#[test]
fn snapshot_files_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    let records = SnapshotGenerator::new(15, 30).with_seed(5).generate().unwrap();

    let store = MemoryStore::with_entries(Record::identity(), records.iter().cloned()).unwrap();
    store.save(&path).unwrap();

    let loaded = MemoryStore::new(Record::identity());
    assert_eq!(loaded.load(&path).unwrap(), 15);
    assert_eq!(loaded.snapshot(), sorted(records));

    let missing = MemoryStore::new(Record::identity()).load(&dir.path().join("absent.json"));
    assert!(matches!(missing, Err(StoreError::Io(_))));
}
