//! Algebraic laws of the difference algebra.
//!
//!  - No-op:     diff(A, A) = ∅
//!  - Diamond:   progression(diff(A, B), diff(A, C)) = diff(B, C)
//!  - Chain:     squash(diff(S0, S1), ..., diff(Sn-1, Sn)) = diff(S0, Sn)
//!  - Chunking:  materialized results don't depend on the chunk size

use chainset_engine::{
    ComparerConfig, ConsistencyRule, DifferenceComparer, EngineError,
};
use chainset_types::{Difference, DifferenceType, Identity, ReferenceDifference, TypeError};
use proptest::prelude::*;

type Row = (u32, u8);

fn identity() -> Identity<Row, u32> {
    Identity::new(|r: &Row| r.0)
}

fn comparer() -> DifferenceComparer<Row, u32> {
    DifferenceComparer::new(identity())
}

fn chunked(chunk_size: usize) -> DifferenceComparer<Row, u32> {
    DifferenceComparer::with_config(identity(), ComparerConfig::default().with_chunk_size(chunk_size))
        .unwrap()
}

/// Small key and value spaces so that snapshots overlap heavily.
fn snapshot() -> impl Strategy<Value = Vec<Row>> {
    prop::collection::btree_map(0u32..24, 0u8..3, 0..16).prop_map(|m| m.into_iter().collect())
}

proptest! {
    #[test]
    fn difference_with_self_is_empty(a in snapshot()) {
        prop_assert!(comparer().difference(&a, &a).unwrap().is_empty());
    }

    #[test]
    fn difference_swapped_is_inverse(a in snapshot(), b in snapshot()) {
        let c = comparer();
        prop_assert_eq!(c.difference(&b, &a).unwrap(), c.difference(&a, &b).unwrap().into_inverse());
    }

    #[test]
    fn diamond_law(a in snapshot(), b in snapshot(), cc in snapshot()) {
        let c = comparer();
        let ab = c.difference(&a, &b).unwrap();
        let ac = c.difference(&a, &cc).unwrap();
        let bc = c.difference(&b, &cc).unwrap();
        prop_assert_eq!(c.progression(&ab, &ac).unwrap(), bc.clone());
        prop_assert_eq!(c.progression(&ac, &ab).unwrap(), bc.into_inverse());
    }

    #[test]
    fn chain_law(states in prop::collection::vec(snapshot(), 2..6)) {
        let c = comparer();
        let diffs: Vec<Difference<Row, u32>> = states
            .windows(2)
            .map(|pair| c.difference(&pair[0], &pair[1]).unwrap())
            .collect();
        let expected = c.difference(&states[0], &states[states.len() - 1]).unwrap();
        prop_assert_eq!(c.squash(&diffs).unwrap(), expected);
    }

    #[test]
    fn chunk_size_does_not_matter(a in snapshot(), b in snapshot(), cc in snapshot(), chunk in 1usize..12) {
        let whole = comparer();
        let parts = chunked(chunk);
        prop_assert_eq!(parts.difference(&a, &b).unwrap(), whole.difference(&a, &b).unwrap());

        let ab = whole.difference(&a, &b).unwrap();
        let ac = whole.difference(&a, &cc).unwrap();
        let bc = whole.difference(&b, &cc).unwrap();
        prop_assert_eq!(parts.progression(&ab, &ac).unwrap(), whole.progression(&ab, &ac).unwrap());
        prop_assert_eq!(parts.squash_pair(&ab, &bc).unwrap(), whole.squash_pair(&ab, &bc).unwrap());
    }

    #[test]
    fn planned_difference_over_streams(a in snapshot(), b in snapshot(), chunk in 1usize..8) {
        let c = chunked(chunk);
        let plan = c
            .reference_difference(a.iter().map(|r| r.0), b.iter().map(|r| r.0))
            .unwrap();
        // Sources need not be ordered.
        let streamed = c
            .materialize_difference(plan, a.iter().rev().copied(), b.iter().copied())
            .unwrap();
        prop_assert_eq!(streamed, c.difference(&a, &b).unwrap());
    }

    #[test]
    fn trivial_plans_compose_like_differences(a in snapshot(), b in snapshot(), cc in snapshot()) {
        let c = comparer();
        let ab = c.difference(&a, &b).unwrap();
        let bc = c.difference(&b, &cc).unwrap();
        let ac = c.difference(&a, &cc).unwrap();

        let trivial = |d: &Difference<Row, u32>| -> Vec<ReferenceDifference<u32>> {
            d.iter().map(ReferenceDifference::trivial).collect()
        };

        let plan = c.reference_progression(&trivial(&ab), &trivial(&ac)).unwrap();
        prop_assert_eq!(c.materialize_progression(plan, &ab, &ac).unwrap(), bc.clone());

        let plan = c.reference_squash(&trivial(&ab), &trivial(&bc)).unwrap();
        prop_assert_eq!(c.materialize_squash(plan, &ab, &bc).unwrap(), ac);
    }

    #[test]
    fn consistent_inputs_validate(a in snapshot(), b in snapshot(), cc in snapshot()) {
        let c = comparer();
        let ab = c.difference(&a, &b).unwrap();
        let ac = c.difference(&a, &cc).unwrap();
        let bc = c.difference(&b, &cc).unwrap();
        prop_assert!(c.validator().check_progression(&ab, &ac).is_valid());
        prop_assert!(c.validator().check_squash(&ab, &bc).is_valid());
    }
}

// ============================================================================
// Fixed scenarios
// ============================================================================

type Named = (u32, &'static str);

fn named() -> DifferenceComparer<Named, u32> {
    DifferenceComparer::new(Identity::new(|r: &Named| r.0))
}

#[test]
fn scenario_update_and_add() {
    let c = named();
    let a = [(1, "x")];
    let b = [(1, "y"), (2, "z")];
    let cc = [(2, "z")];

    let ab = c.difference(&a, &b).unwrap();
    assert_eq!(ab.len(), 2);
    let one = ab.get(&1).unwrap();
    assert_eq!(one.kind(), DifferenceType::Update);
    assert_eq!((one.before(), one.after()), (Some(&(1, "x")), Some(&(1, "y"))));
    assert_eq!(ab.get(&2).unwrap().kind(), DifferenceType::Add);

    assert_eq!(c.difference(&b, &a).unwrap(), ab.inverse());

    let ac = c.difference(&a, &cc).unwrap();
    let progressed = c.progression(&ab, &ac).unwrap();
    assert_eq!(progressed, c.difference(&b, &cc).unwrap());
    assert_eq!(progressed.len(), 1);
    let one = progressed.get(&1).unwrap();
    assert_eq!(one.kind(), DifferenceType::Delete);
    assert_eq!(one.before(), Some(&(1, "y")));
}

#[test]
fn added_then_deleted_squashes_away() {
    let c = named();
    let s0: [Named; 0] = [];
    let s1 = [(7, "tmp")];
    let s2 = [(8, "kept")];
    let d01 = c.difference(&s0, &s1).unwrap();
    let d12 = c.difference(&s1, &s2).unwrap();
    let squashed = c.squash([&d01, &d12]).unwrap();
    assert!(!squashed.contains_key(&7));
    assert_eq!(squashed.len(), 1);
    assert_eq!(squashed.additions(), 1);
}

#[test]
fn duplicate_keys_rejected_before_composition() {
    let c = named();
    let err = c.difference(&[(1, "a"), (1, "b")], &[]).unwrap_err();
    assert_eq!(err, EngineError::Type(TypeError::DuplicateKey("1".into())));

    let plan = vec![
        ReferenceDifference::added(1, chainset_types::RefTag::Stored),
        ReferenceDifference::deleted(1, chainset_types::RefTag::Stored),
    ];
    assert!(matches!(
        c.reference_progression(&plan, &[]),
        Err(EngineError::Type(TypeError::DuplicateKey(_)))
    ));
    assert!(matches!(
        c.reference_progression(&[], &plan),
        Err(EngineError::Type(TypeError::DuplicateKey(_)))
    ));
    assert!(matches!(
        c.reference_squash(&plan, &[]),
        Err(EngineError::Type(TypeError::DuplicateKey(_)))
    ));
    assert!(matches!(
        c.reference_squash(&[], &plan),
        Err(EngineError::Type(TypeError::DuplicateKey(_)))
    ));
}

#[test]
fn unresolvable_plan_is_missing_data() {
    let c = named();
    let plan = c.reference_difference(vec![1, 2, 3], vec![3]).unwrap();
    let err = c.materialize_difference(plan, &[(1, "a")], &[(3, "c")]).unwrap_err();
    match err {
        EngineError::MissingData { count, keys } => {
            assert_eq!(count, 2);
            assert_eq!(keys, vec!["2".to_string(), "3".to_string()]);
        }
        other => panic!("expected missing data, got {other:?}"),
    }
}

#[test]
fn inconsistent_progression_is_rejected() {
    let c = named();
    let ab = c.difference(&[], &[(1, "x")]).unwrap();
    let ac = c.difference(&[(1, "y")], &[]).unwrap();
    let err = c.progression(&ab, &ac).unwrap_err();
    assert_eq!(
        err,
        EngineError::Inconsistency {
            rule: ConsistencyRule::ProgressionAddDelete,
            key: "1".into()
        }
    );
}

#[test]
fn broken_chain_is_rejected() {
    let c = named();
    let d01 = c.difference(&[(1, "a")], &[(1, "b")]).unwrap();
    let d12 = c.difference(&[(1, "c")], &[(1, "d")]).unwrap();
    assert!(matches!(
        c.squash([&d01, &d12]),
        Err(EngineError::Inconsistency {
            rule: ConsistencyRule::ConnectingValue { .. },
            ..
        })
    ));
}

// ============================================================================
// Permutations of four fixed states
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
struct Entry {
    id: &'static str,
    name: &'static str,
    group: &'static str,
    flag: &'static str,
}

const fn entry(id: &'static str, name: &'static str, group: &'static str, flag: &'static str) -> Entry {
    Entry { id, name, group, flag }
}

fn states() -> [Vec<Entry>; 4] {
    [
        vec![entry("1A", "111", "1", "B"), entry("1B", "111", "2", "A"), entry("2A", "222", "1", "A")],
        vec![entry("1A", "111", "1", "A"), entry("1B", "111", "2", "A"), entry("2B", "222", "2", "A")],
        vec![entry("1A", "111", "1", "A"), entry("2A", "222", "1", "B"), entry("2B", "222", "2", "A")],
        vec![entry("1B", "222", "2", "B"), entry("2A", "222", "2", "A"), entry("2B", "111", "1", "A")],
    ]
}

fn permutations(items: &[usize]) -> Vec<Vec<usize>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for (i, &first) in items.iter().enumerate() {
        let mut rest = items.to_vec();
        rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, first);
            out.push(tail);
        }
    }
    out
}

#[test]
fn fixed_states_progression() {
    let c = DifferenceComparer::new(Identity::new(|e: &Entry| e.id));
    let [s0, s1, s2, _] = states();
    let d01 = c.difference(&s0, &s1).unwrap();
    let d02 = c.difference(&s0, &s2).unwrap();
    assert_eq!(c.progression(&d01, &d02).unwrap(), c.difference(&s1, &s2).unwrap());
}

#[test]
fn fixed_states_squash_in_every_order() {
    let c = DifferenceComparer::new(Identity::new(|e: &Entry| e.id));
    let states = states();
    let orders = permutations(&[0, 1, 2, 3]);
    assert_eq!(orders.len(), 24);

    for order in orders {
        let chain: Vec<&Vec<Entry>> = order.iter().map(|&i| &states[i]).collect();
        let diffs: Vec<Difference<Entry, &str>> = chain
            .windows(2)
            .map(|pair| c.difference(pair[0], pair[1]).unwrap())
            .collect();
        let squashed = c.squash(&diffs).unwrap();
        let direct = c.difference(chain[0], chain[chain.len() - 1]).unwrap();
        assert_eq!(squashed, direct, "order {order:?}");
    }
}
