//! Consistency checks for composition inputs.
//!
//! Progression and squash are only meaningful for inputs that could really
//! have come from a shared base (progression) or a chain of snapshots
//! (squash). The checks here reject everything else. `check_*` collects every
//! violation into a [`ValidationReport`]; `validate_*` fails on the first.

use std::collections::HashMap;

use tracing::debug;

use chainset_types::{
    Difference, DifferenceType, EntryKey, Identity, KindPartition, ReferenceDifference,
};

use crate::error::{ConsistencyRule, EngineError, EngineResult};

use DifferenceType::{Add, Delete, Update};

/// A consistency rule broken at one key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub rule: ConsistencyRule,
    pub key: String,
}

impl From<Violation> for EngineError {
    fn from(v: Violation) -> Self {
        EngineError::Inconsistency {
            rule: v.rule,
            key: v.key,
        }
    }
}

/// Result of checking composition inputs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Distinct keys examined.
    pub keys_checked: usize,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// `Ok` if valid, otherwise the first violation as an error.
    pub fn into_result(self) -> EngineResult<()> {
        match self.violations.into_iter().next() {
            None => Ok(()),
            Some(violation) => Err(violation.into()),
        }
    }
}

/// Violations found so far, sorted by key and rule when finished.
struct Findings<'k, K> {
    found: Vec<(&'k K, ConsistencyRule)>,
}

impl<'k, K: EntryKey> Findings<'k, K> {
    fn new() -> Self {
        Self { found: Vec::new() }
    }

    fn push(&mut self, key: &'k K, rule: ConsistencyRule) {
        self.found.push((key, rule));
    }

    fn finish(mut self, keys_checked: usize) -> ValidationReport {
        self.found.sort();
        self.found.dedup();
        ValidationReport {
            keys_checked,
            violations: self
                .found
                .into_iter()
                .map(|(key, rule)| Violation {
                    rule,
                    key: format!("{key:?}"),
                })
                .collect(),
        }
    }
}

fn progression_kind_rule(first: DifferenceType, second: DifferenceType) -> Option<ConsistencyRule> {
    match (first, second) {
        (Add, Delete) | (Delete, Add) => Some(ConsistencyRule::ProgressionAddDelete),
        (Add, Update) | (Update, Add) => Some(ConsistencyRule::ProgressionAddUpdate),
        _ => None,
    }
}

fn squash_kind_rule(before: DifferenceType, after: DifferenceType) -> Option<ConsistencyRule> {
    match (before, after) {
        (Add, Add) => Some(ConsistencyRule::SquashAddAdd),
        (Delete, Delete) => Some(ConsistencyRule::SquashDeleteDelete),
        (Delete, Update) => Some(ConsistencyRule::SquashDeleteUpdate),
        (Update, Add) => Some(ConsistencyRule::SquashUpdateAdd),
        _ => None,
    }
}

fn check_kinds<'k, K: EntryKey>(
    first: &'k KindPartition<K>,
    second: &'k KindPartition<K>,
    rule_for: fn(DifferenceType, DifferenceType) -> Option<ConsistencyRule>,
) -> ValidationReport {
    let mut findings = Findings::new();
    let mut shared = 0;
    for key in first.keys() {
        let Some(theirs) = second.kind_of(key) else {
            continue;
        };
        shared += 1;
        if let Some(mine) = first.kind_of(key) {
            if let Some(rule) = rule_for(mine, theirs) {
                findings.push(key, rule);
            }
        }
    }
    findings.finish(shared)
}

/// Kind-only progression check: no key may be added in one input and
/// deleted or updated in the other.
pub fn check_progression_kinds<K: EntryKey>(
    first: &KindPartition<K>,
    second: &KindPartition<K>,
) -> ValidationReport {
    check_kinds(first, second, progression_kind_rule)
}

/// Kind-only squash check: rejects Add/Add, Delete/Delete, Delete/Update and
/// Update/Add.
pub fn check_squash_kinds<K: EntryKey>(
    before: &KindPartition<K>,
    after: &KindPartition<K>,
) -> ValidationReport {
    check_kinds(before, after, squash_kind_rule)
}

/// Partition a plan by kind, failing on a key planned twice.
pub fn plan_partition<K: EntryKey>(plan: &[ReferenceDifference<K>]) -> EngineResult<KindPartition<K>> {
    Ok(KindPartition::distinct(plan)?)
}

/// Checks materialized differences against the comparer's identity.
pub struct Validator<'a, T, K> {
    identity: &'a Identity<T, K>,
}

impl<'a, T, K: EntryKey> Validator<'a, T, K> {
    pub fn new(identity: &'a Identity<T, K>) -> Self {
        Self { identity }
    }

    fn key_findings<'k>(&self, difference: &'k Difference<T, K>, findings: &mut Findings<'k, K>) {
        for entry in difference {
            let consistent = [entry.before(), entry.after()]
                .into_iter()
                .flatten()
                .all(|value| self.identity.key(value) == *entry.key());
            if !consistent {
                findings.push(entry.key(), ConsistencyRule::KeySelectorMismatch);
            }
        }
    }

    /// Every entry must be stored under the key the identity selector gives
    /// for its values.
    pub fn check_keys(&self, difference: &Difference<T, K>) -> ValidationReport {
        let mut findings = Findings::new();
        self.key_findings(difference, &mut findings);
        findings.finish(difference.len())
    }

    /// Check that `first` and `second` could both start from one snapshot.
    pub fn check_progression(
        &self,
        first: &Difference<T, K>,
        second: &Difference<T, K>,
    ) -> ValidationReport {
        let mut findings = Findings::new();
        self.key_findings(first, &mut findings);
        self.key_findings(second, &mut findings);

        let mut shared = 0;
        for entry in first {
            let Some(other) = second.get(entry.key()) else {
                continue;
            };
            shared += 1;
            let rule = match (entry.kind(), other.kind()) {
                (Add, Add) => None,
                (Delete, Delete) => Some(ConsistencyRule::ProgressionUnequalDelete),
                (Update, Update) => Some(ConsistencyRule::ProgressionUnequalUpdate),
                (Delete, Update) | (Update, Delete) => Some(ConsistencyRule::ProgressionOriginMismatch),
                (mine, theirs) => {
                    if let Some(rule) = progression_kind_rule(mine, theirs) {
                        findings.push(entry.key(), rule);
                    }
                    None
                }
            };
            // Both start from the base snapshot, so they must agree on it.
            if let Some(rule) = rule {
                if !self.identity.option_equal(entry.before(), other.before()) {
                    findings.push(entry.key(), rule);
                }
            }
        }

        let report = findings.finish(first.len() + second.len() - shared);
        debug!(
            keys = report.keys_checked,
            violations = report.violations.len(),
            "checked progression inputs"
        );
        report
    }

    /// Check that `after` can follow `before` in a chain.
    pub fn check_squash(&self, before: &Difference<T, K>, after: &Difference<T, K>) -> ValidationReport {
        let mut findings = Findings::new();
        self.key_findings(before, &mut findings);
        self.key_findings(after, &mut findings);

        let mut shared = 0;
        for entry in before {
            let Some(next) = after.get(entry.key()) else {
                continue;
            };
            shared += 1;
            let (mine, theirs) = (entry.kind(), next.kind());
            if let Some(rule) = squash_kind_rule(mine, theirs) {
                findings.push(entry.key(), rule);
            } else if !self.identity.option_equal(entry.after(), next.before()) {
                findings.push(
                    entry.key(),
                    ConsistencyRule::ConnectingValue {
                        before: mine,
                        after: theirs,
                    },
                );
            }
        }

        let report = findings.finish(before.len() + after.len() - shared);
        debug!(
            keys = report.keys_checked,
            violations = report.violations.len(),
            "checked squash inputs"
        );
        report
    }

    pub fn validate_keys(&self, difference: &Difference<T, K>) -> EngineResult<()> {
        self.check_keys(difference).into_result()
    }

    pub fn validate_progression(&self, first: &Difference<T, K>, second: &Difference<T, K>) -> EngineResult<()> {
        self.check_progression(first, second).into_result()
    }

    pub fn validate_squash(&self, before: &Difference<T, K>, after: &Difference<T, K>) -> EngineResult<()> {
        self.check_squash(before, after).into_result()
    }
}

/// How often each rule was broken in a report.
pub fn rule_counts(report: &ValidationReport) -> HashMap<ConsistencyRule, usize> {
    let mut counts = HashMap::new();
    for violation in &report.violations {
        *counts.entry(violation.rule).or_insert(0) += 1;
    }
    counts
}
