//! The comparer facade: one identity, one configuration, every operation.

use std::borrow::Borrow;

use tracing::debug;

use chainset_types::{Difference, DifferenceEntry, EntryKey, Identity, ReferenceDifference};

use crate::config::ComparerConfig;
use crate::difference::reference_difference;
use crate::error::EngineResult;
use crate::progression::plan_progression;
use crate::resolve::{materialize, DifferenceReader, SnapshotReader};
use crate::squash::plan_squash;
use crate::validation::{check_progression_kinds, check_squash_kinds, plan_partition, Validator};

/// Computes, composes and materializes differences for one record type.
///
/// Every operation comes in two steps, planning by key and materializing
/// against (possibly streamed) sources, plus a convenience form that runs
/// both over in-memory inputs.
#[derive(Clone, Debug)]
pub struct DifferenceComparer<T, K> {
    identity: Identity<T, K>,
    config: ComparerConfig,
}

impl<T: Clone, K: EntryKey> DifferenceComparer<T, K> {
    /// A comparer with the default configuration.
    pub fn new(identity: Identity<T, K>) -> Self {
        Self {
            identity,
            config: ComparerConfig::default(),
        }
    }

    pub fn with_config(identity: Identity<T, K>, config: ComparerConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { identity, config })
    }

    pub fn identity(&self) -> &Identity<T, K> {
        &self.identity
    }

    pub fn config(&self) -> &ComparerConfig {
        &self.config
    }

    pub fn validator(&self) -> Validator<'_, T, K> {
        Validator::new(&self.identity)
    }

    // -- plain differences --

    /// Plan the difference between two snapshots from their keys.
    pub fn reference_difference(
        &self,
        keys1: impl IntoIterator<Item = K>,
        keys2: impl IntoIterator<Item = K>,
    ) -> EngineResult<Vec<ReferenceDifference<K>>> {
        reference_difference(keys1, keys2)
    }

    /// Resolve a difference plan against the two snapshots, batch by batch.
    pub fn materialize_difference<I1, I2>(
        &self,
        plan: Vec<ReferenceDifference<K>>,
        source1: I1,
        source2: I2,
    ) -> EngineResult<Difference<T, K>>
    where
        I1: IntoIterator,
        I1::Item: Borrow<T>,
        I2: IntoIterator,
        I2::Item: Borrow<T>,
    {
        materialize(
            &self.identity,
            &SnapshotReader::new(&self.identity),
            plan,
            source1,
            source2,
            self.config.chunk_size,
        )
    }

    /// The difference that turns `first` into `second`.
    pub fn difference(&self, first: &[T], second: &[T]) -> EngineResult<Difference<T, K>> {
        let plan = self.reference_difference(
            first.iter().map(|e| self.identity.key(e)),
            second.iter().map(|e| self.identity.key(e)),
        )?;
        let difference = self.materialize_difference(plan, first, second)?;
        debug!(
            first = first.len(),
            second = second.len(),
            additions = difference.additions(),
            removals = difference.removals(),
            modifications = difference.modifications(),
            "computed difference"
        );
        Ok(difference)
    }

    // -- progression --

    /// Plan a progression from two plans (or trivial plans of stored
    /// differences).
    pub fn reference_progression(
        &self,
        first: &[ReferenceDifference<K>],
        second: &[ReferenceDifference<K>],
    ) -> EngineResult<Vec<ReferenceDifference<K>>> {
        let first = plan_partition(first)?;
        let second = plan_partition(second)?;
        if !self.config.skip_validation {
            check_progression_kinds(&first, &second).into_result()?;
        }
        plan_progression(&first, &second)
    }

    /// Resolve a progression plan against the entries of both differences.
    pub fn materialize_progression<I1, I2>(
        &self,
        plan: Vec<ReferenceDifference<K>>,
        first: I1,
        second: I2,
    ) -> EngineResult<Difference<T, K>>
    where
        I1: IntoIterator,
        I1::Item: Borrow<DifferenceEntry<T, K>>,
        I2: IntoIterator,
        I2::Item: Borrow<DifferenceEntry<T, K>>,
    {
        materialize(
            &self.identity,
            &DifferenceReader,
            plan,
            first,
            second,
            self.config.chunk_size,
        )
    }

    /// Given `first = diff(S, S1)` and `second = diff(S, S2)`, returns
    /// `diff(S1, S2)`.
    pub fn progression(
        &self,
        first: &Difference<T, K>,
        second: &Difference<T, K>,
    ) -> EngineResult<Difference<T, K>> {
        if !self.config.skip_validation {
            self.validator().validate_progression(first, second)?;
        }
        let plan = plan_progression(&first.partition(), &second.partition())?;
        debug!(first = first.len(), second = second.len(), planned = plan.len(), "planned progression");
        self.materialize_progression(plan, first, second)
    }

    // -- squash --

    /// Plan the squash of two consecutive plans.
    pub fn reference_squash(
        &self,
        before: &[ReferenceDifference<K>],
        after: &[ReferenceDifference<K>],
    ) -> EngineResult<Vec<ReferenceDifference<K>>> {
        let before = plan_partition(before)?;
        let after = plan_partition(after)?;
        if !self.config.skip_validation {
            check_squash_kinds(&before, &after).into_result()?;
        }
        plan_squash(&before, &after)
    }

    /// Resolve a squash plan against the entries of both differences.
    pub fn materialize_squash<I1, I2>(
        &self,
        plan: Vec<ReferenceDifference<K>>,
        before: I1,
        after: I2,
    ) -> EngineResult<Difference<T, K>>
    where
        I1: IntoIterator,
        I1::Item: Borrow<DifferenceEntry<T, K>>,
        I2: IntoIterator,
        I2::Item: Borrow<DifferenceEntry<T, K>>,
    {
        self.materialize_progression(plan, before, after)
    }

    /// Given `before = diff(S0, S1)` and `after = diff(S1, S2)`, returns
    /// `diff(S0, S2)`.
    pub fn squash_pair(
        &self,
        before: &Difference<T, K>,
        after: &Difference<T, K>,
    ) -> EngineResult<Difference<T, K>> {
        if !self.config.skip_validation {
            self.validator().validate_squash(before, after)?;
        }
        let plan = plan_squash(&before.partition(), &after.partition())?;
        debug!(before = before.len(), after = after.len(), planned = plan.len(), "planned squash");
        self.materialize_squash(plan, before, after)
    }

    /// Squash a chain of consecutive differences, oldest first. An empty
    /// chain squashes to the empty difference.
    pub fn squash<'d>(
        &self,
        chain: impl IntoIterator<Item = &'d Difference<T, K>>,
    ) -> EngineResult<Difference<T, K>>
    where
        T: 'd,
        K: 'd,
    {
        let mut chain = chain.into_iter();
        let Some(first) = chain.next() else {
            return Ok(Difference::new());
        };
        if !self.config.skip_validation {
            self.validator().validate_keys(first)?;
        }
        let mut squashed = first.clone();
        let mut links = 1usize;
        for next in chain {
            squashed = self.squash_pair(&squashed, next)?;
            links += 1;
        }
        debug!(links, entries = squashed.len(), "squashed chain");
        Ok(squashed)
    }
}
