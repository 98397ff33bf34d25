//! Error types for the engine crate.

use std::fmt;

use chainset_types::{DifferenceType, TypeError};

/// A named consistency rule that composition inputs must satisfy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConsistencyRule {
    /// An entry's stored key is not what the identity selector yields for
    /// its values.
    KeySelectorMismatch,
    /// Progression: Add in one difference, Delete in the other.
    ProgressionAddDelete,
    /// Progression: Add in one difference, Update in the other.
    ProgressionAddUpdate,
    /// Progression: Delete in both, with different deleted values.
    ProgressionUnequalDelete,
    /// Progression: Update in both, starting from different values.
    ProgressionUnequalUpdate,
    /// Progression: Delete in one and Update in the other, starting from
    /// different values.
    ProgressionOriginMismatch,
    /// Squash: Add before and Add after.
    SquashAddAdd,
    /// Squash: Delete before and Delete after.
    SquashDeleteDelete,
    /// Squash: Delete before and Update after.
    SquashDeleteUpdate,
    /// Squash: Update before and Add after.
    SquashUpdateAdd,
    /// Squash: the value left by `before` is not the value `after` starts from.
    ConnectingValue {
        before: DifferenceType,
        after: DifferenceType,
    },
}

impl fmt::Display for ConsistencyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeySelectorMismatch => {
                write!(f, "entry key must match the key selector of the comparer")
            }
            Self::ProgressionAddDelete => {
                write!(f, "can't add in one difference and delete in the other")
            }
            Self::ProgressionAddUpdate => {
                write!(f, "can't add in one difference and update in the other")
            }
            Self::ProgressionUnequalDelete => {
                write!(f, "can't have unequal deletes for the same key")
            }
            Self::ProgressionUnequalUpdate => {
                write!(f, "can't have updates from different origins for the same key")
            }
            Self::ProgressionOriginMismatch => {
                write!(f, "delete and update of the same key must share an origin")
            }
            Self::SquashAddAdd => write!(f, "can't add before and add after"),
            Self::SquashDeleteDelete => write!(f, "can't delete before and delete after"),
            Self::SquashDeleteUpdate => write!(f, "can't delete before and update after"),
            Self::SquashUpdateAdd => write!(f, "can't update before and add after"),
            Self::ConnectingValue { before, after } => write!(
                f,
                "{before} -> {after} must have matching connecting entries"
            ),
        }
    }
}

/// Errors that can occur while computing or composing differences.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Invalid entry, key mismatch, or duplicate key.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// Composition inputs break a consistency rule.
    #[error("inconsistency at key {key}: {rule}")]
    Inconsistency { rule: ConsistencyRule, key: String },

    /// A plan referenced keys that no source batch ever supplied.
    #[error("missing data: {count} planned keys never resolved (first: {keys:?})")]
    MissingData { count: usize, keys: Vec<String> },

    /// A plan that can't be materialized against sources (e.g. a trivial
    /// plan whose values are left in place).
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EngineError {
    pub(crate) fn inconsistency<K: fmt::Debug>(rule: ConsistencyRule, key: &K) -> Self {
        Self::Inconsistency {
            rule,
            key: format!("{key:?}"),
        }
    }
}

/// Convenience alias for engine results.
pub type EngineResult<T> = Result<T, EngineError>;
