//! Difference algebra for chainset.
//!
//! Computes the difference between two keyed snapshots and composes
//! differences: progression combines two differences taken from the same
//! base, squash collapses a chain of consecutive differences into one. Every
//! operation is split into a key-only planning step and a materialization
//! step that resolves the plan against streamed sources in bounded batches.
//!
//! # Key Types
//!
//! - [`DifferenceComparer`] — Facade bundling identity, configuration and all operations
//! - [`ComparerConfig`] — Validation switch and chunk size
//! - [`Validator`] / [`ValidationReport`] — Consistency checks for composition inputs
//! - [`SlotReader`] — How materialization reads values out of an input

pub mod comparer;
pub mod config;
pub mod difference;
pub mod error;
pub mod progression;
pub mod resolve;
pub mod squash;
pub mod validation;

pub use comparer::DifferenceComparer;
pub use config::{ComparerConfig, DEFAULT_CHUNK_SIZE};
pub use difference::reference_difference;
pub use error::{ConsistencyRule, EngineError, EngineResult};
pub use progression::plan_progression;
pub use resolve::{materialize, DifferenceReader, SlotReader, SnapshotReader};
pub use squash::plan_squash;
pub use validation::{
    check_progression_kinds, check_squash_kinds, plan_partition, rule_counts, ValidationReport,
    Validator, Violation,
};
