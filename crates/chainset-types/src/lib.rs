//! Data model for chainset.
//!
//! This crate defines the values the difference algebra works on. Every
//! other chainset crate depends on `chainset-types`.
//!
//! # Key Types
//!
//! - [`Identity`] — Caller-supplied key selector and value-equality predicate
//! - [`DifferenceEntry`] / [`DifferenceType`] — One change to one record, with its derived kind
//! - [`Difference`] — A set of changes with distinct keys
//! - [`ReferenceDifference`] / [`EntryRef`] / [`RefTag`] — Changes expressed as keys plus source tags
//! - [`KindPartition`] — Keys of a difference grouped into add/delete/update

pub mod codec;
pub mod difference;
pub mod entry;
pub mod error;
pub mod identity;
pub mod partition;
pub mod reference;

pub use codec::{
    difference_from_json, difference_to_json, difference_to_json_pretty, plan_from_json,
    plan_to_json,
};
pub use difference::Difference;
pub use entry::{DifferenceEntry, DifferenceRecord, DifferenceType};
pub use error::{TypeError, TypeResult};
pub use identity::{EntryKey, Identity};
pub use partition::{Change, KindPartition};
pub use reference::{EntryRef, RefTag, ReferenceDifference, Side};
