//! Entry sources for chainset.
//!
//! The difference engine plans by key and then streams entries from two
//! sources. This crate provides those sources: the [`EntrySource`] trait
//! with ordered and keyset-paged scans, an in-memory implementation that
//! can also apply differences, and a random snapshot generator.
//!
//! # Design Rules
//!
//! 1. Scans are always in ascending key order.
//! 2. Paging is by last-seen key, never by offset.
//! 3. Applying a difference is all-or-nothing.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod generator;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use generator::{Record, SnapshotGenerator};
pub use memory::MemoryStore;
pub use traits::{EntrySource, Paged};
