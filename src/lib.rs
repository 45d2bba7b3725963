//! Skip list ordered map and multimap that rebalance lazily while you iterate.
//!
//! This crate provides [`SkipMap`] (unique keys) and [`SkipMultiMap`] (duplicate keys allowed).
//! Both keep their elements sorted in a multi-level linked list where each level skips over part
//! of the one below, giving expected O(log n) search, insertion and removal.
//!
//! Random level assignment keeps the expected costs logarithmic, but a list that has seen many
//! edits drifts away from the ideal shape. The containers can restore that shape two ways:
//!
//! - [`SkipMap::balance`] rebuilds every level in one O(n) pass.
//! - A [`CursorMut`] started at either end fixes the height of each element it steps over, so a
//!   full traversal you were going to do anyway leaves the container balanced at a small constant
//!   cost per step. [`SkipMap::for_each`] is such a traversal.
//!
//! # Example
//!
//! ```
//! use balanced_skiplist::SkipMap;
//!
//! let mut scores = SkipMap::new();
//! scores.insert("Alice", 100);
//! scores.insert("Bob", 85);
//! scores.insert("Carol", 92);
//! assert_eq!(scores.get("Bob"), Some(&85));
//! assert!(!scores.is_balanced());
//!
//! // Reading every score through a mutable cursor rebalances the map on the way.
//! let mut total = 0;
//! scores.for_each(|_, score| total += *score);
//! assert_eq!(total, 277);
//! assert!(scores.is_balanced());
//! ```
//!
//! # Features
//!
//! - **Hinted inserts** - [`CursorMut::insert_before`] links next to the cursor in O(1) amortized
//!   when the position is right, and falls back to a search when it is not
//! - **Deterministic** - level choices come from a seeded generator ([`Config`], [`DEFAULT_SEED`])
//! - **Introspection** - [`SkipMap::structure`] exposes the node graph read-only for tests and
//!   debugging
//!
//! # Implementation
//!
//! Nodes and payloads live in two arenas addressed by 32-bit handles. Each element has one payload
//! slot shared by every node of its column, and every level starts at a sentinel node.

// These forbid rules and lint groups are meant to be very restrictive.
// NOTE: Unsafe code is limited to handing out disjoint mutable payloads from `IterMut`.
// #![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod config;
mod error;
mod raw;

pub mod cursor;
pub mod introspect;
pub mod iter;
pub mod skip_map;
pub mod skip_multimap;

pub use config::{Config, DEFAULT_SEED};
pub use cursor::{Cursor, CursorMut};
pub use error::{Error, Result};
pub use introspect::{NodeRef, Structure};
pub use skip_map::SkipMap;
pub use skip_multimap::SkipMultiMap;
