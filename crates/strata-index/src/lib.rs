//! Spatial index for the Strata terminal renderer.
//!
//! An R-tree of rectangles that also knows the stacking order of its
//! entries:
//!
//! - **Region queries**: [`SpatialIndex::query`] in paint order,
//!   [`SpatialIndex::query_point`] in hit-test order, plus z-range filters
//! - **Occlusion**: which entries cover or are covered by an entry, and the
//!   exact visible region left over after subtracting everything above it
//! - **Z-order**: in-place restacking without touching the tree shape
//!
//! Equal z-indices are broken by a per-entry sequence number: the higher
//! sequence paints on top, hits first and occludes the lower one. Sequences
//! follow insertion order unless the owner reassigns them with
//! [`SpatialIndex::set_seq`].

#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]

mod error;
mod occlusion;
mod rtree;

pub use error::SpatialError;
pub use occlusion::visible_pieces;
pub use rtree::{EntryKey, IndexConfig, SpatialEntry, SpatialIndex};
