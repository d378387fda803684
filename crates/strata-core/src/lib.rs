//! Core types for the Strata terminal renderer.
//!
//! This crate provides the pieces that do not touch a terminal:
//! - Geometry: [`Rect`] in integer cell coordinates
//! - Colors: [`Color`] as the terminal receives them
//! - Scene trees: [`SceneNode`] produced by the component layer
//! - Diffing: [`diff_trees`] turns two scene trees into a [`Patch`] list

mod color;
pub mod diff;
mod geometry;
pub mod scene;

pub use color::{Color, ColorParseError};
pub use diff::{diff_trees, prop_delta, Patch, PropChange, PropDelta, TreeDiffer};
pub use geometry::Rect;
pub use scene::{
    flatten, layout_bounds, layout_z, prop, ComponentNode, ElementNode, NodeKind, PropValue,
    Props, SceneNode,
};
