#![forbid(unsafe_code)]

//! Core: geometry shared by the workbench layout crates.
//!
//! # Role in the workbench
//! `wbench-core` owns the plain value types every other layer speaks in:
//! cell rectangles, margins, pointer positions, and rectangle sides. The
//! layout crate (`wbench-layout`) builds its container tree, split solver,
//! and drop-zone detection on top of these.

pub mod geometry;

pub use geometry::{Point, Rect, Side, Sides, closest_side, extruded_edge};
