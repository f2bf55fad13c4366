#![forbid(unsafe_code)]

//! Workbench layout: the container tree behind docked panes, and the
//! drag-and-drop protocol that rearranges it.
//!
//! # Model
//! A [`LayoutTree`] is an arena of [`LayoutPart`]s under one root sash.
//! Stacks hold panes as tabs, sashes split their children with a binary
//! [`SashNode`] layout, and placeholders keep the slot of a pane (or a whole
//! container) that is not showing so it can come back in the same place.
//!
//! # Dragging
//! The window registers part rectangles in a [`DropTargetRegistry`]. A
//! [`DragMachine`] consumes pointer events, re-resolving the drop candidate
//! with [`resolve_drop`] while the pointer moves and committing it with
//! [`LayoutTree::apply_drop`] on release. Cancelling leaves the tree as it was.

pub mod config;
pub mod dock;
pub mod drag;
pub mod drop;
pub mod error;
pub mod part;
mod placeholder;
pub mod presentation;
pub mod sash;
pub mod snapshot;
pub mod tree;

pub use wbench_core::geometry::{Point, Rect, Side, Sides};

pub use config::LayoutConfig;
pub use dock::{DockError, DockOutcome};
pub use drag::{
    DragCancelReason, DragEffect, DragError, DragEvent, DragEventError, DragEventKind,
    DragMachine, DragNoopReason, DragState, DragTransition,
};
pub use drop::{
    DockZone, DropRejection, DropResolution, DropTargetKind, DropTargetRegistration,
    DropTargetRegistry, DropZoneDetector, RelativePosition, resolve_candidate, resolve_drop,
};
pub use error::{ConfigError, LayoutError};
pub use part::{
    ContainerSlot, LayoutPart, PaneRole, PaneState, PartId, PartKind, SashState, StackState,
};
pub use presentation::{
    PartDescriptor, PartRegistry, Perspective, PerspectiveError, StaticPartRegistry,
};
pub use sash::{SashNode, SplitAxis, SplitRatio};
pub use snapshot::{LAYOUT_SNAPSHOT_SCHEMA_VERSION, LayoutSnapshot, SnapshotError};
pub use tree::{LayoutTree, PartLayout, TreeEdit, TreeNoopReason};
