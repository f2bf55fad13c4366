//! Error types for tree construction, validation, and configuration.
//!
//! Only fatal conditions are errors. Structurally meaningless edits (adding a
//! member twice, removing a stranger) come back as [`crate::TreeEdit::Noop`].

use std::fmt;

use crate::part::PartId;

/// Fatal layout-tree construction and validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    ZeroPartId,
    PartIdOverflow {
        current: PartId,
    },
    EmptyKey,
    DuplicateKey {
        key: String,
        existing: PartId,
        incoming: PartId,
    },
    InvalidSplitRatio {
        incoming: u32,
        existing: u32,
    },
    MissingRoot {
        root: PartId,
    },
    RootHasParent {
        root: PartId,
        parent: PartId,
    },
    MissingPart {
        part: PartId,
    },
    ParentMismatch {
        part: PartId,
        expected: Option<PartId>,
        found: Option<PartId>,
    },
    DuplicateChild {
        container: PartId,
        child: PartId,
    },
    InvalidChildKind {
        container: PartId,
        child: PartId,
        kind: &'static str,
    },
    SashLayoutMismatch {
        sash: PartId,
    },
    InvalidSelection {
        stack: PartId,
        selected: PartId,
    },
    BrokenBinding {
        placeholder: PartId,
        real: PartId,
    },
    ProxiedContainerAttached {
        real: PartId,
        placeholder: PartId,
        parent: PartId,
    },
    CycleDetected {
        part: PartId,
    },
    InvalidZoom {
        part: PartId,
    },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroPartId => write!(f, "part id 0 is invalid"),
            Self::PartIdOverflow { current } => {
                write!(f, "part id overflow after {}", current.get())
            }
            Self::EmptyKey => write!(f, "part key must not be empty"),
            Self::DuplicateKey {
                key,
                existing,
                incoming,
            } => write!(
                f,
                "duplicate part key {key:?}: part {} already uses it, part {} would repeat it",
                existing.get(),
                incoming.get()
            ),
            Self::InvalidSplitRatio { incoming, existing } => write!(
                f,
                "invalid split ratio {incoming}:{existing} (both weights must be > 0)"
            ),
            Self::MissingRoot { root } => write!(f, "root part {} not found", root.get()),
            Self::RootHasParent { root, parent } => write!(
                f,
                "root part {} must not have parent {}",
                root.get(),
                parent.get()
            ),
            Self::MissingPart { part } => write!(f, "part {} not found", part.get()),
            Self::ParentMismatch {
                part,
                expected,
                found,
            } => write!(
                f,
                "part {} has container {:?}, expected {:?}",
                part.get(),
                found.map(PartId::get),
                expected.map(PartId::get)
            ),
            Self::DuplicateChild { container, child } => write!(
                f,
                "container {} lists child {} more than once",
                container.get(),
                child.get()
            ),
            Self::InvalidChildKind {
                container,
                child,
                kind,
            } => write!(
                f,
                "container {} cannot hold child {} of kind {kind}",
                container.get(),
                child.get()
            ),
            Self::SashLayoutMismatch { sash } => write!(
                f,
                "sash {} split layout does not cover exactly its children",
                sash.get()
            ),
            Self::InvalidSelection { stack, selected } => write!(
                f,
                "stack {} selects {} which is not one of its panes",
                stack.get(),
                selected.get()
            ),
            Self::BrokenBinding { placeholder, real } => write!(
                f,
                "container placeholder {} is bound to {} but the binding is not mirrored",
                placeholder.get(),
                real.get()
            ),
            Self::ProxiedContainerAttached {
                real,
                placeholder,
                parent,
            } => write!(
                f,
                "container {} is proxied by {} but also attached to {}",
                real.get(),
                placeholder.get(),
                parent.get()
            ),
            Self::CycleDetected { part } => {
                write!(f, "cycle detected at part {}", part.get())
            }
            Self::InvalidZoom { part } => write!(
                f,
                "zoomed part {} is not a stack attached under the root",
                part.get()
            ),
        }
    }
}

impl std::error::Error for LayoutError {}

/// Invalid tuning values in [`crate::LayoutConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    InvalidEdgeThreshold { bps: u16 },
    InvalidHysteresis { hysteresis: u16 },
    InvalidDockingRatio { incoming: u32, existing: u32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEdgeThreshold { bps } => {
                write!(f, "edge threshold must be in 1..=5000 bps (got {bps})")
            }
            Self::InvalidHysteresis { hysteresis } => {
                write!(f, "drag hysteresis must be > 0 (got {hysteresis})")
            }
            Self::InvalidDockingRatio { incoming, existing } => write!(
                f,
                "docking ratio {incoming}:{existing} must have non-zero weights"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
