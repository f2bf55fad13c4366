//! Layout part records stored in the tree arena.

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;
use crate::sash::SashNode;

/// Stable arena handle for a layout part.
///
/// `0` is reserved/invalid so IDs are always non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartId(u64);

impl PartId {
    /// Lowest valid part ID.
    pub const MIN: Self = Self(1);

    /// Create a new part ID, rejecting 0.
    pub fn new(raw: u64) -> Result<Self, LayoutError> {
        if raw == 0 {
            return Err(LayoutError::ZeroPartId);
        }
        Ok(Self(raw))
    }

    /// Get the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Return the next ID, or an error on overflow.
    pub fn checked_next(self) -> Result<Self, LayoutError> {
        let Some(next) = self.0.checked_add(1) else {
            return Err(LayoutError::PartIdOverflow { current: self });
        };
        Self::new(next)
    }
}

impl Default for PartId {
    fn default() -> Self {
        Self::MIN
    }
}

/// Which family a pane belongs to. Views and editors never share a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaneRole {
    View,
    Editor,
}

/// Payload of a live pane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaneState {
    pub role: PaneRole,
    pub label: String,
}

/// Tab folder: ordered panes and placeholders, one selected pane on top.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackState {
    pub children: Vec<PartId>,
    #[serde(default)]
    pub selected: Option<PartId>,
}

/// Split container: ordered children plus the binary split layout over them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SashState {
    pub children: Vec<PartId>,
    #[serde(default)]
    pub layout: Option<SashNode>,
}

/// Binding state of a container placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "slot", rename_all = "snake_case")]
pub enum ContainerSlot {
    /// Not materialized; may hold placeholder-kind children of its own.
    Unbound { children: Vec<PartId> },
    /// Stands in for `real`; child operations forward to it.
    Bound { real: PartId },
}

impl Default for ContainerSlot {
    fn default() -> Self {
        Self::Unbound {
            children: Vec::new(),
        }
    }
}

/// Part payload variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartKind {
    Pane(PaneState),
    Placeholder,
    Stack(StackState),
    Sash(SashState),
    ContainerPlaceholder(ContainerSlot),
}

impl PartKind {
    /// Whether the part can hold children.
    #[must_use]
    pub const fn is_container(&self) -> bool {
        matches!(
            self,
            Self::Stack(_) | Self::Sash(_) | Self::ContainerPlaceholder(_)
        )
    }

    /// Placeholder kinds stand for parts that are not realized.
    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder | Self::ContainerPlaceholder(_))
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Pane(_) => "pane",
            Self::Placeholder => "placeholder",
            Self::Stack(_) => "stack",
            Self::Sash(_) => "sash",
            Self::ContainerPlaceholder(_) => "container_placeholder",
        }
    }

    /// Children physically stored on this part.
    ///
    /// A bound container placeholder stores none; its apparent children live
    /// on the real container.
    #[must_use]
    pub fn stored_children(&self) -> &[PartId] {
        match self {
            Self::Stack(stack) => &stack.children,
            Self::Sash(sash) => &sash.children,
            Self::ContainerPlaceholder(ContainerSlot::Unbound { children }) => children,
            Self::ContainerPlaceholder(ContainerSlot::Bound { .. })
            | Self::Pane(_)
            | Self::Placeholder => &[],
        }
    }

    pub(crate) fn stored_children_mut(&mut self) -> Option<&mut Vec<PartId>> {
        match self {
            Self::Stack(stack) => Some(&mut stack.children),
            Self::Sash(sash) => Some(&mut sash.children),
            Self::ContainerPlaceholder(ContainerSlot::Unbound { children }) => Some(children),
            Self::ContainerPlaceholder(ContainerSlot::Bound { .. })
            | Self::Pane(_)
            | Self::Placeholder => None,
        }
    }
}

/// One node of the layout tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutPart {
    pub id: PartId,
    /// Caller-facing identifier, unique among the parts under one root.
    pub key: String,
    /// Apparent parent. Children of a proxied container point at the proxy.
    #[serde(default)]
    pub container: Option<PartId>,
    pub visible: bool,
    /// Container placeholder currently standing in for this container.
    #[serde(default)]
    pub proxied_by: Option<PartId>,
    #[serde(flatten)]
    pub kind: PartKind,
}

impl LayoutPart {
    pub(crate) fn new(id: PartId, key: String, kind: PartKind) -> Self {
        let visible = !kind.is_placeholder();
        Self {
            id,
            key,
            container: None,
            visible,
            proxied_by: None,
            kind,
        }
    }

    #[must_use]
    pub const fn is_pane(&self) -> bool {
        matches!(self.kind, PartKind::Pane(_))
    }

    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        self.kind.is_placeholder()
    }

    #[must_use]
    pub fn pane_role(&self) -> Option<PaneRole> {
        match &self.kind {
            PartKind::Pane(pane) => Some(pane.role),
            _ => None,
        }
    }

    /// Real container bound to this part, if it is a bound container placeholder.
    #[must_use]
    pub fn bound_real(&self) -> Option<PartId> {
        match self.kind {
            PartKind::ContainerPlaceholder(ContainerSlot::Bound { real }) => Some(real),
            _ => None,
        }
    }
}
