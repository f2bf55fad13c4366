//! Drop-target resolution.
//!
//! Given the cursor position during a drag, pick where the dragged part
//! would land. The window registers rectangles for rendered parts; the
//! resolver hit-tests them, tries the smallest (then deepest) first, and
//! returns the first candidate that survives validation as a
//! [`DropResolution`].

use std::cmp::Reverse;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span, trace};
use wbench_core::geometry::{Point, Rect, Side, Sides, closest_side, extruded_edge};

use crate::config::LayoutConfig;
use crate::part::{ContainerSlot, LayoutPart, PaneRole, PartId, PartKind};
use crate::sash::SplitRatio;
use crate::tree::{LayoutTree, PartLayout};

/// Zone of a drop region under the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DockZone {
    Left,
    Right,
    Top,
    Bottom,
    Center,
}

impl DockZone {
    #[must_use]
    pub const fn from_side(side: Side) -> Self {
        match side {
            Side::Left => Self::Left,
            Side::Right => Self::Right,
            Side::Top => Self::Top,
            Side::Bottom => Self::Bottom,
        }
    }
}

/// Where a dropped part goes relative to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelativePosition {
    /// Tab inserted before the target tab.
    Before,
    /// Tab inserted after the target tab.
    After,
    /// Stacked into the target stack.
    Stack,
    SplitTop,
    SplitBottom,
    SplitLeft,
    SplitRight,
}

impl RelativePosition {
    #[must_use]
    pub const fn split(side: Side) -> Self {
        match side {
            Side::Top => Self::SplitTop,
            Side::Bottom => Self::SplitBottom,
            Side::Left => Self::SplitLeft,
            Side::Right => Self::SplitRight,
        }
    }

    /// Side for split positions.
    #[must_use]
    pub const fn side(self) -> Option<Side> {
        match self {
            Self::SplitTop => Some(Side::Top),
            Self::SplitBottom => Some(Side::Bottom),
            Self::SplitLeft => Some(Side::Left),
            Self::SplitRight => Some(Side::Right),
            Self::Before | Self::After | Self::Stack => None,
        }
    }
}

/// Outcome of resolving one cursor position.
///
/// `valid == false` marks a drop that resolves but would not change the
/// layout (dropping a part onto itself, a lone tab onto its own stack), and
/// every drop while the layout is zoomed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropResolution {
    pub target: PartId,
    pub position: RelativePosition,
    pub valid: bool,
    /// Rectangle a renderer may outline as drop feedback.
    pub feedback: Rect,
}

/// Maps a cursor inside a region to one of five zones.
///
/// The center zone is the region shrunk by `edge_threshold_bps` of its width
/// and height on every side; outside it the closest side wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropZoneDetector {
    edge_threshold_bps: u16,
}

impl DropZoneDetector {
    #[must_use]
    pub const fn new(edge_threshold_bps: u16) -> Self {
        Self { edge_threshold_bps }
    }

    #[must_use]
    pub const fn from_config(config: &LayoutConfig) -> Self {
        Self::new(config.edge_threshold_bps)
    }

    /// Region that counts as the center zone.
    #[must_use]
    pub fn center_region(&self, bounds: Rect) -> Rect {
        let bps = u32::from(self.edge_threshold_bps.min(5_000));
        let dx = (u32::from(bounds.width) * bps / 10_000) as u16;
        let dy = (u32::from(bounds.height) * bps / 10_000) as u16;
        bounds.inner(Sides::symmetric(dy, dx))
    }

    /// Zone under `cursor`, or `None` when the cursor is outside `bounds`.
    #[must_use]
    pub fn detect(&self, bounds: Rect, cursor: Point) -> Option<DockZone> {
        if bounds.is_empty() || !bounds.contains_point(cursor) {
            return None;
        }
        if self.center_region(bounds).contains_point(cursor) {
            return Some(DockZone::Center);
        }
        Some(DockZone::from_side(closest_side(bounds, cursor)))
    }
}

impl Default for DropZoneDetector {
    fn default() -> Self {
        Self::from_config(&LayoutConfig::default())
    }
}

/// What a registered rectangle stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropTargetKind {
    /// The body of a part: drops split or stack.
    Region,
    /// A tab handle in a stack's tab strip: drops reorder.
    Tab,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropTargetRegistration {
    pub handle: PartId,
    pub bounds: Rect,
    pub kind: DropTargetKind,
}

/// Window-owned list of drop rectangles, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DropTargetRegistry {
    entries: Vec<DropTargetRegistration>,
}

impl DropTargetRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every rendered part region plus one tab handle per tab.
    #[must_use]
    pub fn from_layout(layout: &PartLayout) -> Self {
        let mut registry = Self::new();
        for (part, rect) in layout.iter() {
            registry.register_region(part, rect);
        }
        for (_, tabs) in layout.tab_strips() {
            for (pane, rect) in tabs {
                registry.register_tab(*pane, *rect);
            }
        }
        registry
    }

    pub fn register_region(&mut self, handle: PartId, bounds: Rect) {
        self.entries.push(DropTargetRegistration {
            handle,
            bounds,
            kind: DropTargetKind::Region,
        });
    }

    pub fn register_tab(&mut self, handle: PartId, bounds: Rect) {
        self.entries.push(DropTargetRegistration {
            handle,
            bounds,
            kind: DropTargetKind::Tab,
        });
    }

    #[must_use]
    pub fn entries(&self) -> &[DropTargetRegistration] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Why a hit-tested candidate was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropRejection {
    UnknownTarget { target: PartId },
    EmptyBounds { target: PartId },
    UnknownSource { source: PartId },
    SourceNotDraggable { source: PartId },
    PlaceholderTarget { target: PartId },
    UnboundPlaceholder { target: PartId },
    ForeignRoot { source: PartId, target: PartId },
    TargetInsideSource { source: PartId, target: PartId },
    NotATab { target: PartId },
    NoSplitParent { target: PartId },
}

impl fmt::Display for DropRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTarget { target } => write!(f, "target {} is unknown", target.get()),
            Self::EmptyBounds { target } => {
                write!(f, "target {} has zero-area bounds", target.get())
            }
            Self::UnknownSource { source } => write!(f, "source {} is unknown", source.get()),
            Self::SourceNotDraggable { source } => {
                write!(f, "source {} is neither a pane nor a stack", source.get())
            }
            Self::PlaceholderTarget { target } => {
                write!(f, "target {} is a part placeholder", target.get())
            }
            Self::UnboundPlaceholder { target } => {
                write!(f, "target {} is an unbound container placeholder", target.get())
            }
            Self::ForeignRoot { source, target } => write!(
                f,
                "source {} and target {} are not under the same root",
                source.get(),
                target.get()
            ),
            Self::TargetInsideSource { source, target } => write!(
                f,
                "target {} lies inside source {}",
                target.get(),
                source.get()
            ),
            Self::NotATab { target } => {
                write!(f, "tab handle {} is not a pane in a stack", target.get())
            }
            Self::NoSplitParent { target } => {
                write!(f, "target {} has no sash to split in", target.get())
            }
        }
    }
}

impl std::error::Error for DropRejection {}

/// Resolve where `source` would land if released at `cursor`.
///
/// Returns `None` when no registered region under the cursor accepts the
/// drop.
#[must_use]
pub fn resolve_drop(
    tree: &LayoutTree,
    registry: &DropTargetRegistry,
    source: PartId,
    cursor: Point,
    config: &LayoutConfig,
) -> Option<DropResolution> {
    let span = debug_span!(
        "resolve_drop",
        source = source.get(),
        x = cursor.x,
        y = cursor.y
    );
    let _guard = span.enter();

    let mut candidates: Vec<(usize, &DropTargetRegistration)> = registry
        .entries()
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.bounds.contains_point(cursor))
        .collect();
    candidates.sort_by_key(|(index, entry)| {
        (entry.bounds.area(), Reverse(tree.depth(entry.handle)), *index)
    });

    let detector = DropZoneDetector::from_config(config);
    for (_, entry) in candidates {
        match resolve_candidate(tree, entry, source, cursor, &detector, config) {
            Ok(resolution) => {
                trace!(?resolution, "drop candidate accepted");
                return Some(resolution);
            }
            Err(rejection) => {
                debug!(handle = entry.handle.get(), %rejection, "drop candidate rejected");
            }
        }
    }
    None
}

/// Validate one registration and turn it into a resolution.
pub fn resolve_candidate(
    tree: &LayoutTree,
    entry: &DropTargetRegistration,
    source: PartId,
    cursor: Point,
    detector: &DropZoneDetector,
    config: &LayoutConfig,
) -> Result<DropResolution, DropRejection> {
    let handle = entry.handle;
    let target_record = tree
        .part(handle)
        .ok_or(DropRejection::UnknownTarget { target: handle })?;
    if entry.bounds.is_empty() {
        return Err(DropRejection::EmptyBounds { target: handle });
    }
    match target_record.kind {
        PartKind::Placeholder => return Err(DropRejection::PlaceholderTarget { target: handle }),
        PartKind::ContainerPlaceholder(ContainerSlot::Unbound { .. }) => {
            return Err(DropRejection::UnboundPlaceholder { target: handle });
        }
        _ => {}
    }

    let source_record = tree
        .part(source)
        .ok_or(DropRejection::UnknownSource { source })?;
    if !matches!(source_record.kind, PartKind::Pane(_) | PartKind::Stack(_)) {
        return Err(DropRejection::SourceNotDraggable { source });
    }
    let root = tree.root_container(source);
    if root.is_none() || tree.root_container(handle) != root {
        return Err(DropRejection::ForeignRoot {
            source,
            target: handle,
        });
    }

    match entry.kind {
        DropTargetKind::Tab => resolve_tab(tree, entry, source, cursor),
        DropTargetKind::Region => resolve_region(tree, entry, source, cursor, detector, config),
    }
}

fn resolve_tab(
    tree: &LayoutTree,
    entry: &DropTargetRegistration,
    source: PartId,
    cursor: Point,
) -> Result<DropResolution, DropRejection> {
    let target = entry.handle;
    let is_pane = tree.part(target).is_some_and(LayoutPart::is_pane);
    let Some(stack) = tree.storage_of(target).filter(|_| is_pane) else {
        return Err(DropRejection::NotATab { target });
    };
    if !matches!(tree.part(stack).map(|p| &p.kind), Some(PartKind::Stack(_))) {
        return Err(DropRejection::NotATab { target });
    }
    if target != source && tree.is_ancestor(source, target) {
        return Err(DropRejection::TargetInsideSource { source, target });
    }

    let middle = i32::from(entry.bounds.x) + i32::from(entry.bounds.width) / 2;
    let (position, edge) = if cursor.x < middle {
        (RelativePosition::Before, Side::Left)
    } else {
        (RelativePosition::After, Side::Right)
    };

    let siblings = tree.children(stack);
    let target_index = siblings.iter().position(|c| *c == target);
    let source_index = siblings.iter().position(|c| *c == source);
    let unchanged = match (position, source_index, target_index) {
        _ if target == source => true,
        (RelativePosition::Before, Some(s), Some(t)) => t == s + 1,
        (RelativePosition::After, Some(s), Some(t)) => t + 1 == s,
        _ => false,
    };

    Ok(DropResolution {
        target,
        position,
        valid: !unchanged && !tree.is_zoomed(),
        feedback: extruded_edge(entry.bounds, 1, edge),
    })
}

fn resolve_region(
    tree: &LayoutTree,
    entry: &DropTargetRegistration,
    source: PartId,
    cursor: Point,
    detector: &DropZoneDetector,
    config: &LayoutConfig,
) -> Result<DropResolution, DropRejection> {
    let bounds = entry.bounds;
    let target = stack_of_pane(tree, entry.handle).unwrap_or(entry.handle);
    if target != source && tree.is_ancestor(source, target) {
        return Err(DropRejection::TargetInsideSource { source, target });
    }
    let zone = detector
        .detect(bounds, cursor)
        .ok_or(DropRejection::EmptyBounds { target })?;

    let stackable = is_stack_like(tree, target) && roles_compatible(tree, source, target);
    let position = match zone {
        DockZone::Center if stackable => RelativePosition::Stack,
        DockZone::Center => RelativePosition::split(closest_side(bounds, cursor)),
        DockZone::Left => RelativePosition::SplitLeft,
        DockZone::Right => RelativePosition::SplitRight,
        DockZone::Top => RelativePosition::SplitTop,
        DockZone::Bottom => RelativePosition::SplitBottom,
    };

    let source_stack = tree
        .storage_of(source)
        .filter(|_| tree.part(source).is_some_and(LayoutPart::is_pane));
    let (feedback, unchanged) = match position.side() {
        None => (bounds, target == source || source_stack == Some(target)),
        Some(side) => {
            if split_host(tree, target).is_none() {
                return Err(DropRejection::NoSplitParent { target });
            }
            let lone_tab = source_stack == Some(target) && live_pane_count(tree, target) <= 1;
            let ratio = docking_ratio_for(tree, target, config);
            let size = ratio.first_share(bounds.dimension(side));
            (extruded_edge(bounds, size, side), target == source || lone_tab)
        }
    };

    Ok(DropResolution {
        target,
        position,
        valid: !unchanged && !tree.is_zoomed(),
        feedback,
    })
}

/// Stack holding `pane`, if `pane` is a live pane inside a stack.
fn stack_of_pane(tree: &LayoutTree, pane: PartId) -> Option<PartId> {
    if !tree.part(pane)?.is_pane() {
        return None;
    }
    let storage = tree.storage_of(pane)?;
    let apparent = tree.container(pane)?;
    matches!(tree.part(storage)?.kind, PartKind::Stack(_)).then_some(apparent)
}

fn is_stack_like(tree: &LayoutTree, part: PartId) -> bool {
    match tree.part(part).map(|p| &p.kind) {
        Some(PartKind::Stack(_)) => true,
        Some(PartKind::ContainerPlaceholder(ContainerSlot::Bound { real })) => {
            matches!(tree.part(*real).map(|p| &p.kind), Some(PartKind::Stack(_)))
        }
        _ => false,
    }
}

/// Views and editors never share a stack; empty stacks take anything.
fn roles_compatible(tree: &LayoutTree, source: PartId, target: PartId) -> bool {
    let existing = tree.pane_roles(target);
    tree.pane_roles(source)
        .iter()
        .all(|role| existing.iter().all(|other| other == role))
}

fn live_pane_count(tree: &LayoutTree, stack: PartId) -> usize {
    tree.children(stack)
        .iter()
        .filter(|child| tree.part(**child).is_some_and(LayoutPart::is_pane))
        .count()
}

/// Sash a split around `target` is recorded in, and the leaf to split.
/// A sash target is wrapped as a whole.
pub(crate) fn split_host(tree: &LayoutTree, target: PartId) -> Option<(PartId, Option<PartId>)> {
    if matches!(tree.part(target)?.kind, PartKind::Sash(_)) {
        return Some((target, None));
    }
    let parent = tree.container(target)?;
    let storage = tree.part(parent)?.bound_real().unwrap_or(parent);
    matches!(tree.part(storage)?.kind, PartKind::Sash(_)).then_some((storage, Some(target)))
}

/// Docking weights for a split next to `target`.
pub(crate) fn docking_ratio_for(
    tree: &LayoutTree,
    target: PartId,
    config: &LayoutConfig,
) -> SplitRatio {
    if tree.pane_roles(target).contains(&PaneRole::Editor) {
        config.editor_docking_ratio
    } else {
        config.docking_ratio
    }
}
