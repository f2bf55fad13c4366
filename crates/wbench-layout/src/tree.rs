//! Arena-backed layout container tree.
//!
//! Parts live in one ordered map keyed by [`PartId`]. Parent links are plain
//! handles, so a container never owns its children through the back-reference
//! and the whole tree is cheap to clone for transactional edits.
//!
//! Containers come in three shapes:
//!
//! - **Stack**: a tab folder holding panes and part placeholders.
//! - **Sash**: a split container holding anything, with a binary split layout
//!   over its children. Every tree has exactly one root sash.
//! - **Container placeholder**: a lazy stand-in for a stack or sash. See
//!   [`LayoutTree::set_real_container`].

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use wbench_core::geometry::{Rect, Side};

use crate::config::LayoutConfig;
use crate::error::LayoutError;
use crate::part::{
    ContainerSlot, LayoutPart, PaneRole, PaneState, PartId, PartKind, SashState, StackState,
};
use crate::sash::{SashNode, SplitRatio};

/// Why a structural edit changed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNoopReason {
    UnknownPart,
    NotAContainer,
    SelfReference,
    AlreadyMember,
    NotAMember,
    WouldCreateCycle,
    /// The container does not accept children of this kind.
    RejectedKind,
    /// An unbound container placeholder only takes placeholder-kind children.
    PlaceholderOnly,
    RootIsFixed,
    SameChild,
    NotAContainerPlaceholder,
    NotBound,
    /// A real container must be detached before a placeholder can bind it.
    RealContainerAttached,
    /// The real container is already proxied by another placeholder.
    AlreadyProxied,
    /// Only a visible stack attached under the root can fill the layout.
    NotZoomable,
    AlreadyZoomed,
    NotZoomed,
}

/// Result of a structural edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "edit", rename_all = "snake_case")]
pub enum TreeEdit {
    Applied,
    Noop { reason: TreeNoopReason },
}

impl TreeEdit {
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }

    pub(crate) fn noop(reason: TreeNoopReason, op: &'static str) -> Self {
        debug!(op, ?reason, "layout edit ignored");
        Self::Noop { reason }
    }
}

/// Where an attached child lands inside its new container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placement {
    Append,
    At(usize),
    Docked {
        side: Side,
        ratio: SplitRatio,
        relative: Option<PartId>,
    },
}

/// Solved rectangles for one layout pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartLayout {
    pub area: Rect,
    rects: BTreeMap<PartId, Rect>,
    tabs: BTreeMap<PartId, Vec<(PartId, Rect)>>,
}

impl PartLayout {
    /// Rectangle of a rendered part.
    #[must_use]
    pub fn rect(&self, part: PartId) -> Option<Rect> {
        self.rects.get(&part).copied()
    }

    /// Iterate all solved rectangles in deterministic ID order.
    pub fn iter(&self) -> impl Iterator<Item = (PartId, Rect)> + '_ {
        self.rects.iter().map(|(part, rect)| (*part, *rect))
    }

    /// Tab handles of one stack in tab order.
    #[must_use]
    pub fn tabs(&self, stack: PartId) -> &[(PartId, Rect)] {
        self.tabs.get(&stack).map_or(&[], Vec::as_slice)
    }

    /// Iterate the tab strips of every rendered stack.
    pub fn tab_strips(&self) -> impl Iterator<Item = (PartId, &[(PartId, Rect)])> + '_ {
        self.tabs.iter().map(|(stack, tabs)| (*stack, tabs.as_slice()))
    }
}

/// Layout container tree with one root sash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutTree {
    pub(crate) root: PartId,
    pub(crate) next_id: PartId,
    pub(crate) parts: BTreeMap<PartId, LayoutPart>,
    pub(crate) zoomed: Option<PartId>,
}

impl LayoutTree {
    /// Create a tree holding only an empty root sash.
    pub fn new(root_key: impl Into<String>) -> Result<Self, LayoutError> {
        let root_key = root_key.into();
        if root_key.is_empty() {
            return Err(LayoutError::EmptyKey);
        }
        let root = PartId::MIN;
        let mut parts = BTreeMap::new();
        let _ = parts.insert(
            root,
            LayoutPart::new(root, root_key, PartKind::Sash(SashState::default())),
        );
        Ok(Self {
            root,
            next_id: root.checked_next()?,
            parts,
            zoomed: None,
        })
    }

    #[must_use]
    pub const fn root(&self) -> PartId {
        self.root
    }

    #[must_use]
    pub const fn next_id(&self) -> PartId {
        self.next_id
    }

    #[must_use]
    pub fn part(&self, id: PartId) -> Option<&LayoutPart> {
        self.parts.get(&id)
    }

    /// Iterate every part in the arena, attached or not, in ID order.
    pub fn parts(&self) -> impl Iterator<Item = &LayoutPart> + '_ {
        self.parts.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub(crate) fn allocate(&mut self, key: String, kind: PartKind) -> Result<PartId, LayoutError> {
        if key.is_empty() {
            return Err(LayoutError::EmptyKey);
        }
        let id = self.next_id;
        self.next_id = id.checked_next()?;
        let _ = self.parts.insert(id, LayoutPart::new(id, key, kind));
        Ok(id)
    }

    /// Create a detached live pane.
    pub fn create_pane(
        &mut self,
        key: impl Into<String>,
        role: PaneRole,
        label: impl Into<String>,
    ) -> Result<PartId, LayoutError> {
        self.allocate(
            key.into(),
            PartKind::Pane(PaneState {
                role,
                label: label.into(),
            }),
        )
    }

    /// Create a detached part placeholder.
    pub fn create_placeholder(&mut self, key: impl Into<String>) -> Result<PartId, LayoutError> {
        self.allocate(key.into(), PartKind::Placeholder)
    }

    /// Create a detached, empty tab stack.
    pub fn create_stack(&mut self, key: impl Into<String>) -> Result<PartId, LayoutError> {
        self.allocate(key.into(), PartKind::Stack(StackState::default()))
    }

    /// Create a detached, empty sash.
    pub fn create_sash(&mut self, key: impl Into<String>) -> Result<PartId, LayoutError> {
        self.allocate(key.into(), PartKind::Sash(SashState::default()))
    }

    /// Create a detached, unbound container placeholder.
    pub fn create_container_placeholder(
        &mut self,
        key: impl Into<String>,
    ) -> Result<PartId, LayoutError> {
        self.allocate(
            key.into(),
            PartKind::ContainerPlaceholder(ContainerSlot::default()),
        )
    }

    /// Drop a detached part from the arena.
    ///
    /// Parts that are still attached, proxied, or hold children stay put.
    pub fn discard(&mut self, part: PartId) -> TreeEdit {
        let Some(record) = self.parts.get(&part) else {
            return TreeEdit::noop(TreeNoopReason::UnknownPart, "discard");
        };
        if part == self.root {
            return TreeEdit::noop(TreeNoopReason::RootIsFixed, "discard");
        }
        if record.container.is_some()
            || record.proxied_by.is_some()
            || !record.kind.stored_children().is_empty()
            || record.bound_real().is_some()
        {
            return TreeEdit::noop(TreeNoopReason::AlreadyMember, "discard");
        }
        let _ = self.parts.remove(&part);
        TreeEdit::Applied
    }

    /// Flip a live pane's own visibility flag.
    pub fn set_visible(&mut self, part: PartId, visible: bool) -> TreeEdit {
        match self.parts.get_mut(&part) {
            Some(record) if record.is_pane() => {
                record.visible = visible;
                TreeEdit::Applied
            }
            Some(_) => TreeEdit::noop(TreeNoopReason::RejectedKind, "set_visible"),
            None => TreeEdit::noop(TreeNoopReason::UnknownPart, "set_visible"),
        }
    }

    // ---- traversal --------------------------------------------------------

    /// Ordered children of a container.
    ///
    /// A bound container placeholder reports its real container's children.
    /// Anything else that is not a container, including unknown IDs, has none.
    #[must_use]
    pub fn children(&self, container: PartId) -> &[PartId] {
        let Some(record) = self.parts.get(&container) else {
            return &[];
        };
        match record.bound_real() {
            Some(real) => self
                .parts
                .get(&real)
                .map_or(&[], |real| real.kind.stored_children()),
            None => record.kind.stored_children(),
        }
    }

    /// Apparent parent of a part.
    #[must_use]
    pub fn container(&self, part: PartId) -> Option<PartId> {
        self.parts.get(&part).and_then(|record| record.container)
    }

    /// Parent used for ancestry: the container, or for a proxied real
    /// container that sits detached, the placeholder standing in for it.
    pub(crate) fn logical_parent(&self, part: PartId) -> Option<PartId> {
        let record = self.parts.get(&part)?;
        record.container.or(record.proxied_by)
    }

    /// Topmost ancestor reached by following parents. `None` when the chain
    /// does not terminate within the arena size.
    pub(crate) fn topmost(&self, part: PartId) -> Option<PartId> {
        let mut current = part;
        for _ in 0..=self.parts.len() {
            match self.logical_parent(current) {
                Some(parent) => current = parent,
                None => return Some(current),
            }
        }
        warn!(part = part.get(), "parent chain does not terminate");
        None
    }

    /// Root container of a part, or `None` if it is not attached under this
    /// tree's root sash.
    #[must_use]
    pub fn root_container(&self, part: PartId) -> Option<PartId> {
        if !self.parts.contains_key(&part) {
            return None;
        }
        self.topmost(part).filter(|top| *top == self.root)
    }

    /// Whether `ancestor` is `part` or one of its ancestors.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: PartId, part: PartId) -> bool {
        let mut current = Some(part);
        for _ in 0..=self.parts.len() {
            match current {
                Some(id) if id == ancestor => return true,
                Some(id) => current = self.logical_parent(id),
                None => return false,
            }
        }
        false
    }

    /// Ancestors of `part`, nearest first.
    #[must_use]
    pub fn ancestors(&self, part: PartId) -> Vec<PartId> {
        let mut out = Vec::new();
        let mut current = part;
        while let Some(parent) = self.logical_parent(current) {
            if out.len() >= self.parts.len() || out.contains(&parent) {
                warn!(part = part.get(), "parent chain does not terminate");
                break;
            }
            out.push(parent);
            current = parent;
        }
        out
    }

    /// Number of ancestors above `part`.
    #[must_use]
    pub fn depth(&self, part: PartId) -> usize {
        let mut depth = 0;
        let mut current = part;
        while let Some(parent) = self.logical_parent(current) {
            depth += 1;
            if depth > self.parts.len() {
                break;
            }
            current = parent;
        }
        depth
    }

    /// Preorder walk of `start` and everything reachable through
    /// [`Self::children`].
    #[must_use]
    pub fn descendants(&self, start: PartId) -> Vec<PartId> {
        let mut out = Vec::new();
        let mut seen = FxHashSet::default();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if !self.parts.contains_key(&id) || !seen.insert(id) {
                continue;
            }
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Part with `key` attached under the root, if any.
    #[must_use]
    pub fn find_by_key(&self, key: &str) -> Option<PartId> {
        self.descendants(self.root)
            .into_iter()
            .find(|id| self.parts.get(id).is_some_and(|part| part.key == key))
    }

    /// Effective visibility: live panes by flag, containers when any child is
    /// visible. Placeholders of either kind never show.
    #[must_use]
    pub fn is_effectively_visible(&self, part: PartId) -> bool {
        self.visible_within(part, self.parts.len())
    }

    fn visible_within(&self, part: PartId, budget: usize) -> bool {
        let Some(record) = self.parts.get(&part) else {
            return false;
        };
        match &record.kind {
            PartKind::Pane(_) => record.visible,
            PartKind::Placeholder | PartKind::ContainerPlaceholder(_) => false,
            PartKind::Stack(_) | PartKind::Sash(_) => {
                budget > 0
                    && record.visible
                    && record
                        .kind
                        .stored_children()
                        .iter()
                        .any(|child| self.visible_within(*child, budget - 1))
            }
        }
    }

    // ---- structural edits -------------------------------------------------

    /// Container that physically stores children for `container`.
    fn storage_for(
        &self,
        container: PartId,
        child_kind_is_placeholder: bool,
        op: &'static str,
    ) -> Result<PartId, TreeEdit> {
        let Some(record) = self.parts.get(&container) else {
            return Err(TreeEdit::noop(TreeNoopReason::UnknownPart, op));
        };
        match &record.kind {
            PartKind::Stack(_) | PartKind::Sash(_) => Ok(container),
            PartKind::ContainerPlaceholder(ContainerSlot::Bound { real }) => {
                if self.parts.contains_key(real) {
                    Ok(*real)
                } else {
                    Err(TreeEdit::noop(TreeNoopReason::UnknownPart, op))
                }
            }
            PartKind::ContainerPlaceholder(ContainerSlot::Unbound { .. }) => {
                if child_kind_is_placeholder {
                    Ok(container)
                } else {
                    Err(TreeEdit::noop(TreeNoopReason::PlaceholderOnly, op))
                }
            }
            PartKind::Pane(_) | PartKind::Placeholder => {
                Err(TreeEdit::noop(TreeNoopReason::NotAContainer, op))
            }
        }
    }

    /// Parent recorded on children stored in `storage`.
    fn apparent(&self, storage: PartId) -> PartId {
        self.parts
            .get(&storage)
            .and_then(|record| record.proxied_by)
            .unwrap_or(storage)
    }

    pub(crate) fn accepts(&self, storage: PartId, child: PartId) -> bool {
        let (Some(storage), Some(child)) = (self.parts.get(&storage), self.parts.get(&child)) else {
            return false;
        };
        match storage.kind {
            PartKind::Stack(_) => matches!(child.kind, PartKind::Pane(_) | PartKind::Placeholder),
            PartKind::Sash(_) => true,
            PartKind::ContainerPlaceholder(_) => child.is_placeholder(),
            PartKind::Pane(_) | PartKind::Placeholder => false,
        }
    }

    /// Whether a container placeholder currently stands in for `part`.
    fn is_proxied(&self, part: PartId) -> bool {
        self.parts
            .get(&part)
            .is_some_and(|record| record.proxied_by.is_some())
    }

    fn kind_is_placeholder(&self, part: PartId) -> bool {
        self.parts.get(&part).is_some_and(LayoutPart::is_placeholder)
    }

    /// Append `child` to `container` and point it back at the container.
    ///
    /// A child attached elsewhere moves. Adding a current member, a part into
    /// itself, or an ancestor into a descendant changes nothing. A key clash
    /// with a part already under the same root is fatal.
    pub fn add(&mut self, container: PartId, child: PartId) -> Result<TreeEdit, LayoutError> {
        self.attach(container, child, Placement::Append, "add")
    }

    /// Insert `child` at `index` (clamped). A current member is reordered.
    pub fn insert_at(
        &mut self,
        container: PartId,
        child: PartId,
        index: usize,
    ) -> Result<TreeEdit, LayoutError> {
        self.attach(container, child, Placement::At(index), "insert_at")
    }

    /// Dock `child` into a sash on `side` of `relative`, or around the whole
    /// sash when `relative` is `None`. `ratio` weighs `child:existing`.
    pub fn add_relative(
        &mut self,
        sash: PartId,
        child: PartId,
        side: Side,
        ratio: SplitRatio,
        relative: Option<PartId>,
    ) -> Result<TreeEdit, LayoutError> {
        self.attach(
            sash,
            child,
            Placement::Docked {
                side,
                ratio,
                relative,
            },
            "add_relative",
        )
    }

    pub(crate) fn attach(
        &mut self,
        container: PartId,
        child: PartId,
        placement: Placement,
        op: &'static str,
    ) -> Result<TreeEdit, LayoutError> {
        if !self.parts.contains_key(&child) {
            return Ok(TreeEdit::noop(TreeNoopReason::UnknownPart, op));
        }
        if container == child {
            return Ok(TreeEdit::noop(TreeNoopReason::SelfReference, op));
        }
        if child == self.root {
            return Ok(TreeEdit::noop(TreeNoopReason::RootIsFixed, op));
        }
        if self.is_proxied(child) {
            return Ok(TreeEdit::noop(TreeNoopReason::AlreadyProxied, op));
        }
        let storage = match self.storage_for(container, self.kind_is_placeholder(child), op) {
            Ok(storage) => storage,
            Err(noop) => return Ok(noop),
        };
        if !self.accepts(storage, child) {
            return Ok(TreeEdit::noop(TreeNoopReason::RejectedKind, op));
        }
        if matches!(placement, Placement::Docked { .. })
            && !matches!(self.parts.get(&storage).map(|p| &p.kind), Some(PartKind::Sash(_)))
        {
            return Ok(TreeEdit::noop(TreeNoopReason::RejectedKind, op));
        }
        let already_member = self.stored(storage).contains(&child);
        if already_member && !matches!(placement, Placement::At(_)) {
            return Ok(TreeEdit::noop(TreeNoopReason::AlreadyMember, op));
        }
        let apparent = self.apparent(storage);
        if self.is_ancestor(child, apparent) || self.is_ancestor(child, storage) {
            return Ok(TreeEdit::noop(TreeNoopReason::WouldCreateCycle, op));
        }
        self.check_keys(apparent, &[child], &[])?;
        self.unzoom_for_edit(op);

        let was_selected = self.is_selected(storage, child);
        let placement = match placement {
            Placement::At(index) if already_member => {
                let position = self.stored(storage).iter().position(|c| *c == child);
                self.unlink(storage, child);
                Placement::At(match position {
                    Some(position) if position < index => index - 1,
                    _ => index,
                })
            }
            other => {
                self.detach(child);
                other
            }
        };
        self.link(storage, child, placement);
        if was_selected {
            self.reselect(storage, Some(child));
        }
        if let Some(record) = self.parts.get_mut(&child) {
            record.container = Some(apparent);
        }
        debug!(
            op,
            container = container.get(),
            child = child.get(),
            "attached part"
        );
        Ok(TreeEdit::Applied)
    }

    /// Detach `child` from `container`.
    ///
    /// The child's back-reference is cleared only when it still names this
    /// container. Removing a non-member changes nothing.
    pub fn remove(&mut self, container: PartId, child: PartId) -> TreeEdit {
        let op = "remove";
        if !self.parts.contains_key(&child) {
            return TreeEdit::noop(TreeNoopReason::UnknownPart, op);
        }
        let storage = match self.storage_for(container, self.kind_is_placeholder(child), op) {
            Ok(storage) => storage,
            Err(noop) => return noop,
        };
        if !self.stored(storage).contains(&child) {
            return TreeEdit::noop(TreeNoopReason::NotAMember, op);
        }
        self.unzoom_for_edit(op);
        self.unlink(storage, child);
        let apparent = self.apparent(storage);
        if let Some(record) = self.parts.get_mut(&child)
            && (record.container == Some(apparent) || record.container == Some(storage))
        {
            record.container = None;
        }
        TreeEdit::Applied
    }

    /// Put `new` exactly where `old` was: same index, same split leaf, and
    /// the stack selection when `old` was on top.
    pub fn replace(
        &mut self,
        container: PartId,
        old: PartId,
        new: PartId,
    ) -> Result<TreeEdit, LayoutError> {
        let op = "replace";
        if !self.parts.contains_key(&old) || !self.parts.contains_key(&new) {
            return Ok(TreeEdit::noop(TreeNoopReason::UnknownPart, op));
        }
        if old == new {
            return Ok(TreeEdit::noop(TreeNoopReason::SameChild, op));
        }
        if new == self.root {
            return Ok(TreeEdit::noop(TreeNoopReason::RootIsFixed, op));
        }
        if self.is_proxied(new) {
            return Ok(TreeEdit::noop(TreeNoopReason::AlreadyProxied, op));
        }
        let storage = match self.storage_for(container, self.kind_is_placeholder(new), op) {
            Ok(storage) => storage,
            Err(noop) => return Ok(noop),
        };
        if !self.accepts(storage, new) {
            return Ok(TreeEdit::noop(TreeNoopReason::RejectedKind, op));
        }
        let Some(index) = self.stored(storage).iter().position(|c| *c == old) else {
            return Ok(TreeEdit::noop(TreeNoopReason::NotAMember, op));
        };
        if self.stored(storage).contains(&new) {
            return Ok(TreeEdit::noop(TreeNoopReason::AlreadyMember, op));
        }
        let apparent = self.apparent(storage);
        if new == container || self.is_ancestor(new, apparent) || self.is_ancestor(new, storage) {
            return Ok(TreeEdit::noop(TreeNoopReason::WouldCreateCycle, op));
        }
        self.check_keys(apparent, &[new], &[old])?;

        self.unzoom_for_edit(op);
        let was_selected = self.is_selected(storage, old);
        self.detach(new);
        let Some(record) = self.parts.get_mut(&storage) else {
            return Ok(TreeEdit::noop(TreeNoopReason::UnknownPart, op));
        };
        // `detach(new)` never touches `storage`, so `index` is still valid.
        match &mut record.kind {
            PartKind::Stack(stack) => {
                stack.children[index] = new;
                if stack.selected == Some(old) {
                    stack.selected = None;
                }
            }
            PartKind::Sash(sash) => {
                sash.children[index] = new;
                if let Some(layout) = sash.layout.as_mut() {
                    let _ = layout.replace_leaf(old, new);
                }
            }
            PartKind::ContainerPlaceholder(ContainerSlot::Unbound { children }) => {
                children[index] = new;
            }
            PartKind::ContainerPlaceholder(ContainerSlot::Bound { .. })
            | PartKind::Pane(_)
            | PartKind::Placeholder => {
                return Ok(TreeEdit::noop(TreeNoopReason::NotAContainer, op));
            }
        }
        self.reselect(storage, was_selected.then_some(new));
        if let Some(record) = self.parts.get_mut(&new) {
            record.container = Some(apparent);
        }
        if let Some(record) = self.parts.get_mut(&old)
            && (record.container == Some(apparent) || record.container == Some(storage))
        {
            record.container = None;
        }
        debug!(
            container = container.get(),
            old = old.get(),
            new = new.get(),
            "replaced part"
        );
        Ok(TreeEdit::Applied)
    }

    /// Make `pane` the selected tab of its stack.
    pub fn select(&mut self, pane: PartId) -> TreeEdit {
        let op = "select";
        let Some(record) = self.parts.get(&pane) else {
            return TreeEdit::noop(TreeNoopReason::UnknownPart, op);
        };
        if !record.is_pane() {
            return TreeEdit::noop(TreeNoopReason::RejectedKind, op);
        }
        let Some(container) = record.container else {
            return TreeEdit::noop(TreeNoopReason::NotAMember, op);
        };
        let storage = self
            .parts
            .get(&container)
            .and_then(LayoutPart::bound_real)
            .unwrap_or(container);
        match self.parts.get_mut(&storage).map(|record| &mut record.kind) {
            Some(PartKind::Stack(stack)) if stack.children.contains(&pane) => {
                stack.selected = Some(pane);
                TreeEdit::Applied
            }
            Some(PartKind::Stack(_)) => TreeEdit::noop(TreeNoopReason::NotAMember, op),
            _ => TreeEdit::noop(TreeNoopReason::NotAContainer, op),
        }
    }

    fn is_selected(&self, storage: PartId, part: PartId) -> bool {
        matches!(
            self.parts.get(&storage).map(|record| &record.kind),
            Some(PartKind::Stack(stack)) if stack.selected == Some(part)
        )
    }

    pub(crate) fn stored(&self, storage: PartId) -> &[PartId] {
        self.parts
            .get(&storage)
            .map_or(&[], |record| record.kind.stored_children())
    }

    /// Physical container currently storing `part`.
    pub(crate) fn storage_of(&self, part: PartId) -> Option<PartId> {
        let parent = self.parts.get(&part)?.container?;
        let storage = self
            .parts
            .get(&parent)
            .and_then(LayoutPart::bound_real)
            .unwrap_or(parent);
        self.stored(storage).contains(&part).then_some(storage)
    }

    /// Remove `part` from wherever it is stored and clear its back-reference.
    pub(crate) fn detach(&mut self, part: PartId) {
        if let Some(storage) = self.storage_of(part) {
            self.unlink(storage, part);
        }
        if let Some(record) = self.parts.get_mut(&part) {
            record.container = None;
        }
    }

    fn unlink(&mut self, storage: PartId, child: PartId) {
        let Some(record) = self.parts.get_mut(&storage) else {
            return;
        };
        if let Some(children) = record.kind.stored_children_mut() {
            children.retain(|c| *c != child);
        }
        if let PartKind::Sash(sash) = &mut record.kind {
            sash.layout = sash.layout.take().and_then(|layout| layout.without(child));
        }
        if let PartKind::Stack(stack) = &mut record.kind
            && stack.selected == Some(child)
        {
            stack.selected = None;
        }
        self.reselect(storage, None);
    }

    pub(crate) fn link(&mut self, storage: PartId, child: PartId, placement: Placement) {
        let Some(record) = self.parts.get_mut(&storage) else {
            return;
        };
        if let PartKind::Sash(sash) = &mut record.kind {
            let (side, ratio, relative) = match placement {
                Placement::Docked {
                    side,
                    ratio,
                    relative,
                } => (side, ratio, relative),
                Placement::Append | Placement::At(_) => (
                    Side::Right,
                    SplitRatio::default(),
                    sash.layout.as_ref().map(SashNode::bottom_right),
                ),
            };
            if let Some(relative) = relative
                && !sash.children.contains(&relative)
            {
                debug!(
                    sash = storage.get(),
                    relative = relative.get(),
                    "dock relative is not a child; docking around the sash"
                );
            }
            sash.layout = Some(SashNode::docked(
                sash.layout.take(),
                child,
                side,
                ratio,
                relative,
            ));
        }
        if let Some(children) = record.kind.stored_children_mut() {
            match placement {
                Placement::At(index) => {
                    let index = index.min(children.len());
                    children.insert(index, child);
                }
                Placement::Append | Placement::Docked { .. } => children.push(child),
            }
        }
        self.reselect(storage, None);
    }

    /// Keep a stack's selection on one of its live panes.
    ///
    /// `prefer` wins when it is a live pane; otherwise an existing valid
    /// selection is kept, else the first live pane is chosen.
    fn reselect(&mut self, storage: PartId, prefer: Option<PartId>) {
        let panes: Vec<PartId> = self
            .stored(storage)
            .iter()
            .copied()
            .filter(|c| self.parts.get(c).is_some_and(LayoutPart::is_pane))
            .collect();
        let Some(PartKind::Stack(stack)) = self.parts.get_mut(&storage).map(|r| &mut r.kind) else {
            return;
        };
        if let Some(prefer) = prefer
            && panes.contains(&prefer)
        {
            stack.selected = Some(prefer);
            return;
        }
        if stack.selected.is_some_and(|selected| panes.contains(&selected)) {
            return;
        }
        stack.selected = panes.first().copied();
    }

    /// Reject the `incoming` subtrees if they repeat a key already used under
    /// the root of `destination`. `outgoing` subtrees are leaving and do not
    /// count.
    pub(crate) fn check_keys(
        &self,
        destination: PartId,
        incoming: &[PartId],
        outgoing: &[PartId],
    ) -> Result<(), LayoutError> {
        let Some(top) = self.topmost(destination) else {
            return Err(LayoutError::CycleDetected { part: destination });
        };
        let mut existing: FxHashMap<&str, PartId> = FxHashMap::default();
        let mut seen = FxHashSet::default();
        let mut stack = vec![top];
        while let Some(id) = stack.pop() {
            if incoming.contains(&id) || outgoing.contains(&id) || !seen.insert(id) {
                continue;
            }
            if let Some(record) = self.parts.get(&id) {
                let _ = existing.entry(record.key.as_str()).or_insert(id);
                stack.extend(self.children(id).iter().copied());
            }
        }
        for id in incoming.iter().flat_map(|root| self.descendants(*root)) {
            if let Some(record) = self.parts.get(&id)
                && let Some(holder) = existing.get(record.key.as_str())
            {
                return Err(LayoutError::DuplicateKey {
                    key: record.key.clone(),
                    existing: *holder,
                    incoming: id,
                });
            }
        }
        Ok(())
    }

    // ---- zoom -------------------------------------------------------------

    /// Stack currently filling the whole layout area, if any.
    #[must_use]
    pub const fn zoomed(&self) -> Option<PartId> {
        self.zoomed
    }

    #[must_use]
    pub const fn is_zoomed(&self) -> bool {
        self.zoomed.is_some()
    }

    /// Let one stack fill the whole layout area. A live pane zooms the
    /// stack holding it; zooming a second stack replaces the first.
    pub fn zoom_in(&mut self, part: PartId) -> TreeEdit {
        let op = "zoom_in";
        let Some(record) = self.parts.get(&part) else {
            return TreeEdit::noop(TreeNoopReason::UnknownPart, op);
        };
        let stack = if record.is_pane() {
            match self.storage_of(part) {
                Some(storage) => storage,
                None => return TreeEdit::noop(TreeNoopReason::NotAMember, op),
            }
        } else {
            part
        };
        let zoomable = self.parts.get(&stack).is_some_and(|record| {
            matches!(record.kind, PartKind::Stack(_)) && record.proxied_by.is_none()
        }) && self.root_container(stack) == Some(self.root)
            && self.is_effectively_visible(stack);
        if !zoomable {
            return TreeEdit::noop(TreeNoopReason::NotZoomable, op);
        }
        if self.zoomed == Some(stack) {
            return TreeEdit::noop(TreeNoopReason::AlreadyZoomed, op);
        }
        self.zoomed = Some(stack);
        debug!(stack = stack.get(), "zoomed in");
        TreeEdit::Applied
    }

    /// Give the whole layout back to the root.
    pub fn zoom_out(&mut self) -> TreeEdit {
        match self.zoomed.take() {
            Some(stack) => {
                debug!(stack = stack.get(), "zoomed out");
                TreeEdit::Applied
            }
            None => TreeEdit::noop(TreeNoopReason::NotZoomed, "zoom_out"),
        }
    }

    /// Structural edits always run against the unzoomed layout.
    pub(crate) fn unzoom_for_edit(&mut self, op: &'static str) {
        if let Some(stack) = self.zoomed.take() {
            debug!(op, stack = stack.get(), "zoom cleared by structural edit");
        }
    }

    // ---- validation -------------------------------------------------------

    /// Check every structural invariant of the attached tree.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let Some(root) = self.parts.get(&self.root) else {
            return Err(LayoutError::MissingRoot { root: self.root });
        };
        if !matches!(root.kind, PartKind::Sash(_)) {
            return Err(LayoutError::InvalidChildKind {
                container: self.root,
                child: self.root,
                kind: root.kind.name(),
            });
        }
        if let Some(parent) = root.container {
            return Err(LayoutError::RootHasParent {
                root: self.root,
                parent,
            });
        }

        for record in self.parts.values() {
            self.validate_part(record)?;
        }

        let mut keys: FxHashMap<&str, PartId> = FxHashMap::default();
        let mut visited = FxHashSet::default();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                return Err(LayoutError::CycleDetected { part: id });
            }
            let record = self
                .parts
                .get(&id)
                .ok_or(LayoutError::MissingPart { part: id })?;
            if let Some(existing) = keys.insert(record.key.as_str(), id) {
                return Err(LayoutError::DuplicateKey {
                    key: record.key.clone(),
                    existing,
                    incoming: id,
                });
            }
            stack.extend(self.children(id).iter().copied());
        }

        if let Some(zoomed) = self.zoomed
            && (!visited.contains(&zoomed)
                || !matches!(
                    self.parts.get(&zoomed).map(|record| &record.kind),
                    Some(PartKind::Stack(_))
                ))
        {
            return Err(LayoutError::InvalidZoom { part: zoomed });
        }
        Ok(())
    }

    fn validate_part(&self, record: &LayoutPart) -> Result<(), LayoutError> {
        let id = record.id;
        let apparent = record.proxied_by.unwrap_or(id);
        let children = record.kind.stored_children();
        let mut seen = FxHashSet::default();
        for child in children {
            if !seen.insert(*child) {
                return Err(LayoutError::DuplicateChild {
                    container: id,
                    child: *child,
                });
            }
            let child_record = self
                .parts
                .get(child)
                .ok_or(LayoutError::MissingPart { part: *child })?;
            if child_record.container != Some(apparent) {
                return Err(LayoutError::ParentMismatch {
                    part: *child,
                    expected: Some(apparent),
                    found: child_record.container,
                });
            }
            if !self.accepts(id, *child) {
                return Err(LayoutError::InvalidChildKind {
                    container: id,
                    child: *child,
                    kind: child_record.kind.name(),
                });
            }
        }

        match &record.kind {
            PartKind::Stack(stack) => {
                if let Some(selected) = stack.selected
                    && (!children.contains(&selected)
                        || !self.parts.get(&selected).is_some_and(LayoutPart::is_pane))
                {
                    return Err(LayoutError::InvalidSelection {
                        stack: id,
                        selected,
                    });
                }
            }
            PartKind::Sash(sash) => {
                let mut leaves = sash.layout.as_ref().map(SashNode::leaves).unwrap_or_default();
                let mut expected = sash.children.clone();
                leaves.sort_unstable();
                expected.sort_unstable();
                if leaves != expected {
                    return Err(LayoutError::SashLayoutMismatch { sash: id });
                }
            }
            PartKind::ContainerPlaceholder(ContainerSlot::Bound { real }) => {
                let real_record = self
                    .parts
                    .get(real)
                    .ok_or(LayoutError::MissingPart { part: *real })?;
                if real_record.proxied_by != Some(id)
                    || !matches!(real_record.kind, PartKind::Stack(_) | PartKind::Sash(_))
                {
                    return Err(LayoutError::BrokenBinding {
                        placeholder: id,
                        real: *real,
                    });
                }
            }
            PartKind::ContainerPlaceholder(ContainerSlot::Unbound { .. })
            | PartKind::Pane(_)
            | PartKind::Placeholder => {}
        }

        if let (Some(proxy), Some(parent)) = (record.proxied_by, record.container) {
            return Err(LayoutError::ProxiedContainerAttached {
                real: id,
                placeholder: proxy,
                parent,
            });
        }
        if let Some(proxy) = record.proxied_by
            && self.parts.get(&proxy).and_then(LayoutPart::bound_real) != Some(id)
        {
            return Err(LayoutError::BrokenBinding {
                placeholder: proxy,
                real: id,
            });
        }

        if let Some(parent) = record.container {
            let listed = self
                .parts
                .get(&parent)
                .map(|p| p.bound_real().unwrap_or(parent))
                .is_some_and(|storage| self.stored(storage).contains(&id));
            if !listed {
                return Err(LayoutError::ParentMismatch {
                    part: id,
                    expected: None,
                    found: Some(parent),
                });
            }
        }
        Ok(())
    }

    // ---- geometry ---------------------------------------------------------

    /// Solve rectangles for every rendered part inside `area`.
    ///
    /// Hidden subtrees collapse and give their space to their sibling. The
    /// selected pane of a stack fills the area below the tab strip; the other
    /// panes only get tab handles. A zoomed stack takes the whole area and
    /// nothing else is solved.
    #[must_use]
    pub fn solve_layout(&self, area: Rect, config: &LayoutConfig) -> PartLayout {
        let mut layout = PartLayout {
            area,
            rects: BTreeMap::new(),
            tabs: BTreeMap::new(),
        };
        let top = self
            .zoomed
            .filter(|stack| self.parts.contains_key(stack))
            .unwrap_or(self.root);
        self.solve_part(top, area, config, &mut layout, self.parts.len());
        layout
    }

    fn solve_part(
        &self,
        part: PartId,
        area: Rect,
        config: &LayoutConfig,
        layout: &mut PartLayout,
        budget: usize,
    ) {
        let Some(record) = self.parts.get(&part) else {
            return;
        };
        if budget == 0 {
            warn!(part = part.get(), "layout recursion budget exhausted");
            return;
        }
        match &record.kind {
            PartKind::Pane(_) => {
                let _ = layout.rects.insert(part, area);
            }
            PartKind::Placeholder | PartKind::ContainerPlaceholder(_) => {}
            PartKind::Sash(sash) => {
                let _ = layout.rects.insert(part, area);
                let Some(split) = sash.layout.as_ref() else {
                    return;
                };
                let mut solved = Vec::new();
                split.solve(area, &|child| self.is_effectively_visible(child), &mut solved);
                for (child, rect) in solved {
                    self.solve_part(child, rect, config, layout, budget - 1);
                }
            }
            PartKind::Stack(stack) => {
                let _ = layout.rects.insert(part, area);
                let strip = config.tab_strip_height.min(area.height);
                let tabs: Vec<PartId> = stack
                    .children
                    .iter()
                    .copied()
                    .filter(|child| self.is_effectively_visible(*child))
                    .collect();
                if !tabs.is_empty() && strip > 0 {
                    let count = u16::try_from(tabs.len()).unwrap_or(u16::MAX);
                    let width = area.width / count;
                    let mut handles = Vec::with_capacity(tabs.len());
                    let mut x = area.x;
                    for (index, tab) in tabs.iter().enumerate() {
                        let last = index + 1 == tabs.len();
                        let tab_width = if last {
                            area.right().saturating_sub(x)
                        } else {
                            width
                        };
                        handles.push((*tab, Rect::new(x, area.y, tab_width, strip)));
                        x = x.saturating_add(width);
                    }
                    let _ = layout.tabs.insert(part, handles);
                }
                if let Some(selected) = stack.selected
                    && tabs.contains(&selected)
                {
                    let content = Rect::new(
                        area.x,
                        area.y.saturating_add(strip),
                        area.width,
                        area.height.saturating_sub(strip),
                    );
                    let _ = layout.rects.insert(selected, content);
                }
            }
        }
    }

    /// Roles of the live panes in `part`, or of `part` itself when it is a pane.
    pub(crate) fn pane_roles(&self, part: PartId) -> Vec<PaneRole> {
        let Some(record) = self.parts.get(&part) else {
            return Vec::new();
        };
        if let Some(role) = record.pane_role() {
            return vec![role];
        }
        self.children(part)
            .iter()
            .filter_map(|child| self.parts.get(child).and_then(LayoutPart::pane_role))
            .collect()
    }
}
