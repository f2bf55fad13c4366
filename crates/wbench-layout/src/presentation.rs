//! Perspective presentation: opening and closing panes against a layout that
//! was built with placeholders.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, warn};
use wbench_core::geometry::Side;

use crate::config::LayoutConfig;
use crate::drop::split_host;
use crate::error::{ConfigError, LayoutError};
use crate::part::{LayoutPart, PaneRole, PartId, PartKind};
use crate::sash::{SashNode, SplitRatio};
use crate::tree::{LayoutTree, TreeEdit};

/// What the window knows about a pane key before it is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartDescriptor {
    pub label: String,
    pub role: PaneRole,
}

/// Source of pane descriptors, keyed by pane key.
pub trait PartRegistry {
    fn describe(&self, key: &str) -> Option<PartDescriptor>;
}

/// In-memory [`PartRegistry`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticPartRegistry {
    parts: BTreeMap<String, PartDescriptor>,
}

impl StaticPartRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(
        mut self,
        key: impl Into<String>,
        label: impl Into<String>,
        role: PaneRole,
    ) -> Self {
        self.register(key, label, role);
        self
    }

    pub fn register(&mut self, key: impl Into<String>, label: impl Into<String>, role: PaneRole) {
        let _ = self.parts.insert(
            key.into(),
            PartDescriptor {
                label: label.into(),
                role,
            },
        );
    }
}

impl PartRegistry for StaticPartRegistry {
    fn describe(&self, key: &str) -> Option<PartDescriptor> {
        self.parts.get(key).cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PerspectiveError {
    Config(ConfigError),
    Layout(LayoutError),
}

impl fmt::Display for PerspectiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(error) => write!(f, "invalid perspective configuration: {error}"),
            Self::Layout(error) => write!(f, "perspective layout error: {error}"),
        }
    }
}

impl std::error::Error for PerspectiveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(error) => Some(error),
            Self::Layout(error) => Some(error),
        }
    }
}

impl From<ConfigError> for PerspectiveError {
    fn from(error: ConfigError) -> Self {
        Self::Config(error)
    }
}

impl From<LayoutError> for PerspectiveError {
    fn from(error: LayoutError) -> Self {
        Self::Layout(error)
    }
}

/// A layout tree plus the registry that says which keys can become panes.
#[derive(Debug, Clone)]
pub struct Perspective<R = StaticPartRegistry> {
    tree: LayoutTree,
    registry: R,
    config: LayoutConfig,
}

impl<R: PartRegistry> Perspective<R> {
    pub fn new(
        root_key: impl Into<String>,
        registry: R,
        config: LayoutConfig,
    ) -> Result<Self, PerspectiveError> {
        Self::from_tree(LayoutTree::new(root_key)?, registry, config)
    }

    pub fn from_tree(
        tree: LayoutTree,
        registry: R,
        config: LayoutConfig,
    ) -> Result<Self, PerspectiveError> {
        config.validate()?;
        Ok(Self {
            tree,
            registry,
            config,
        })
    }

    #[must_use]
    pub const fn tree(&self) -> &LayoutTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut LayoutTree {
        &mut self.tree
    }

    #[must_use]
    pub const fn registry(&self) -> &R {
        &self.registry
    }

    #[must_use]
    pub const fn config(&self) -> &LayoutConfig {
        &self.config
    }

    #[must_use]
    pub fn into_tree(self) -> LayoutTree {
        self.tree
    }

    // ---- building ---------------------------------------------------------

    /// Create a stack docked on `side` of the part keyed `relative`, or of
    /// the whole root when `relative` is `None` or unknown. `ratio` weighs
    /// `new:existing`.
    pub fn create_folder(
        &mut self,
        key: impl Into<String>,
        side: Side,
        ratio: SplitRatio,
        relative: Option<&str>,
    ) -> Result<Option<PartId>, LayoutError> {
        let folder = self.tree.create_stack(key)?;
        let relative_id = relative.and_then(|key| self.tree.find_by_key(key));
        if relative.is_some() && relative_id.is_none() {
            debug!(relative, "folder relative not found; docking around the root");
        }
        let (sash, relative_id) = relative_id
            .and_then(|id| split_host(&self.tree, id))
            .unwrap_or((self.tree.root(), None));
        let edit = match self.tree.add_relative(sash, folder, side, ratio, relative_id) {
            Ok(edit) => edit,
            Err(error) => {
                let _ = self.tree.discard(folder);
                return Err(error);
            }
        };
        if !edit.is_applied() {
            let _ = self.tree.discard(folder);
            return Ok(None);
        }
        Ok(Some(folder))
    }

    /// Open a live pane for a registered `key` directly in `folder`.
    pub fn add_view(&mut self, folder: PartId, key: &str) -> Result<Option<PartId>, LayoutError> {
        let Some(descriptor) = self.describe(key, "add_view") else {
            return Ok(None);
        };
        let pane = self
            .tree
            .create_pane(key, descriptor.role, descriptor.label)?;
        self.attach_new(folder, pane)
    }

    /// Reserve a slot for a registered `key` in `folder`.
    pub fn add_placeholder(
        &mut self,
        folder: PartId,
        key: &str,
    ) -> Result<Option<PartId>, LayoutError> {
        if self.describe(key, "add_placeholder").is_none() {
            return Ok(None);
        }
        let placeholder = self.tree.create_placeholder(key)?;
        self.attach_new(folder, placeholder)
    }

    fn attach_new(&mut self, folder: PartId, part: PartId) -> Result<Option<PartId>, LayoutError> {
        let edit = match self.tree.add(folder, part) {
            Ok(edit) => edit,
            Err(error) => {
                let _ = self.tree.discard(part);
                return Err(error);
            }
        };
        if edit.is_applied() {
            Ok(Some(part))
        } else {
            let _ = self.tree.discard(part);
            Ok(None)
        }
    }

    fn describe(&self, key: &str, op: &'static str) -> Option<PartDescriptor> {
        let descriptor = self.registry.describe(key);
        if descriptor.is_none() {
            debug!(op, key, "unregistered part key ignored");
        }
        descriptor
    }

    // ---- opening and closing ----------------------------------------------

    /// Show the pane for `key`.
    ///
    /// A placeholder for `key` is swapped for the live pane in place,
    /// rematerializing its container first when that container was collapsed.
    /// Without a placeholder the pane stacks onto the bottom-right stack, or
    /// docks into the root when that stack holds editors. An already open
    /// pane is brought to the top. Unregistered keys return `None`.
    pub fn open_part(&mut self, key: &str) -> Result<Option<PartId>, LayoutError> {
        let Some(descriptor) = self.describe(key, "open_part") else {
            return Ok(None);
        };
        if let Some(existing) = self.tree.find_by_key(key) {
            match self.tree.part(existing).map(|p| &p.kind) {
                Some(PartKind::Pane(_)) => {
                    let _ = self.bring_part_to_top(existing);
                    return Ok(Some(existing));
                }
                Some(PartKind::Placeholder) => {
                    return self.replace_placeholder(existing, descriptor);
                }
                _ => {
                    warn!(key, "key names a container, not a pane");
                    return Ok(None);
                }
            }
        }

        let pane = self
            .tree
            .create_pane(key, descriptor.role, descriptor.label)?;
        let target = self
            .bottom_right_stack()
            .filter(|stack| !self.tree.pane_roles(*stack).contains(&PaneRole::Editor))
            .unwrap_or(self.tree.root());
        if let Err(error) = self.tree.add(target, pane) {
            let _ = self.tree.discard(pane);
            return Err(error);
        }
        let _ = self.tree.select(pane);
        debug!(key, target = target.get(), "opened part without placeholder");
        Ok(Some(pane))
    }

    fn replace_placeholder(
        &mut self,
        placeholder: PartId,
        descriptor: PartDescriptor,
    ) -> Result<Option<PartId>, LayoutError> {
        let Some(mut container) = self.tree.container(placeholder) else {
            return Ok(None);
        };
        if self
            .tree
            .part(container)
            .and_then(LayoutPart::bound_real)
            .is_some()
        {
            let collapsed = container;
            let Some(real) = self.tree.restore_real_container(collapsed)? else {
                return Ok(None);
            };
            let _ = self.tree.discard(collapsed);
            container = real;
        }
        let Some(record) = self.tree.part(placeholder) else {
            return Ok(None);
        };
        let key = record.key.clone();
        let pane = self
            .tree
            .create_pane(key.as_str(), descriptor.role, descriptor.label)?;
        let edit = match self.tree.replace(container, placeholder, pane) {
            Ok(edit) => edit,
            Err(error) => {
                let _ = self.tree.discard(pane);
                return Err(error);
            }
        };
        if !edit.is_applied() {
            let _ = self.tree.discard(pane);
            return Ok(None);
        }
        let _ = self.tree.discard(placeholder);
        let _ = self.tree.select(pane);
        debug!(key = key.as_str(), container = container.get(), "placeholder replaced by pane");
        Ok(Some(pane))
    }

    /// Bottom-right leaf of the root split, following nested sashes.
    fn bottom_right_stack(&self) -> Option<PartId> {
        let mut current = self.tree.root();
        for _ in 0..=self.tree.len() {
            let record = self.tree.part(current)?;
            match &record.kind {
                PartKind::Sash(sash) => current = sash.layout.as_ref().map(SashNode::bottom_right)?,
                PartKind::Stack(_) => return Some(current),
                _ => return None,
            }
        }
        None
    }

    /// Put a fresh placeholder where `pane` was and drop the pane.
    ///
    /// A non-root container left holding only placeholders is swapped out of
    /// its parent for a container placeholder bound to it. Returns the new
    /// placeholder.
    pub fn close_part(&mut self, pane: PartId) -> Result<Option<PartId>, LayoutError> {
        let Some(record) = self.tree.part(pane).filter(|p| p.is_pane()) else {
            debug!(part = pane.get(), "close ignored for non-pane");
            return Ok(None);
        };
        let key = record.key.clone();
        let Some(container) = record.container else {
            return Ok(None);
        };
        let placeholder = self.tree.create_placeholder(key.as_str())?;
        let edit = match self.tree.replace(container, pane, placeholder) {
            Ok(edit) => edit,
            Err(error) => {
                let _ = self.tree.discard(placeholder);
                return Err(error);
            }
        };
        if !edit.is_applied() {
            let _ = self.tree.discard(placeholder);
            return Ok(None);
        }
        let _ = self.tree.discard(pane);
        debug!(key = key.as_str(), "part closed");

        if container != self.tree.root() {
            self.collapse_if_hidden(container)?;
        }
        Ok(Some(placeholder))
    }

    fn collapse_if_hidden(&mut self, container: PartId) -> Result<(), LayoutError> {
        let Some(record) = self.tree.part(container) else {
            return Ok(());
        };
        if !matches!(record.kind, PartKind::Stack(_) | PartKind::Sash(_)) {
            return Ok(());
        }
        let Some(parent) = record.container else {
            return Ok(());
        };
        let children = self.tree.children(container);
        let all_placeholders = !children.is_empty()
            && children
                .iter()
                .all(|child| self.tree.part(*child).is_some_and(LayoutPart::is_placeholder));
        if !all_placeholders {
            return Ok(());
        }
        let key = record.key.clone();
        let collapsed = self.tree.create_container_placeholder(key)?;
        if !self.tree.replace(parent, container, collapsed)?.is_applied() {
            let _ = self.tree.discard(collapsed);
            return Ok(());
        }
        let bound = self.tree.set_real_container(collapsed, Some(container))?;
        if !bound.is_applied() {
            warn!(
                container = container.get(),
                ?bound,
                "could not bind collapsed container; restoring it"
            );
            let _ = self.tree.replace(parent, collapsed, container)?;
            let _ = self.tree.discard(collapsed);
            return Ok(());
        }
        debug!(container = container.get(), "container collapsed into placeholder");
        Ok(())
    }

    // ---- zoom -------------------------------------------------------------

    /// Let the stack holding `part` (or `part` itself, when it is a stack)
    /// fill the window.
    pub fn zoom_in(&mut self, part: PartId) -> TreeEdit {
        self.tree.zoom_in(part)
    }

    pub fn zoom_out(&mut self) -> TreeEdit {
        self.tree.zoom_out()
    }

    #[must_use]
    pub const fn is_zoomed(&self) -> bool {
        self.tree.is_zoomed()
    }

    /// Whether showing or activating `part` has to end the zoom: the layout
    /// is zoomed and `part` is not inside the zoomed stack.
    #[must_use]
    pub fn part_change_affects_zoom(&self, part: PartId) -> bool {
        let Some(zoomed) = self.tree.zoomed() else {
            return false;
        };
        part != zoomed && self.tree.storage_of(part) != Some(zoomed)
    }

    // ---- queries ----------------------------------------------------------

    /// Part attached under the root with `key`, looking through collapsed
    /// containers.
    #[must_use]
    pub fn find_part(&self, key: &str) -> Option<PartId> {
        self.tree.find_by_key(key)
    }

    #[must_use]
    pub fn has_placeholder(&self, key: &str) -> bool {
        self.find_part(key)
            .and_then(|id| self.tree.part(id))
            .is_some_and(|part| matches!(part.kind, PartKind::Placeholder))
    }

    /// Every part placeholder under the root, in preorder.
    #[must_use]
    pub fn collect_placeholders(&self) -> Vec<PartId> {
        self.tree
            .descendants(self.tree.root())
            .into_iter()
            .filter(|id| {
                self.tree
                    .part(*id)
                    .is_some_and(|part| matches!(part.kind, PartKind::Placeholder))
            })
            .collect()
    }

    /// Whether the part for `key` is showing now: a live pane that is not
    /// inside a collapsed container and is the selected tab of its stack.
    #[must_use]
    pub fn is_part_visible(&self, key: &str) -> bool {
        let Some(part) = self.find_part(key).and_then(|id| self.tree.part(id)) else {
            return false;
        };
        if !part.is_pane() || !part.visible {
            return false;
        }
        if let Some(zoomed) = self.tree.zoomed()
            && self.tree.storage_of(part.id) != Some(zoomed)
        {
            return false;
        }
        let Some(container) = part.container else {
            return true;
        };
        match self.tree.part(container).map(|c| &c.kind) {
            Some(PartKind::ContainerPlaceholder(_)) => false,
            Some(PartKind::Stack(stack)) => stack.selected == Some(part.id),
            _ => true,
        }
    }

    /// Whether the part for `key` would show once its container is
    /// materialized: it is on top of its stack, or not in a stack at all.
    #[must_use]
    pub fn will_part_be_visible(&self, key: &str) -> bool {
        let Some(part) = self.find_part(key).and_then(|id| self.tree.part(id)) else {
            return false;
        };
        let Some(container) = part.container else {
            return true;
        };
        let storage = self
            .tree
            .part(container)
            .and_then(LayoutPart::bound_real)
            .unwrap_or(container);
        match self.tree.part(storage).map(|c| &c.kind) {
            Some(PartKind::Stack(stack)) => stack.selected == Some(part.id),
            _ => true,
        }
    }

    /// Make `part` the selected tab of its stack. Returns whether the
    /// selection changed. Activating a part outside the zoomed stack zooms
    /// out.
    pub fn bring_part_to_top(&mut self, part: PartId) -> bool {
        let Some(container) = self.tree.container(part) else {
            return false;
        };
        if self.part_change_affects_zoom(part) {
            let _ = self.tree.zoom_out();
        }
        let selected = match self.tree.part(container).map(|c| &c.kind) {
            Some(PartKind::Stack(stack)) => stack.selected,
            _ => return false,
        };
        if selected == Some(part) {
            return false;
        }
        self.tree.select(part).is_applied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> StaticPartRegistry {
        StaticPartRegistry::new()
            .with("outline", "Outline", PaneRole::View)
            .with("log", "Error Log", PaneRole::View)
            .with("search", "Search", PaneRole::View)
            .with("doc", "Document", PaneRole::Editor)
    }

    /// `root(editors{doc} | side{outline, ?log})`
    fn perspective() -> (Perspective, PartId, PartId) {
        let mut perspective =
            Perspective::new("root", registry(), LayoutConfig::default()).expect("perspective");
        let editors = perspective
            .create_folder("editors", Side::Left, SplitRatio::EVEN, None)
            .expect("folder")
            .expect("docked");
        perspective.add_view(editors, "doc").expect("doc");
        let side = perspective
            .create_folder("side", Side::Right, SplitRatio::ONE_TO_THREE, Some("editors"))
            .expect("folder")
            .expect("docked");
        perspective.add_view(side, "outline").expect("outline");
        perspective.add_placeholder(side, "log").expect("log");
        (perspective, editors, side)
    }

    #[test]
    fn unregistered_keys_are_ignored() {
        let (mut perspective, editors, _) = perspective();
        let before = perspective.tree().clone();
        assert_eq!(perspective.add_view(editors, "nope"), Ok(None));
        assert_eq!(perspective.add_placeholder(editors, "nope"), Ok(None));
        assert_eq!(perspective.open_part("nope"), Ok(None));
        assert_eq!(perspective.tree(), &before);
    }

    #[test]
    fn open_swaps_placeholder_in_place() {
        let (mut perspective, _, side) = perspective();
        assert!(perspective.has_placeholder("log"));
        assert!(!perspective.is_part_visible("log"));
        let placeholder = perspective.find_part("log").expect("placeholder");
        let index = perspective
            .tree()
            .children(side)
            .iter()
            .position(|c| *c == placeholder);

        let pane = perspective.open_part("log").expect("open").expect("pane");
        assert_eq!(
            perspective.tree().children(side).iter().position(|c| *c == pane),
            index
        );
        assert!(!perspective.has_placeholder("log"));
        assert!(perspective.is_part_visible("log"));
        assert!(!perspective.is_part_visible("outline"));
        assert!(perspective.tree().part(placeholder).is_none());
        perspective.tree().validate().expect("valid tree");
    }

    #[test]
    fn closing_last_live_pane_collapses_the_stack() {
        let (mut perspective, _, side) = perspective();
        let outline = perspective.find_part("outline").expect("outline");
        let placeholder = perspective
            .close_part(outline)
            .expect("close")
            .expect("placeholder");
        assert!(perspective.tree().part(outline).is_none());
        assert_eq!(perspective.tree().container(side), None);
        let collapsed = perspective
            .tree()
            .container(placeholder)
            .expect("placeholder is attached");
        assert_eq!(
            perspective.tree().part(collapsed).and_then(LayoutPart::bound_real),
            Some(side)
        );
        assert!(perspective.has_placeholder("outline"));
        assert_eq!(perspective.collect_placeholders().len(), 2);
        assert!(!perspective.is_part_visible("outline"));
        perspective.tree().validate().expect("valid tree");

        // Reopening brings the stack back where it was.
        let pane = perspective.open_part("log").expect("open").expect("pane");
        assert_eq!(perspective.tree().container(pane), Some(side));
        assert!(perspective.tree().container(side).is_some());
        assert!(perspective.tree().part(collapsed).is_none());
        assert!(perspective.will_part_be_visible("log"));
        assert!(!perspective.will_part_be_visible("outline"));
        perspective.tree().validate().expect("valid tree");
    }

    #[test]
    fn open_without_placeholder_avoids_editor_stacks() {
        let (mut perspective, editors, side) = perspective();
        let search = perspective.open_part("search").expect("open").expect("pane");
        // The bottom-right stack is `side`, which holds views.
        assert_eq!(perspective.tree().container(search), Some(side));
        assert!(perspective.is_part_visible("search"));
        assert_ne!(perspective.tree().container(search), Some(editors));

        assert_eq!(perspective.open_part("search"), Ok(Some(search)));
    }

    #[test]
    fn bring_to_top_reports_changes() {
        let (mut perspective, _, _) = perspective();
        let outline = perspective.find_part("outline").expect("outline");
        assert!(!perspective.bring_part_to_top(outline));
        let log = perspective.open_part("log").expect("open").expect("pane");
        assert!(perspective.bring_part_to_top(outline));
        assert!(perspective.is_part_visible("outline"));
        assert!(!perspective.is_part_visible("log"));
        assert!(perspective.will_part_be_visible("outline"));
        assert!(perspective.bring_part_to_top(log));
        assert!(perspective.is_part_visible("log"));
    }

    #[test]
    fn zoom_ends_when_a_part_outside_it_is_activated() {
        let (mut perspective, editors, _) = perspective();
        let doc = perspective.find_part("doc").expect("doc");
        let outline = perspective.find_part("outline").expect("outline");
        assert_eq!(perspective.zoom_in(doc), TreeEdit::Applied);
        assert!(perspective.is_zoomed());
        assert_eq!(perspective.tree().zoomed(), Some(editors));
        assert!(perspective.is_part_visible("doc"));
        assert!(!perspective.is_part_visible("outline"));
        assert!(!perspective.part_change_affects_zoom(doc));
        assert!(perspective.part_change_affects_zoom(outline));

        assert!(!perspective.bring_part_to_top(doc));
        assert!(perspective.is_zoomed());
        assert!(!perspective.bring_part_to_top(outline));
        assert!(!perspective.is_zoomed());
        assert!(perspective.is_part_visible("outline"));

        assert_eq!(perspective.zoom_in(editors), TreeEdit::Applied);
        perspective.open_part("log").expect("open").expect("pane");
        assert!(!perspective.is_zoomed(), "opening a part changes the layout");
        assert_eq!(
            perspective.zoom_out(),
            TreeEdit::Noop {
                reason: crate::tree::TreeNoopReason::NotZoomed
            }
        );
    }
}
