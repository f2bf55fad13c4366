//! Container placeholder binding.
//!
//! A container placeholder holds the slot of a stack or sash whose panes are
//! all closed. While bound it stands in for that real container: it reports
//! the real container's children and every one of those children names the
//! placeholder as its container. Unbinding hands the children back.

use tracing::{debug, warn};

use crate::error::LayoutError;
use crate::part::{ContainerSlot, PartId, PartKind};
use crate::tree::{LayoutTree, Placement, TreeEdit, TreeNoopReason};

impl LayoutTree {
    /// Bind `placeholder` to `real`, or unbind it with `None`.
    ///
    /// Binding moves any virtual children into `real` (in order), then points
    /// every child of `real` at the placeholder. `real` must be a detached
    /// stack or sash. Unbinding points the children back at `real` and leaves
    /// the placeholder unbound and empty. Binding an already bound placeholder
    /// to a different container unbinds the old one first.
    pub fn set_real_container(
        &mut self,
        placeholder: PartId,
        real: Option<PartId>,
    ) -> Result<TreeEdit, LayoutError> {
        let op = "set_real_container";
        let Some(record) = self.parts.get(&placeholder) else {
            return Ok(TreeEdit::noop(TreeNoopReason::UnknownPart, op));
        };
        let PartKind::ContainerPlaceholder(slot) = &record.kind else {
            return Ok(TreeEdit::noop(TreeNoopReason::NotAContainerPlaceholder, op));
        };
        let current = match slot {
            ContainerSlot::Bound { real } => Some(*real),
            ContainerSlot::Unbound { .. } => None,
        };

        let Some(real) = real else {
            return Ok(match current {
                Some(current) => {
                    self.unzoom_for_edit(op);
                    self.unbind(placeholder, current);
                    TreeEdit::Applied
                }
                None => TreeEdit::noop(TreeNoopReason::NotBound, op),
            });
        };

        if current == Some(real) {
            return Ok(TreeEdit::noop(TreeNoopReason::AlreadyMember, op));
        }
        if real == placeholder {
            return Ok(TreeEdit::noop(TreeNoopReason::SelfReference, op));
        }
        let Some(real_record) = self.parts.get(&real) else {
            return Ok(TreeEdit::noop(TreeNoopReason::UnknownPart, op));
        };
        if !matches!(real_record.kind, PartKind::Stack(_) | PartKind::Sash(_)) {
            return Ok(TreeEdit::noop(TreeNoopReason::NotAContainer, op));
        }
        if real_record.container.is_some() || real == self.root {
            return Ok(TreeEdit::noop(TreeNoopReason::RealContainerAttached, op));
        }
        if real_record.proxied_by.is_some() {
            return Ok(TreeEdit::noop(TreeNoopReason::AlreadyProxied, op));
        }
        if self.is_ancestor(real, placeholder) {
            return Ok(TreeEdit::noop(TreeNoopReason::WouldCreateCycle, op));
        }
        if let ContainerSlot::Unbound { children } = slot
            && let Some(refused) = children.iter().find(|child| !self.accepts(real, **child))
        {
            debug!(
                placeholder = placeholder.get(),
                real = real.get(),
                child = refused.get(),
                "real container refuses a virtual child"
            );
            return Ok(TreeEdit::noop(TreeNoopReason::RejectedKind, op));
        }
        let incoming = real_record.kind.stored_children().to_vec();
        self.check_keys(placeholder, &incoming, &[])?;

        self.unzoom_for_edit(op);
        if let Some(current) = current {
            self.unbind(placeholder, current);
        }
        self.bind(placeholder, real);
        debug!(
            placeholder = placeholder.get(),
            real = real.get(),
            "bound container placeholder"
        );
        Ok(TreeEdit::Applied)
    }

    fn bind(&mut self, placeholder: PartId, real: PartId) {
        let virtual_children = match self.parts.get_mut(&placeholder).map(|r| &mut r.kind) {
            Some(PartKind::ContainerPlaceholder(slot)) => {
                let previous = std::mem::replace(slot, ContainerSlot::Bound { real });
                match previous {
                    ContainerSlot::Unbound { children } => children,
                    ContainerSlot::Bound { .. } => Vec::new(),
                }
            }
            _ => return,
        };
        if let Some(record) = self.parts.get_mut(&real) {
            record.proxied_by = Some(placeholder);
        }
        for child in virtual_children {
            self.link(real, child, Placement::Append);
        }
        self.repoint_children(real, placeholder);
    }

    fn unbind(&mut self, placeholder: PartId, real: PartId) {
        self.repoint_children(real, real);
        if let Some(record) = self.parts.get_mut(&real)
            && record.proxied_by == Some(placeholder)
        {
            record.proxied_by = None;
        }
        if let Some(record) = self.parts.get_mut(&placeholder) {
            record.kind = PartKind::ContainerPlaceholder(ContainerSlot::default());
        }
        debug!(
            placeholder = placeholder.get(),
            real = real.get(),
            "unbound container placeholder"
        );
    }

    fn repoint_children(&mut self, storage: PartId, parent: PartId) {
        let children = self.stored(storage).to_vec();
        for child in children {
            if let Some(record) = self.parts.get_mut(&child) {
                record.container = Some(parent);
            }
        }
    }

    /// Put a bound placeholder's real container back in the placeholder's
    /// slot and unbind it. Returns the real container.
    pub fn restore_real_container(
        &mut self,
        placeholder: PartId,
    ) -> Result<Option<PartId>, LayoutError> {
        let Some(record) = self.parts.get(&placeholder) else {
            return Ok(None);
        };
        let Some(real) = record.bound_real() else {
            debug!(placeholder = placeholder.get(), "placeholder is not bound");
            return Ok(None);
        };
        let parent = record.container;
        self.unbind(placeholder, real);
        if let Some(parent) = parent {
            let edit = match self.replace(parent, placeholder, real) {
                Ok(edit) => edit,
                Err(error) => {
                    self.bind(placeholder, real);
                    return Err(error);
                }
            };
            if !edit.is_applied() {
                warn!(
                    placeholder = placeholder.get(),
                    real = real.get(),
                    ?edit,
                    "could not swap real container into placeholder slot"
                );
                self.bind(placeholder, real);
                return Ok(None);
            }
        }
        Ok(Some(real))
    }
}
