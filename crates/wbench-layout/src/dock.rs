//! Committing a resolved drop to the tree.
//!
//! The commit runs on a cloned working tree and only replaces the live tree
//! after every step succeeded and the result validates, so a rejected drop
//! leaves the layout untouched.

use std::fmt;

use tracing::{debug, debug_span, info};

use crate::config::LayoutConfig;
use crate::drop::{DropResolution, RelativePosition, docking_ratio_for, split_host};
use crate::error::LayoutError;
use crate::part::{LayoutPart, PartId, PartKind};
use crate::tree::{LayoutTree, TreeEdit, TreeNoopReason};

/// Successful drop commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockOutcome {
    pub source: PartId,
    /// Part the panes were placed against, after any placeholder restore.
    pub target: PartId,
    pub position: RelativePosition,
    /// Panes that changed place, in order.
    pub moved: Vec<PartId>,
    /// Stack created to host a split drop.
    pub created_stack: Option<PartId>,
    /// Containers removed because the drop left them empty.
    pub removed: Vec<PartId>,
    pub before_hash: u64,
    pub after_hash: u64,
}

/// Rejected drop commit. The tree is unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DockError {
    PointlessDrop {
        target: PartId,
    },
    UnknownPart {
        part: PartId,
    },
    NotDraggable {
        part: PartId,
    },
    InvalidTarget {
        target: PartId,
        position: RelativePosition,
    },
    Rejected {
        part: PartId,
        reason: TreeNoopReason,
    },
    Layout(LayoutError),
    Invariant(LayoutError),
}

impl fmt::Display for DockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PointlessDrop { target } => {
                write!(f, "drop onto {} would not change the layout", target.get())
            }
            Self::UnknownPart { part } => write!(f, "part {} not found", part.get()),
            Self::NotDraggable { part } => {
                write!(f, "part {} holds no panes to move", part.get())
            }
            Self::InvalidTarget { target, position } => write!(
                f,
                "part {} cannot take a {position:?} drop",
                target.get()
            ),
            Self::Rejected { part, reason } => {
                write!(f, "moving part {} was refused: {reason:?}", part.get())
            }
            Self::Layout(error) => write!(f, "layout error during drop: {error}"),
            Self::Invariant(error) => write!(f, "drop would break the layout: {error}"),
        }
    }
}

impl std::error::Error for DockError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Layout(error) | Self::Invariant(error) => Some(error),
            _ => None,
        }
    }
}

impl From<LayoutError> for DockError {
    fn from(error: LayoutError) -> Self {
        Self::Layout(error)
    }
}

fn expect_applied(edit: TreeEdit, part: PartId) -> Result<(), DockError> {
    match edit {
        TreeEdit::Applied => Ok(()),
        TreeEdit::Noop { reason } => Err(DockError::Rejected { part, reason }),
    }
}

impl LayoutTree {
    /// Move `source` (a pane, or every live pane of a stack) as `drop` says.
    pub fn apply_drop(
        &mut self,
        source: PartId,
        drop: &DropResolution,
        config: &LayoutConfig,
    ) -> Result<DockOutcome, DockError> {
        let span = debug_span!(
            "apply_drop",
            source = source.get(),
            target = drop.target.get(),
            position = ?drop.position
        );
        let _guard = span.enter();

        if !drop.valid {
            return Err(DockError::PointlessDrop {
                target: drop.target,
            });
        }
        let before_hash = self.state_hash();
        let mut working = self.clone();
        working.unzoom_for_edit("apply_drop");
        let mut outcome = DockOutcome {
            source,
            target: drop.target,
            position: drop.position,
            moved: Vec::new(),
            created_stack: None,
            removed: Vec::new(),
            before_hash,
            after_hash: before_hash,
        };
        working.apply_drop_inner(source, drop, config, &mut outcome)?;
        working.validate().map_err(DockError::Invariant)?;
        outcome.after_hash = working.state_hash();
        *self = working;
        info!(
            source = source.get(),
            target = outcome.target.get(),
            position = ?outcome.position,
            moved = outcome.moved.len(),
            "drop committed"
        );
        Ok(outcome)
    }

    fn apply_drop_inner(
        &mut self,
        source: PartId,
        drop: &DropResolution,
        config: &LayoutConfig,
        outcome: &mut DockOutcome,
    ) -> Result<(), DockError> {
        let (panes, focus) = self.dragged_panes(source)?;
        let mut origins: Vec<PartId> = Vec::new();
        for pane in &panes {
            if let Some(origin) = self.storage_of(*pane)
                && !origins.contains(&origin)
            {
                origins.push(origin);
            }
        }

        let mut target = drop.target;
        if self.part(target).and_then(LayoutPart::bound_real).is_some() {
            let placeholder = target;
            target = self
                .restore_real_container(placeholder)?
                .ok_or(DockError::InvalidTarget {
                    target,
                    position: drop.position,
                })?;
            let _ = self.discard(placeholder);
        }
        outcome.target = target;
        let invalid = DockError::InvalidTarget {
            target,
            position: drop.position,
        };

        match drop.position {
            RelativePosition::Stack => {
                if !matches!(self.part(target).map(|p| &p.kind), Some(PartKind::Stack(_))) {
                    return Err(invalid);
                }
                for pane in &panes {
                    expect_applied(self.add(target, *pane)?, *pane)?;
                    outcome.moved.push(*pane);
                }
            }
            RelativePosition::Before | RelativePosition::After => {
                let is_pane = self.part(target).is_some_and(LayoutPart::is_pane);
                let Some(stack) = self.storage_of(target).filter(|_| is_pane) else {
                    return Err(invalid);
                };
                let after = drop.position == RelativePosition::After;
                for (offset, pane) in panes.iter().filter(|p| **p != target).enumerate() {
                    let anchor = self
                        .stored(stack)
                        .iter()
                        .position(|c| *c == target)
                        .ok_or(DockError::UnknownPart { part: target })?;
                    let index = if after { anchor + 1 + offset } else { anchor };
                    expect_applied(self.insert_at(stack, *pane, index)?, *pane)?;
                    outcome.moved.push(*pane);
                }
            }
            RelativePosition::SplitTop
            | RelativePosition::SplitBottom
            | RelativePosition::SplitLeft
            | RelativePosition::SplitRight => {
                let Some(side) = drop.position.side() else {
                    return Err(invalid);
                };
                let Some((sash, relative)) = split_host(self, target) else {
                    return Err(invalid);
                };
                let ratio = docking_ratio_for(self, target, config);
                let key = format!("stack.{}", self.next_id.get());
                let stack = self.create_stack(key)?;
                for pane in &panes {
                    expect_applied(self.add(stack, *pane)?, *pane)?;
                    outcome.moved.push(*pane);
                }
                expect_applied(self.add_relative(sash, stack, side, ratio, relative)?, stack)?;
                outcome.created_stack = Some(stack);
            }
        }

        let _ = self.select(focus);
        for origin in origins {
            self.deref_empty(origin, &mut outcome.removed);
        }
        Ok(())
    }

    /// Live panes a drag of `source` carries, plus the one to leave on top.
    fn dragged_panes(&self, source: PartId) -> Result<(Vec<PartId>, PartId), DockError> {
        let record = self
            .part(source)
            .ok_or(DockError::UnknownPart { part: source })?;
        match &record.kind {
            PartKind::Pane(_) => Ok((vec![source], source)),
            PartKind::Stack(stack) => {
                let panes: Vec<PartId> = stack
                    .children
                    .iter()
                    .copied()
                    .filter(|child| self.part(*child).is_some_and(LayoutPart::is_pane))
                    .collect();
                let focus = stack
                    .selected
                    .filter(|selected| panes.contains(selected))
                    .or_else(|| panes.first().copied())
                    .ok_or(DockError::NotDraggable { part: source })?;
                Ok((panes, focus))
            }
            _ => Err(DockError::NotDraggable { part: source }),
        }
    }

    /// Remove `container` from its parent if the drop left it empty, and
    /// repeat for a parent sash that becomes empty in turn.
    fn deref_empty(&mut self, container: PartId, removed: &mut Vec<PartId>) {
        let mut current = container;
        while current != self.root
            && self.stored(current).is_empty()
            && self
                .part(current)
                .is_some_and(|p| matches!(p.kind, PartKind::Stack(_) | PartKind::Sash(_)))
        {
            let Some(parent) = self.container(current) else {
                break;
            };
            if !self.remove(parent, current).is_applied() {
                break;
            }
            let _ = self.discard(current);
            debug!(container = current.get(), "removed emptied container");
            removed.push(current);
            current = self
                .part(parent)
                .and_then(LayoutPart::bound_real)
                .unwrap_or(parent);
        }
    }
}
