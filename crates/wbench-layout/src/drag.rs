//! Drag gesture lifecycle.
//!
//! ```text
//! Idle -> Tracking -> Idle (commit or cancel)
//! ```
//!
//! While tracking, pointer moves only re-resolve the drop candidate; the tree
//! is mutated once, on release, after the candidate is resolved again at the
//! release position.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use wbench_core::geometry::{Point, Rect};

use crate::config::LayoutConfig;
use crate::drop::{DropResolution, DropTargetKind, DropTargetRegistry, resolve_drop};
use crate::error::ConfigError;
use crate::part::{PartId, PartKind};
use crate::tree::LayoutTree;

/// Why an active drag ended without a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragCancelReason {
    EscapeKey,
    PointerCancel,
    FocusLost,
    Programmatic,
    /// Released where nothing accepts the drop.
    NoValidTarget,
    /// Released over a candidate the tree refused to apply.
    CommitRejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DragEventKind {
    PointerDown {
        source: PartId,
        pointer_id: u32,
        position: Point,
    },
    PointerMove {
        pointer_id: u32,
        position: Point,
    },
    PointerUp {
        pointer_id: u32,
        position: Point,
    },
    Cancel {
        reason: DragCancelReason,
    },
}

/// One input event with a caller-assigned, non-zero sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragEvent {
    pub sequence: u64,
    #[serde(flatten)]
    pub kind: DragEventKind,
}

impl DragEvent {
    #[must_use]
    pub const fn new(sequence: u64, kind: DragEventKind) -> Self {
        Self { sequence, kind }
    }

    pub fn validate(&self) -> Result<(), DragEventError> {
        if self.sequence == 0 {
            return Err(DragEventError::ZeroSequence);
        }
        let pointer_id = match self.kind {
            DragEventKind::PointerDown { pointer_id, .. }
            | DragEventKind::PointerMove { pointer_id, .. }
            | DragEventKind::PointerUp { pointer_id, .. } => Some(pointer_id),
            DragEventKind::Cancel { .. } => None,
        };
        if pointer_id == Some(0) {
            return Err(DragEventError::ZeroPointerId);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragEventError {
    ZeroSequence,
    ZeroPointerId,
}

impl fmt::Display for DragEventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroSequence => write!(f, "event sequence must be non-zero"),
            Self::ZeroPointerId => write!(f, "pointer id must be non-zero"),
        }
    }
}

impl std::error::Error for DragEventError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DragState {
    Idle,
    Tracking {
        source: PartId,
        pointer_id: u32,
        origin: Point,
        /// Registered bounds of the source when the drag began.
        origin_bounds: Option<Rect>,
        current: Point,
        candidate: Option<DropResolution>,
        started_sequence: u64,
    },
}

/// Events that were safely ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragNoopReason {
    IdleWithoutActiveDrag,
    ActiveDragAlreadyInProgress,
    PointerMismatch,
    BelowHysteresis,
    SourceNotDraggable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum DragEffect {
    Started {
        source: PartId,
        pointer_id: u32,
        origin: Point,
    },
    Retargeted {
        previous: Option<DropResolution>,
        candidate: Option<DropResolution>,
    },
    Committed {
        source: PartId,
        resolution: DropResolution,
        before_hash: u64,
        after_hash: u64,
    },
    Cancelled {
        source: Option<PartId>,
        reason: DragCancelReason,
    },
    Noop {
        reason: DragNoopReason,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragTransition {
    pub transition_id: u64,
    pub sequence: u64,
    pub from: DragState,
    pub to: DragState,
    pub effect: DragEffect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragError {
    InvalidConfig(ConfigError),
    InvalidEvent(DragEventError),
}

impl fmt::Display for DragError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(error) => write!(f, "invalid drag configuration: {error}"),
            Self::InvalidEvent(error) => write!(f, "invalid drag event: {error}"),
        }
    }
}

impl std::error::Error for DragError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidConfig(error) => Some(error),
            Self::InvalidEvent(error) => Some(error),
        }
    }
}

/// Runtime lifecycle machine for dragging panes and stacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragMachine {
    state: DragState,
    config: LayoutConfig,
    transition_counter: u64,
}

impl Default for DragMachine {
    fn default() -> Self {
        Self {
            state: DragState::Idle,
            config: LayoutConfig::default(),
            transition_counter: 0,
        }
    }
}

impl DragMachine {
    pub fn new(config: LayoutConfig) -> Result<Self, DragError> {
        config.validate().map_err(DragError::InvalidConfig)?;
        Ok(Self {
            state: DragState::Idle,
            config,
            transition_counter: 0,
        })
    }

    #[must_use]
    pub const fn state(&self) -> DragState {
        self.state
    }

    #[must_use]
    pub const fn config(&self) -> &LayoutConfig {
        &self.config
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self.state, DragState::Idle)
    }

    /// Candidate from the latest resolved move, for drop feedback.
    #[must_use]
    pub const fn candidate(&self) -> Option<DropResolution> {
        match self.state {
            DragState::Tracking { candidate, .. } => candidate,
            DragState::Idle => None,
        }
    }

    /// Drop any active drag without touching the tree. `None` when idle.
    pub fn force_cancel(&mut self) -> Option<DragTransition> {
        let from = self.state;
        let DragState::Tracking { source, .. } = from else {
            return None;
        };
        self.state = DragState::Idle;
        Some(self.transition(
            0,
            from,
            DragEffect::Cancelled {
                source: Some(source),
                reason: DragCancelReason::Programmatic,
            },
        ))
    }

    /// Feed one event. Only a release over a valid candidate mutates `tree`.
    pub fn apply_event(
        &mut self,
        tree: &mut LayoutTree,
        registry: &DropTargetRegistry,
        event: &DragEvent,
    ) -> Result<DragTransition, DragError> {
        event.validate().map_err(DragError::InvalidEvent)?;

        let from = self.state;
        let effect = match (self.state, event.kind) {
            (
                DragState::Idle,
                DragEventKind::PointerDown {
                    source,
                    pointer_id,
                    position,
                },
            ) => {
                if is_draggable(tree, source) {
                    self.state = DragState::Tracking {
                        source,
                        pointer_id,
                        origin: position,
                        origin_bounds: origin_bounds(registry, source),
                        current: position,
                        candidate: None,
                        started_sequence: event.sequence,
                    };
                    DragEffect::Started {
                        source,
                        pointer_id,
                        origin: position,
                    }
                } else {
                    DragEffect::Noop {
                        reason: DragNoopReason::SourceNotDraggable,
                    }
                }
            }
            (DragState::Idle, _) => DragEffect::Noop {
                reason: DragNoopReason::IdleWithoutActiveDrag,
            },
            (DragState::Tracking { .. }, DragEventKind::PointerDown { .. }) => DragEffect::Noop {
                reason: DragNoopReason::ActiveDragAlreadyInProgress,
            },
            (
                DragState::Tracking {
                    source,
                    pointer_id,
                    origin,
                    origin_bounds,
                    current,
                    candidate,
                    started_sequence,
                },
                DragEventKind::PointerMove {
                    pointer_id: incoming,
                    position,
                },
            ) => {
                if incoming != pointer_id {
                    DragEffect::Noop {
                        reason: DragNoopReason::PointerMismatch,
                    }
                } else if !self.config.should_retarget(current, position) {
                    DragEffect::Noop {
                        reason: DragNoopReason::BelowHysteresis,
                    }
                } else {
                    let next = resolve_drop(tree, registry, source, position, &self.config);
                    self.state = DragState::Tracking {
                        source,
                        pointer_id,
                        origin,
                        origin_bounds,
                        current: position,
                        candidate: next,
                        started_sequence,
                    };
                    DragEffect::Retargeted {
                        previous: candidate,
                        candidate: next,
                    }
                }
            }
            (
                DragState::Tracking {
                    source, pointer_id, ..
                },
                DragEventKind::PointerUp {
                    pointer_id: incoming,
                    position,
                },
            ) => {
                if incoming == pointer_id {
                    self.state = DragState::Idle;
                    self.release(tree, registry, source, position)
                } else {
                    DragEffect::Noop {
                        reason: DragNoopReason::PointerMismatch,
                    }
                }
            }
            (DragState::Tracking { source, .. }, DragEventKind::Cancel { reason }) => {
                self.state = DragState::Idle;
                DragEffect::Cancelled {
                    source: Some(source),
                    reason,
                }
            }
        };

        let transition = self.transition(event.sequence, from, effect);
        debug!(
            transition_id = transition.transition_id,
            sequence = transition.sequence,
            effect = ?transition.effect,
            "drag transition"
        );
        Ok(transition)
    }

    fn release(
        &self,
        tree: &mut LayoutTree,
        registry: &DropTargetRegistry,
        source: PartId,
        position: Point,
    ) -> DragEffect {
        let cancelled = |reason| DragEffect::Cancelled {
            source: Some(source),
            reason,
        };
        let Some(resolution) = resolve_drop(tree, registry, source, position, &self.config)
            .filter(|resolution| resolution.valid)
        else {
            return cancelled(DragCancelReason::NoValidTarget);
        };
        match tree.apply_drop(source, &resolution, &self.config) {
            Ok(outcome) => DragEffect::Committed {
                source,
                resolution,
                before_hash: outcome.before_hash,
                after_hash: outcome.after_hash,
            },
            Err(error) => {
                warn!(source = source.get(), %error, "drop commit rejected");
                cancelled(DragCancelReason::CommitRejected)
            }
        }
    }

    fn transition(&mut self, sequence: u64, from: DragState, effect: DragEffect) -> DragTransition {
        self.transition_counter = self.transition_counter.saturating_add(1);
        DragTransition {
            transition_id: self.transition_counter,
            sequence,
            from,
            to: self.state,
            effect,
        }
    }
}

fn is_draggable(tree: &LayoutTree, source: PartId) -> bool {
    tree.part(source).is_some_and(|part| {
        part.is_pane() || matches!(part.kind, PartKind::Stack(_))
    }) && tree.root_container(source).is_some()
}

fn origin_bounds(registry: &DropTargetRegistry, source: PartId) -> Option<Rect> {
    registry
        .entries()
        .iter()
        .filter(|entry| entry.handle == source)
        .min_by_key(|entry| (entry.kind != DropTargetKind::Region, entry.bounds.area()))
        .map(|entry| entry.bounds)
}
