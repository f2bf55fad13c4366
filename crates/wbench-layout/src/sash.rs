//! Binary split layout kept by every sash container.
//!
//! Each sash owns one [`SashNode`] tree whose leaves are exactly its children.
//! Docking a child next to a sibling splits that sibling's leaf; removing a
//! child promotes its sibling into the parent split.

use serde::{Deserialize, Serialize};
use wbench_core::geometry::{Rect, Side};

use crate::error::LayoutError;
use crate::part::PartId;

/// Orientation of a split node.
///
/// `Horizontal` lays children out side by side and divides the width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitAxis {
    Horizontal,
    Vertical,
}

impl SplitAxis {
    /// Axis a side-dock splits along.
    #[must_use]
    pub const fn for_side(side: Side) -> Self {
        if side.is_horizontal() {
            Self::Horizontal
        } else {
            Self::Vertical
        }
    }
}

/// Ratio between split children, stored in reduced form.
///
/// Interpreted as weight pair `first:second` (not a direct fraction).
/// Example: `1:3` assigns `1 / (1 + 3)` of available space to the first child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SplitRatio {
    numerator: u32,
    denominator: u32,
}

impl SplitRatio {
    /// Even split.
    pub const EVEN: Self = Self {
        numerator: 1,
        denominator: 1,
    };

    /// First child takes a quarter.
    pub const ONE_TO_THREE: Self = Self {
        numerator: 1,
        denominator: 3,
    };

    /// Create and normalize a ratio.
    pub fn new(numerator: u32, denominator: u32) -> Result<Self, LayoutError> {
        if numerator == 0 || denominator == 0 {
            return Err(LayoutError::InvalidSplitRatio {
                incoming: numerator,
                existing: denominator,
            });
        }
        let gcd = gcd_u32(numerator, denominator);
        Ok(Self {
            numerator: numerator / gcd,
            denominator: denominator / gcd,
        })
    }

    /// Numerator (always > 0).
    #[must_use]
    pub const fn numerator(self) -> u32 {
        self.numerator
    }

    /// Denominator (always > 0).
    #[must_use]
    pub const fn denominator(self) -> u32 {
        self.denominator
    }

    /// Same split with the two sides exchanged.
    #[must_use]
    pub const fn swapped(self) -> Self {
        Self {
            numerator: self.denominator,
            denominator: self.numerator,
        }
    }

    /// Share of `available` cells that goes to the first child.
    #[must_use]
    pub fn first_share(self, available: u16) -> u16 {
        let total = (u64::from(self.numerator) + u64::from(self.denominator)).max(1);
        let first = u64::from(available) * u64::from(self.numerator) / total;
        first as u16
    }
}

impl Default for SplitRatio {
    fn default() -> Self {
        Self::EVEN
    }
}

/// Node of a sash's split layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum SashNode {
    Leaf {
        part: PartId,
    },
    Split {
        axis: SplitAxis,
        ratio: SplitRatio,
        first: Box<SashNode>,
        second: Box<SashNode>,
    },
}

impl SashNode {
    #[must_use]
    pub const fn leaf(part: PartId) -> Self {
        Self::Leaf { part }
    }

    /// Whether `part` is one of the leaves.
    #[must_use]
    pub fn contains(&self, part: PartId) -> bool {
        match self {
            Self::Leaf { part: leaf } => *leaf == part,
            Self::Split { first, second, .. } => first.contains(part) || second.contains(part),
        }
    }

    /// Leaves in reading order.
    #[must_use]
    pub fn leaves(&self) -> Vec<PartId> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves(&self, out: &mut Vec<PartId>) {
        match self {
            Self::Leaf { part } => out.push(*part),
            Self::Split { first, second, .. } => {
                first.collect_leaves(out);
                second.collect_leaves(out);
            }
        }
    }

    /// Leaf reached by always following the second child.
    #[must_use]
    pub fn bottom_right(&self) -> PartId {
        match self {
            Self::Leaf { part } => *part,
            Self::Split { second, .. } => second.bottom_right(),
        }
    }

    /// Dock `incoming` on `side` of `relative`, or around the whole layout
    /// when `relative` is `None` or not a leaf.
    ///
    /// `ratio` is the `incoming:existing` weight pair.
    #[must_use]
    pub fn docked(
        layout: Option<Self>,
        incoming: PartId,
        side: Side,
        ratio: SplitRatio,
        relative: Option<PartId>,
    ) -> Self {
        let Some(mut layout) = layout else {
            return Self::leaf(incoming);
        };
        if let Some(relative) = relative
            && layout.split_leaf(relative, incoming, side, ratio)
        {
            return layout;
        }
        split_around(layout, incoming, side, ratio)
    }

    fn split_leaf(
        &mut self,
        relative: PartId,
        incoming: PartId,
        side: Side,
        ratio: SplitRatio,
    ) -> bool {
        match self {
            Self::Leaf { part } if *part == relative => {
                let existing = Self::leaf(relative);
                *self = split_around(existing, incoming, side, ratio);
                true
            }
            Self::Leaf { .. } => false,
            Self::Split { first, second, .. } => {
                first.split_leaf(relative, incoming, side, ratio)
                    || second.split_leaf(relative, incoming, side, ratio)
            }
        }
    }

    /// Remove a leaf, promoting its sibling. Returns `None` when the layout
    /// becomes empty.
    #[must_use]
    pub fn without(self, part: PartId) -> Option<Self> {
        match self {
            Self::Leaf { part: leaf } if leaf == part => None,
            leaf @ Self::Leaf { .. } => Some(leaf),
            Self::Split {
                axis,
                ratio,
                first,
                second,
            } => match ((*first).without(part), (*second).without(part)) {
                (Some(first), Some(second)) => Some(Self::Split {
                    axis,
                    ratio,
                    first: Box::new(first),
                    second: Box::new(second),
                }),
                (Some(only), None) | (None, Some(only)) => Some(only),
                (None, None) => None,
            },
        }
    }

    /// Swap the leaf `old` for `new` in place. Returns whether it was found.
    pub fn replace_leaf(&mut self, old: PartId, new: PartId) -> bool {
        match self {
            Self::Leaf { part } if *part == old => {
                *part = new;
                true
            }
            Self::Leaf { .. } => false,
            Self::Split { first, second, .. } => {
                first.replace_leaf(old, new) || second.replace_leaf(old, new)
            }
        }
    }

    /// Whether any leaf passes `visible`.
    pub fn any_visible(&self, visible: &impl Fn(PartId) -> bool) -> bool {
        match self {
            Self::Leaf { part } => visible(*part),
            Self::Split { first, second, .. } => {
                first.any_visible(visible) || second.any_visible(visible)
            }
        }
    }

    /// Divide `area` among visible leaves.
    ///
    /// A split whose one side has no visible leaf gives the whole area to the
    /// other side. Leaves of fully hidden subtrees get no rectangle.
    pub fn solve(
        &self,
        area: Rect,
        visible: &impl Fn(PartId) -> bool,
        out: &mut Vec<(PartId, Rect)>,
    ) {
        match self {
            Self::Leaf { part } => {
                if visible(*part) {
                    out.push((*part, area));
                }
            }
            Self::Split {
                axis,
                ratio,
                first,
                second,
            } => match (first.any_visible(visible), second.any_visible(visible)) {
                (true, true) => {
                    let (first_rect, second_rect) = split_rect(area, *axis, *ratio);
                    first.solve(first_rect, visible, out);
                    second.solve(second_rect, visible, out);
                }
                (true, false) => first.solve(area, visible, out),
                (false, true) => second.solve(area, visible, out),
                (false, false) => {}
            },
        }
    }
}

fn split_around(existing: SashNode, incoming: PartId, side: Side, ratio: SplitRatio) -> SashNode {
    let axis = SplitAxis::for_side(side);
    let incoming = Box::new(SashNode::leaf(incoming));
    let existing = Box::new(existing);
    if side.is_leading() {
        SashNode::Split {
            axis,
            ratio,
            first: incoming,
            second: existing,
        }
    } else {
        SashNode::Split {
            axis,
            ratio: ratio.swapped(),
            first: existing,
            second: incoming,
        }
    }
}

/// Split `area` along `axis` by `ratio`.
#[must_use]
pub fn split_rect(area: Rect, axis: SplitAxis, ratio: SplitRatio) -> (Rect, Rect) {
    match axis {
        SplitAxis::Horizontal => {
            let first = ratio.first_share(area.width);
            (
                Rect::new(area.x, area.y, first, area.height),
                Rect::new(
                    area.x.saturating_add(first),
                    area.y,
                    area.width.saturating_sub(first),
                    area.height,
                ),
            )
        }
        SplitAxis::Vertical => {
            let first = ratio.first_share(area.height);
            (
                Rect::new(area.x, area.y, area.width, first),
                Rect::new(
                    area.x,
                    area.y.saturating_add(first),
                    area.width,
                    area.height.saturating_sub(first),
                ),
            )
        }
    }
}

fn gcd_u32(mut left: u32, mut right: u32) -> u32 {
    while right != 0 {
        let rem = left % right;
        left = right;
        right = rem;
    }
    left.max(1)
}
