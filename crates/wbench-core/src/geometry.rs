#![forbid(unsafe_code)]

//! Geometric primitives.

use serde::{Deserialize, Serialize};

/// A rectangle for layout bounds, drop regions, and hit testing.
///
/// Uses cell coordinates (0-indexed, origin at top-left).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge (inclusive).
    pub x: u16,
    /// Top edge (inclusive).
    pub y: u16,
    /// Width in cells.
    pub width: u16,
    /// Height in cells.
    pub height: u16,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from origin with given size.
    #[inline]
    pub const fn from_size(width: u16, height: u16) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Left edge (alias for x).
    #[inline]
    pub const fn left(&self) -> u16 {
        self.x
    }

    /// Top edge (alias for y).
    #[inline]
    pub const fn top(&self) -> u16 {
        self.y
    }

    /// Right edge (exclusive).
    #[inline]
    pub const fn right(&self) -> u16 {
        self.x.saturating_add(self.width)
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub const fn bottom(&self) -> u16 {
        self.y.saturating_add(self.height)
    }

    /// Area in cells.
    #[inline]
    pub const fn area(&self) -> u32 {
        self.width as u32 * self.height as u32
    }

    /// Check if the rectangle has zero area.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Check if a cell is inside the rectangle.
    #[inline]
    pub const fn contains(&self, x: u16, y: u16) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Check if a pointer position is inside the rectangle.
    ///
    /// Positions left of or above the origin are never contained.
    #[inline]
    pub fn contains_point(&self, point: Point) -> bool {
        let (Ok(x), Ok(y)) = (u16::try_from(point.x), u16::try_from(point.y)) else {
            return false;
        };
        self.contains(x, y)
    }

    /// Extent along one side's axis: width for left/right, height for top/bottom.
    #[inline]
    pub const fn dimension(&self, side: Side) -> u16 {
        if side.is_horizontal() {
            self.width
        } else {
            self.height
        }
    }

    /// Create a new rectangle inside the current one with the given margin.
    pub fn inner(&self, margin: Sides) -> Rect {
        let x = self.x.saturating_add(margin.left);
        let y = self.y.saturating_add(margin.top);
        let width = self
            .width
            .saturating_sub(margin.left)
            .saturating_sub(margin.right);
        let height = self
            .height
            .saturating_sub(margin.top)
            .saturating_sub(margin.bottom);

        Rect {
            x,
            y,
            width,
            height,
        }
    }
}

/// Sides for padding/margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sides {
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
    pub left: u16,
}

impl Sides {
    /// Create new sides with horizontal and vertical insets.
    pub const fn symmetric(vertical: u16, horizontal: u16) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }
}

/// Pointer position in window cell coordinates.
///
/// Signed so that positions dragged past the window edge stay representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared euclidean distance to another point.
    #[must_use]
    pub fn squared_distance(self, other: Point) -> i64 {
        let dx = i64::from(other.x) - i64::from(self.x);
        let dy = i64::from(other.y) - i64::from(self.y);
        dx * dx + dy * dy
    }
}

/// One edge of a rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

impl Side {
    /// All sides in tie-break order for [`closest_side`].
    pub const ALL: [Side; 4] = [Side::Left, Side::Right, Side::Top, Side::Bottom];

    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Top => Self::Bottom,
            Self::Bottom => Self::Top,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Left and right edges are crossed by moving horizontally.
    #[must_use]
    pub const fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }

    /// Whether content docked on this side comes first in reading order.
    #[must_use]
    pub const fn is_leading(self) -> bool {
        matches!(self, Self::Left | Self::Top)
    }
}

/// Distance from a point to one edge of a rectangle, measured along that
/// edge's axis. Points outside the rectangle yield negative distances for the
/// edges they crossed.
#[must_use]
pub fn distance_from_edge(rect: Rect, point: Point, side: Side) -> i32 {
    match side {
        Side::Left => point.x - i32::from(rect.left()),
        Side::Right => i32::from(rect.right()) - point.x,
        Side::Top => point.y - i32::from(rect.top()),
        Side::Bottom => i32::from(rect.bottom()) - point.y,
    }
}

/// Side of `rect` nearest to `point`.
///
/// Ties resolve in [`Side::ALL`] order.
#[must_use]
pub fn closest_side(rect: Rect, point: Point) -> Side {
    let mut best = Side::Left;
    let mut best_distance = i32::MAX;
    for side in Side::ALL {
        let distance = distance_from_edge(rect, point, side);
        if distance < best_distance {
            best = side;
            best_distance = distance;
        }
    }
    best
}

/// Strip of `size` cells along one edge of `rect`, clamped to the rectangle.
#[must_use]
pub fn extruded_edge(rect: Rect, size: u16, side: Side) -> Rect {
    let size = size.min(rect.dimension(side));
    match side {
        Side::Left => Rect::new(rect.x, rect.y, size, rect.height),
        Side::Right => Rect::new(
            rect.right().saturating_sub(size),
            rect.y,
            size,
            rect.height,
        ),
        Side::Top => Rect::new(rect.x, rect.y, rect.width, size),
        Side::Bottom => Rect::new(
            rect.x,
            rect.bottom().saturating_sub(size),
            rect.width,
            size,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rect_contains_edges() {
        let rect = Rect::new(2, 3, 4, 5);
        assert!(rect.contains(2, 3));
        assert!(rect.contains(5, 7));
        assert!(!rect.contains(6, 3));
        assert!(!rect.contains(2, 8));
    }

    #[test]
    fn contains_point_rejects_negative_positions() {
        let rect = Rect::from_size(10, 10);
        assert!(rect.contains_point(Point::new(0, 0)));
        assert!(!rect.contains_point(Point::new(-1, 4)));
        assert!(!rect.contains_point(Point::new(4, -1)));
        assert!(!rect.contains_point(Point::new(i32::MAX, 4)));
    }

    #[test]
    fn rect_inner_reduces() {
        let rect = Rect::new(0, 0, 10, 10);
        assert_eq!(rect.inner(Sides::symmetric(2, 3)), Rect::new(3, 2, 4, 6));
        assert_eq!(rect.inner(Sides::symmetric(0, 7)), Rect::new(7, 0, 0, 10));
    }

    #[test]
    fn closest_side_quadrants() {
        let rect = Rect::from_size(100, 100);
        assert_eq!(closest_side(rect, Point::new(50, 10)), Side::Top);
        assert_eq!(closest_side(rect, Point::new(50, 90)), Side::Bottom);
        assert_eq!(closest_side(rect, Point::new(3, 50)), Side::Left);
        assert_eq!(closest_side(rect, Point::new(95, 50)), Side::Right);
    }

    #[test]
    fn closest_side_ties_prefer_left_then_right_then_top() {
        let rect = Rect::from_size(100, 100);
        assert_eq!(closest_side(rect, Point::new(50, 50)), Side::Left);
        assert_eq!(closest_side(rect, Point::new(90, 10)), Side::Right);
    }

    #[test]
    fn extruded_edges_hug_each_side() {
        let rect = Rect::new(10, 20, 40, 30);
        assert_eq!(extruded_edge(rect, 10, Side::Left), Rect::new(10, 20, 10, 30));
        assert_eq!(extruded_edge(rect, 10, Side::Right), Rect::new(40, 20, 10, 30));
        assert_eq!(extruded_edge(rect, 5, Side::Top), Rect::new(10, 20, 40, 5));
        assert_eq!(extruded_edge(rect, 5, Side::Bottom), Rect::new(10, 45, 40, 5));
        assert_eq!(extruded_edge(rect, 500, Side::Top), rect);
    }

    #[test]
    fn side_helpers() {
        for side in Side::ALL {
            assert_eq!(side.opposite().opposite(), side);
            assert_eq!(side.opposite().is_horizontal(), side.is_horizontal());
            assert_ne!(side.opposite().is_leading(), side.is_leading());
        }
        assert_eq!(Rect::from_size(7, 3).dimension(Side::Left), 7);
        assert_eq!(Rect::from_size(7, 3).dimension(Side::Bottom), 3);
    }

    proptest! {
        #[test]
        fn closest_side_is_minimal_for_inside_points(
            width in 1u16..200,
            height in 1u16..200,
            fx in 0.0f64..1.0,
            fy in 0.0f64..1.0,
        ) {
            let rect = Rect::from_size(width, height);
            let point = Point::new(
                (f64::from(width) * fx) as i32,
                (f64::from(height) * fy) as i32,
            );
            prop_assume!(rect.contains_point(point));
            let side = closest_side(rect, point);
            let best = distance_from_edge(rect, point, side);
            for other in Side::ALL {
                prop_assert!(best <= distance_from_edge(rect, point, other));
            }
        }
    }
}
