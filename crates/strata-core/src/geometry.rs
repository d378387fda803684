//! Integer geometry for terminal cells: [`Rect`].
//!
//! All operations are total. An empty rectangle (zero width or height) has
//! zero area, never intersects anything and contributes its corner to
//! [`Rect::union`] like any other rectangle.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in cell coordinates.
///
/// `x`/`y` may be negative (elements can hang off screen); `width` and
/// `height` are expected to be non-negative, see [`Rect::is_valid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    /// X position of top-left corner
    pub x: i32,
    /// Y position of top-left corner
    pub y: i32,
    /// Width in cells
    pub width: i32,
    /// Height in cells
    pub height: i32,
}

impl Rect {
    /// The zero rectangle at the origin.
    pub const EMPTY: Self = Self::new(0, 0, 0, 0);

    /// Create a new rectangle.
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create from two corners; the right/bottom edge is exclusive.
    #[must_use]
    pub fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self::new(
            left,
            top,
            right.saturating_sub(left).max(0),
            bottom.saturating_sub(top).max(0),
        )
    }

    /// Exclusive right edge, saturating at `i32::MAX`.
    #[must_use]
    pub const fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge, saturating at `i32::MAX`.
    #[must_use]
    pub const fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// Width and height are both non-negative.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.width >= 0 && self.height >= 0
    }

    /// True if the rectangle covers no cells.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Number of covered cells (0 for empty rectangles).
    #[must_use]
    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            i64::from(self.width) * i64::from(self.height)
        }
    }

    /// Check if a cell coordinate lies inside the rectangle.
    #[must_use]
    pub const fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Check if `other` lies entirely within this rectangle.
    ///
    /// This is coordinate containment, so an empty `other` positioned inside
    /// the edges is contained.
    #[must_use]
    pub const fn contains(&self, other: &Self) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Check if the two rectangles share at least one cell.
    #[must_use]
    pub const fn intersects(&self, other: &Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// The shared cells of both rectangles, or [`Rect::EMPTY`] if disjoint.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        if !self.intersects(other) {
            return Self::EMPTY;
        }
        Self::from_edges(
            self.x.max(other.x),
            self.y.max(other.y),
            self.right().min(other.right()),
            self.bottom().min(other.bottom()),
        )
    }

    /// Smallest rectangle containing both rectangles' coordinates.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self::from_edges(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    /// Area growth needed for this rectangle to also cover `other`.
    #[must_use]
    pub fn enlargement(&self, other: &Self) -> i64 {
        self.union(other).area() - self.area()
    }

    /// Subtract `other` from this rectangle.
    ///
    /// Yields up to four disjoint pieces (above, below, left and right of the
    /// intersection). A disjoint `other` yields `self` unchanged; a covering
    /// `other` yields nothing.
    #[must_use]
    pub fn subtract(&self, other: &Self) -> Vec<Self> {
        if self.is_empty() {
            return Vec::new();
        }
        if !self.intersects(other) {
            return vec![*self];
        }
        let cut = self.intersect(other);
        let mut pieces = Vec::with_capacity(4);

        let above = Self::from_edges(self.x, self.y, self.right(), cut.y);
        let below = Self::from_edges(self.x, cut.bottom(), self.right(), self.bottom());
        let left = Self::from_edges(self.x, cut.y, cut.x, cut.bottom());
        let right = Self::from_edges(cut.right(), cut.y, self.right(), cut.bottom());

        for piece in [above, below, left, right] {
            if !piece.is_empty() {
                pieces.push(piece);
            }
        }
        pieces
    }

    /// Move the rectangle by the given offset.
    #[must_use]
    pub const fn translate(&self, dx: i32, dy: i32) -> Self {
        Self::new(
            self.x.saturating_add(dx),
            self.y.saturating_add(dy),
            self.width,
            self.height,
        )
    }

    /// Iterate every covered cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        let (x0, x1) = (self.x, self.right());
        (self.y..self.bottom()).flat_map(move |y| (x0..x1).map(move |x| (x, y)))
    }
}
