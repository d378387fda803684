//! Double-buffered frame with dirty tracking.
//!
//! The front buffer mirrors what the terminal currently shows; all writes
//! go to the back buffer and set a bit in the dirty set (1 bit per cell).
//! [`FrameBuffer::swap_buffers`] reports only the dirty cells whose content
//! actually changed.

use crate::cell::{Cell, Style};
use bitvec::prelude::*;
use strata_core::Rect;
use unicode_width::UnicodeWidthChar;

/// One changed cell, produced by [`FrameBuffer::swap_buffers`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirtyRegion {
    /// Column
    pub x: u16,
    /// Row
    pub y: u16,
    /// What the terminal showed before
    pub old: Cell,
    /// What it must show now
    pub new: Cell,
}

/// Front/back cell grids plus the dirty set.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    front: Vec<Cell>,
    back: Vec<Cell>,
    width: u16,
    height: u16,
    dirty: BitVec,
}

impl FrameBuffer {
    /// Create a buffer for a screen whose content is unknown: the first
    /// swap reports every cell.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        let size = usize::from(width) * usize::from(height);
        Self {
            front: vec![Cell::sentinel(); size],
            back: vec![Cell::default(); size],
            width,
            height,
            dirty: bitvec![1; size],
        }
    }

    /// Get the buffer width.
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    /// Get the buffer height.
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// The whole screen as a rectangle.
    #[must_use]
    pub fn area(&self) -> Rect {
        Rect::new(0, 0, i32::from(self.width), i32::from(self.height))
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let x = u16::try_from(x).ok().filter(|&x| x < self.width)?;
        let y = u16::try_from(y).ok().filter(|&y| y < self.height)?;
        Some(usize::from(y) * usize::from(self.width) + usize::from(x))
    }

    fn coords(&self, idx: usize) -> (u16, u16) {
        let width = usize::from(self.width);
        ((idx % width) as u16, (idx / width) as u16)
    }

    /// Back buffer cell (work in progress).
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> Option<&Cell> {
        self.index(x, y).map(|idx| &self.back[idx])
    }

    /// Front buffer cell (what the terminal shows).
    #[must_use]
    pub fn front(&self, x: i32, y: i32) -> Option<&Cell> {
        self.index(x, y).map(|idx| &self.front[idx])
    }

    /// Write one cell to the back buffer. Returns `false` if `(x, y)` is
    /// off screen.
    ///
    /// A wide glyph also claims the next column; one that does not fit is
    /// replaced by a blank. Overwriting either half of an existing wide
    /// glyph blanks the other half.
    pub fn set_cell(&mut self, x: i32, y: i32, cell: Cell) -> bool {
        let Some(idx) = self.index(x, y) else {
            return false;
        };
        self.break_wide_glyph(x, y, idx);

        if cell.width() == 2 {
            match self.index(x + 1, y) {
                Some(next) => {
                    self.break_wide_glyph(x + 1, y, next);
                    self.put(next, Cell::continuation(cell.style));
                }
                _ => {
                    self.put(idx, Cell::blank(cell.style));
                    return true;
                }
            }
        }
        self.put(idx, cell);
        true
    }

    fn put(&mut self, idx: usize, cell: Cell) {
        self.back[idx] = cell;
        self.dirty.set(idx, true);
    }

    /// Blank the partner of a wide glyph half about to be overwritten.
    fn break_wide_glyph(&mut self, x: i32, y: i32, idx: usize) {
        let (is_tail, is_head) = (self.back[idx].is_continuation(), self.back[idx].width() == 2);
        if is_tail {
            if let Some(head) = self.index(x - 1, y) {
                let style = self.back[head].style;
                self.put(head, Cell::blank(style));
            }
        } else if is_head {
            if let Some(tail) = self.index(x + 1, y) {
                let style = self.back[tail].style;
                self.put(tail, Cell::blank(style));
            }
        }
    }

    /// Write a string on one row, clipped to the screen. Returns the number
    /// of columns the text spans.
    pub fn write_text(&mut self, x: i32, y: i32, text: &str, style: Style) -> i32 {
        let mut cx = x;
        for ch in text.chars() {
            let width = UnicodeWidthChar::width(ch).unwrap_or(0) as i32;
            if width == 0 {
                continue;
            }
            if cx >= i32::from(self.width) {
                break;
            }
            self.set_cell(cx, y, Cell::from_char(ch, style));
            cx += width;
        }
        cx - x
    }

    /// Fill a rectangle with copies of `cell`, clipped to the screen.
    /// Returns the number of cells written.
    pub fn fill_rect(&mut self, rect: Rect, cell: &Cell) -> usize {
        let clipped = rect.intersect(&self.area());
        let mut written = 0;
        for (x, y) in clipped.cells() {
            if self.set_cell(x, y, cell.clone()) {
                written += 1;
            }
        }
        written
    }

    /// Reset a rectangle to default cells.
    pub fn clear_rect(&mut self, rect: Rect) -> usize {
        self.fill_rect(rect, &Cell::default())
    }

    /// Mark a cell dirty without writing it.
    pub fn mark_dirty(&mut self, x: i32, y: i32) {
        if let Some(idx) = self.index(x, y) {
            self.dirty.set(idx, true);
        }
    }

    /// Mark every cell dirty (for full redraw).
    pub fn mark_all_dirty(&mut self) {
        self.dirty.fill(true);
    }

    /// True if any cell was written since the last swap.
    #[must_use]
    pub fn has_dirty(&self) -> bool {
        self.dirty.any()
    }

    /// Count dirty cells.
    #[must_use]
    pub fn dirty_count(&self) -> usize {
        self.dirty.count_ones()
    }

    /// Publish the back buffer.
    ///
    /// Returns the dirty cells whose content differs from the front buffer,
    /// swaps the buffers, copies the new front into the back buffer and
    /// clears the dirty set. A second call with no writes in between
    /// returns nothing.
    pub fn swap_buffers(&mut self) -> Vec<DirtyRegion> {
        let mut regions = Vec::new();
        for idx in self.dirty.iter_ones() {
            if self.back[idx] != self.front[idx] {
                let (x, y) = self.coords(idx);
                regions.push(DirtyRegion {
                    x,
                    y,
                    old: self.front[idx].clone(),
                    new: self.back[idx].clone(),
                });
            }
        }
        std::mem::swap(&mut self.front, &mut self.back);
        self.back.clone_from(&self.front);
        self.dirty.fill(false);
        regions
    }

    /// Change the screen size.
    ///
    /// The overlapping part of the back buffer is kept; the front buffer is
    /// seeded with a sentinel so the next swap reports all `width * height`
    /// cells.
    pub fn resize(&mut self, width: u16, height: u16) {
        let size = usize::from(width) * usize::from(height);
        let mut back = vec![Cell::default(); size];
        let copy_w = width.min(self.width);
        let copy_h = height.min(self.height);
        for y in 0..copy_h {
            for x in 0..copy_w {
                let old = &self.back[usize::from(y) * usize::from(self.width) + usize::from(x)];
                let cell = if old.width() == 2 && x + 1 >= width {
                    Cell::blank(old.style)
                } else {
                    old.clone()
                };
                back[usize::from(y) * usize::from(width) + usize::from(x)] = cell;
            }
        }
        self.back = back;
        self.front = vec![Cell::sentinel(); size];
        self.width = width;
        self.height = height;
        self.dirty = bitvec![1; size];
    }

    /// Row `y` of the back buffer as text.
    #[must_use]
    pub fn row_text(&self, y: u16) -> String {
        Self::text_of(&self.back, self.width, y)
    }

    /// Row `y` of the front buffer as text.
    #[must_use]
    pub fn front_row_text(&self, y: u16) -> String {
        Self::text_of(&self.front, self.width, y)
    }

    fn text_of(cells: &[Cell], width: u16, y: u16) -> String {
        let start = usize::from(y) * usize::from(width);
        cells
            .get(start..start + usize::from(width))
            .map(|row| row.iter().map(|c| c.symbol.as_str()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::Color;

    fn settled(width: u16, height: u16) -> FrameBuffer {
        let mut frame = FrameBuffer::new(width, height);
        frame.swap_buffers();
        frame
    }

    fn red() -> Style {
        Style {
            fg: Color::Red,
            ..Style::default()
        }
    }

    #[test]
    fn test_new_reports_every_cell_once() {
        let mut frame = FrameBuffer::new(4, 3);
        assert_eq!(frame.swap_buffers().len(), 12);
        assert!(frame.swap_buffers().is_empty());
    }

    #[test]
    fn test_out_of_bounds_writes_are_rejected() {
        let mut frame = settled(4, 3);
        assert!(!frame.set_cell(4, 0, Cell::default()));
        assert!(!frame.set_cell(-1, 0, Cell::default()));
        assert!(!frame.set_cell(0, 3, Cell::default()));
        assert!(!frame.has_dirty());
    }

    #[test]
    fn test_swap_reports_only_changes() {
        let mut frame = settled(10, 2);
        frame.set_cell(1, 1, Cell::from_char('x', red()));
        frame.set_cell(2, 1, Cell::default()); // same as front
        assert_eq!(frame.dirty_count(), 2);

        let regions = frame.swap_buffers();
        assert_eq!(regions.len(), 1);
        assert_eq!((regions[0].x, regions[0].y), (1, 1));
        assert_eq!(regions[0].old, Cell::default());
        assert_eq!(regions[0].new.symbol.as_str(), "x");
        assert_eq!(frame.front(1, 1).map(|c| c.style), Some(red()));
        assert_eq!(frame.get(1, 1), frame.front(1, 1));
    }

    #[test]
    fn test_swap_is_idempotent() {
        let mut frame = settled(5, 5);
        frame.write_text(0, 0, "hello", Style::default());
        assert_eq!(frame.swap_buffers().len(), 5);
        assert!(frame.swap_buffers().is_empty());
        assert!(!frame.has_dirty());
    }

    #[test]
    fn test_write_then_restore_is_no_change() {
        let mut frame = settled(5, 1);
        frame.write_text(0, 0, "ab", Style::default());
        frame.clear_rect(Rect::new(0, 0, 2, 1));
        assert!(frame.swap_buffers().is_empty());
    }

    #[test]
    fn test_write_text_clips() {
        let mut frame = settled(4, 1);
        let span = frame.write_text(-2, 0, "abcdef", Style::default());
        assert_eq!(span, 6);
        assert_eq!(frame.row_text(0), "cdef");
        frame.write_text(2, 0, "xyz", Style::default());
        assert_eq!(frame.row_text(0), "cdxy");
    }

    #[test]
    fn test_wide_glyph_claims_two_columns() {
        let mut frame = settled(4, 1);
        frame.write_text(0, 0, "日x", Style::default());
        assert_eq!(frame.get(0, 0).map(Cell::width), Some(2));
        assert!(frame.get(1, 0).is_some_and(Cell::is_continuation));
        assert_eq!(frame.row_text(0), "日x ");
    }

    #[test]
    fn test_wide_glyph_at_edge_becomes_blank() {
        let mut frame = settled(3, 1);
        frame.set_cell(2, 0, Cell::new("日", Style::default()));
        assert_eq!(frame.row_text(0), "   ");
    }

    #[test]
    fn test_overwriting_half_of_wide_glyph() {
        let mut frame = settled(4, 1);
        frame.set_cell(1, 0, Cell::new("日", Style::default()));
        frame.set_cell(2, 0, Cell::from_char('a', Style::default()));
        assert_eq!(frame.row_text(0), "  a ");

        frame.set_cell(1, 0, Cell::new("日", Style::default()));
        frame.set_cell(1, 0, Cell::from_char('b', Style::default()));
        assert_eq!(frame.row_text(0), " b  ");
    }

    #[test]
    fn test_fill_rect_clips_and_counts() {
        let mut frame = settled(5, 5);
        let written = frame.fill_rect(Rect::new(3, 3, 10, 10), &Cell::from_char('#', red()));
        assert_eq!(written, 4);
        assert_eq!(frame.swap_buffers().len(), 4);
    }

    #[test]
    fn test_resize_marks_everything_dirty() {
        let mut frame = settled(4, 2);
        frame.write_text(0, 0, "abcd", Style::default());
        frame.swap_buffers();

        frame.resize(6, 3);
        assert_eq!(frame.row_text(0), "abcd  ");
        let regions = frame.swap_buffers();
        assert_eq!(regions.len(), 18);
        assert!(frame.swap_buffers().is_empty());

        frame.resize(2, 1);
        assert_eq!(frame.row_text(0), "ab");
        assert_eq!(frame.swap_buffers().len(), 2);
    }

    #[test]
    fn test_resize_to_zero() {
        let mut frame = settled(4, 2);
        frame.resize(0, 0);
        assert!(frame.swap_buffers().is_empty());
        assert!(!frame.set_cell(0, 0, Cell::default()));
    }

    #[test]
    fn test_mark_dirty_without_change_reports_nothing() {
        let mut frame = settled(3, 3);
        frame.mark_all_dirty();
        assert!(frame.has_dirty());
        assert!(frame.swap_buffers().is_empty());
    }
}
