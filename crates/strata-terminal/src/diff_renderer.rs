//! Differential renderer for optimized terminal I/O.
//!
//! Turns the [`DirtyRegion`]s of one swap into escape sequences:
//! - Only changed cells are written
//! - One cursor move per contiguous run of cells on a row
//! - Style codes only when the style actually changes
//! - Output is batched through a buffered writer

use crate::cell::{Modifiers, Style};
use crate::frame::DirtyRegion;
use crossterm::cursor::MoveTo;
use crossterm::style::{
    Attribute, Color as CrosstermColor, Print, ResetColor, SetAttribute, SetBackgroundColor,
    SetForegroundColor,
};
use crossterm::{queue, QueueableCommand};
use std::io::{self, BufWriter, Write};
use strata_core::Color;

/// Statistics of the last [`DiffRenderer::render`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Cells printed
    pub cells_written: usize,
    /// Contiguous runs of cells
    pub runs: usize,
    /// Cursor move sequences emitted
    pub cursor_moves: usize,
    /// Style change sequences emitted
    pub style_changes: usize,
}

/// Differential renderer that minimizes terminal I/O.
///
/// Tracks the cursor position and style across cells to avoid redundant
/// escape sequences.
#[derive(Debug)]
pub struct DiffRenderer {
    /// Last known cursor position (`None` = unknown).
    cursor: Option<(u16, u16)>,
    /// Last emitted style.
    last_style: Style,
    /// Screen width; the cursor position is unknown after the last column.
    width: u16,
    stats: RenderStats,
}

impl Default for DiffRenderer {
    fn default() -> Self {
        Self::new(u16::MAX)
    }
}

impl DiffRenderer {
    /// Create a renderer for a screen `width` columns wide.
    #[must_use]
    pub fn new(width: u16) -> Self {
        Self {
            cursor: None,
            last_style: Style::default(),
            width,
            stats: RenderStats::default(),
        }
    }

    /// Forget cursor and style state (call after terminal resize or clear).
    pub fn reset(&mut self, width: u16) {
        self.cursor = None;
        self.last_style = Style::default();
        self.width = width;
        self.stats = RenderStats::default();
    }

    /// Statistics of the last render.
    #[must_use]
    pub const fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Write the given changes. Regions may come in any order; nothing is
    /// written when there are none.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the writer fails.
    pub fn render<W: Write>(
        &mut self,
        regions: &[DirtyRegion],
        writer: &mut W,
    ) -> io::Result<RenderStats> {
        self.stats = RenderStats::default();
        if regions.is_empty() {
            return Ok(self.stats);
        }

        let mut ordered: Vec<&DirtyRegion> = regions.iter().collect();
        ordered.sort_by_key(|r| (r.y, r.x));

        // Use buffered writer to batch syscalls
        let mut out = BufWriter::with_capacity(8192, writer);

        // Reset colors at start for clean state
        queue!(out, ResetColor, SetAttribute(Attribute::Reset))?;
        self.last_style = Style::default();

        let mut run_end: Option<(u16, u16)> = None;
        for region in ordered {
            let cell = &region.new;
            if cell.is_continuation() {
                continue;
            }

            if run_end != Some((region.x, region.y)) {
                self.stats.runs += 1;
            }
            if self.cursor != Some((region.x, region.y)) {
                queue!(out, MoveTo(region.x, region.y))?;
                self.stats.cursor_moves += 1;
            }

            if cell.style != self.last_style {
                apply_style(&mut out, cell.style)?;
                self.last_style = cell.style;
                self.stats.style_changes += 1;
            }

            queue!(out, Print(&cell.symbol))?;
            self.stats.cells_written += 1;

            let next_x = region.x.saturating_add(u16::from(cell.width()));
            run_end = Some((next_x, region.y));
            self.cursor = (next_x < self.width).then_some((next_x, region.y));
        }

        out.flush()?;
        Ok(self.stats)
    }
}

/// Map a cell color onto crossterm's palette.
#[must_use]
pub fn to_crossterm_color(color: Color) -> CrosstermColor {
    match color {
        Color::Reset => CrosstermColor::Reset,
        Color::Black => CrosstermColor::Black,
        Color::Red => CrosstermColor::DarkRed,
        Color::Green => CrosstermColor::DarkGreen,
        Color::Yellow => CrosstermColor::DarkYellow,
        Color::Blue => CrosstermColor::DarkBlue,
        Color::Magenta => CrosstermColor::DarkMagenta,
        Color::Cyan => CrosstermColor::DarkCyan,
        Color::White => CrosstermColor::Grey,
        Color::Grey => CrosstermColor::DarkGrey,
        Color::Indexed(n) => CrosstermColor::AnsiValue(n),
        Color::Rgb(r, g, b) => CrosstermColor::Rgb { r, g, b },
    }
}

fn apply_style<W: Write>(writer: &mut W, style: Style) -> io::Result<()> {
    // Reset attributes FIRST (before setting colors!)
    writer.queue(SetAttribute(Attribute::Reset))?;
    writer.queue(SetForegroundColor(to_crossterm_color(style.fg)))?;
    writer.queue(SetBackgroundColor(to_crossterm_color(style.bg)))?;

    let attributes = [
        (Modifiers::BOLD, Attribute::Bold),
        (Modifiers::ITALIC, Attribute::Italic),
        (Modifiers::UNDERLINE, Attribute::Underlined),
        (Modifiers::DIM, Attribute::Dim),
        (Modifiers::REVERSE, Attribute::Reverse),
    ];
    for (modifier, attribute) in attributes {
        if style.modifiers.contains(modifier) {
            writer.queue(SetAttribute(attribute))?;
        }
    }
    Ok(())
}
