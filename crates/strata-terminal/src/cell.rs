//! Terminal cells.
//!
//! Uses `CompactString` to inline small strings (≤24 bytes), so painting a
//! frame does not allocate for typical terminal content.

use compact_str::CompactString;
use strata_core::{prop, Color, PropValue, Props};
use unicode_width::UnicodeWidthStr;

/// Text modifiers for terminal cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Modifiers(u8);

impl Modifiers {
    /// No modifiers.
    pub const NONE: Self = Self(0);
    /// Bold text.
    pub const BOLD: Self = Self(1 << 0);
    /// Italic text.
    pub const ITALIC: Self = Self(1 << 1);
    /// Underlined text.
    pub const UNDERLINE: Self = Self(1 << 2);
    /// Dim/faint text.
    pub const DIM: Self = Self(1 << 3);
    /// Reversed colors.
    pub const REVERSE: Self = Self(1 << 4);

    /// Check if no modifier is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Check if a specific modifier is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Add a modifier.
    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Remove a modifier.
    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Modifiers {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Colors and modifiers of a cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Style {
    /// Foreground color.
    pub fg: Color,
    /// Background color.
    pub bg: Color,
    /// Text modifiers.
    pub modifiers: Modifiers,
}

impl Style {
    /// Read the style props of an element. Unparseable colors fall back to
    /// the terminal default.
    #[must_use]
    pub fn from_props(props: &Props) -> Self {
        let flag = |name: &str, modifier: Modifiers| {
            if props.get(name).and_then(PropValue::as_bool) == Some(true) {
                modifier
            } else {
                Modifiers::NONE
            }
        };
        Self {
            fg: color_prop(props.get(prop::FG)),
            bg: color_prop(props.get(prop::BG)),
            modifiers: flag(prop::BOLD, Modifiers::BOLD)
                | flag(prop::ITALIC, Modifiers::ITALIC)
                | flag(prop::UNDERLINE, Modifiers::UNDERLINE)
                | flag(prop::DIM, Modifiers::DIM)
                | flag(prop::REVERSE, Modifiers::REVERSE),
        }
    }
}

fn color_prop(value: Option<&PropValue>) -> Color {
    match value {
        Some(PropValue::Str(s)) => s.parse().unwrap_or_default(),
        Some(PropValue::Int(i)) => u8::try_from(*i).map_or(Color::Reset, Color::Indexed),
        _ => Color::Reset,
    }
}

/// A single terminal cell.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Cell {
    /// The symbol displayed in this cell (inlined for ≤24 bytes).
    pub symbol: CompactString,
    /// Colors and modifiers.
    pub style: Style,
    /// Display width: 1 for normal, 2 for wide glyphs, 0 for continuation.
    width: u8,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            symbol: CompactString::const_new(" "),
            style: Style::default(),
            width: 1,
        }
    }
}

impl Cell {
    /// Create a new cell with the given content.
    #[must_use]
    pub fn new(symbol: &str, style: Style) -> Self {
        Self {
            symbol: CompactString::new(symbol),
            style,
            width: UnicodeWidthStr::width(symbol).clamp(1, 2) as u8,
        }
    }

    /// Create a cell from a single character.
    #[must_use]
    pub fn from_char(ch: char, style: Style) -> Self {
        let mut buf = [0u8; 4];
        Self::new(ch.encode_utf8(&mut buf), style)
    }

    /// A blank cell with the given background.
    #[must_use]
    pub fn blank(style: Style) -> Self {
        Self::new(" ", style)
    }

    /// The trailing half of a wide glyph.
    #[must_use]
    pub fn continuation(style: Style) -> Self {
        Self {
            symbol: CompactString::const_new(""),
            style,
            width: 0,
        }
    }

    /// A cell that never equals a real cell; seeds the front buffer so every
    /// coordinate counts as changed on the next swap.
    #[must_use]
    pub(crate) fn sentinel() -> Self {
        Self {
            symbol: CompactString::const_new(""),
            style: Style::default(),
            width: u8::MAX,
        }
    }

    /// Check if this is a continuation cell.
    #[must_use]
    pub const fn is_continuation(&self) -> bool {
        self.width == 0
    }

    /// Get the display width of this cell.
    #[must_use]
    pub const fn width(&self) -> u8 {
        self.width
    }
}
