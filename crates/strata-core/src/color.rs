//! Terminal colors.
//!
//! Cells store colors exactly as the terminal will receive them; palette
//! degradation for limited terminals happens outside this crate.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A terminal foreground or background color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Color {
    /// The terminal's default color.
    #[default]
    Reset,
    /// ANSI black
    Black,
    /// ANSI red
    Red,
    /// ANSI green
    Green,
    /// ANSI yellow
    Yellow,
    /// ANSI blue
    Blue,
    /// ANSI magenta
    Magenta,
    /// ANSI cyan
    Cyan,
    /// ANSI white
    White,
    /// ANSI bright black
    Grey,
    /// 256-color palette index
    Indexed(u8),
    /// 24-bit true color
    Rgb(u8, u8, u8),
}

impl Color {
    /// Parse a hex color string (e.g., "#ff0000" or "ff0000").
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid 6-digit hex color.
    pub fn from_hex(hex: &str) -> Result<Self, ColorParseError> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 {
            return Err(ColorParseError::InvalidLength);
        }
        let channel = |range: std::ops::Range<usize>| {
            hex.get(range)
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or(ColorParseError::InvalidHex)
        };
        Ok(Self::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// Convert to hex string; `None` for named and indexed colors.
    #[must_use]
    pub fn to_hex(&self) -> Option<String> {
        match self {
            Self::Rgb(r, g, b) => Some(format!("#{r:02x}{g:02x}{b:02x}")),
            _ => None,
        }
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let named = match lower.as_str() {
            "reset" | "default" => Some(Self::Reset),
            "black" => Some(Self::Black),
            "red" => Some(Self::Red),
            "green" => Some(Self::Green),
            "yellow" => Some(Self::Yellow),
            "blue" => Some(Self::Blue),
            "magenta" => Some(Self::Magenta),
            "cyan" => Some(Self::Cyan),
            "white" => Some(Self::White),
            "grey" | "gray" => Some(Self::Grey),
            _ => None,
        };
        if let Some(color) = named {
            return Ok(color);
        }
        if lower.starts_with('#') {
            return Self::from_hex(&lower);
        }
        lower
            .parse::<u8>()
            .map(Self::Indexed)
            .map_err(|_| ColorParseError::UnknownName(s.to_string()))
    }
}

/// Error type for color parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    /// Invalid hex characters
    InvalidHex,
    /// Invalid string length
    InvalidLength,
    /// Not a color name, hex string or palette index
    UnknownName(String),
}

impl std::fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidHex => write!(f, "invalid hex characters"),
            Self::InvalidLength => write!(f, "invalid hex string length (expected 6)"),
            Self::UnknownName(name) => write!(f, "unknown color: {name}"),
        }
    }
}

impl std::error::Error for ColorParseError {}
