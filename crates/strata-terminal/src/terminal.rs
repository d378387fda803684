//! Terminal driver seam.
//!
//! The renderer only writes bytes to a [`Write`](std::io::Write); everything
//! that talks to the real terminal lives behind these small types so tests
//! can substitute a fixed-size stand-in.

use crate::error::Result;
use crossterm::{
    cursor,
    event::{self, Event as CrosstermEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io::{self, Stdout};
use std::time::Duration;

/// Source of the terminal dimensions.
pub trait TerminalSize {
    /// Current size as (width, height) in cells.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be queried.
    fn size(&self) -> Result<(u16, u16)>;
}

/// Events the renderer reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminalEvent {
    /// The terminal was resized.
    SizeChanged {
        /// New width in cells.
        width: u16,
        /// New height in cells.
        height: u16,
    },
}

impl TerminalEvent {
    /// Translate a crossterm event. Events the renderer does not handle map
    /// to `None`.
    #[must_use]
    pub fn from_crossterm(event: &CrosstermEvent) -> Option<Self> {
        match *event {
            CrosstermEvent::Resize(width, height) => Some(Self::SizeChanged { width, height }),
            _ => None,
        }
    }
}

/// Real terminal backed by crossterm and stdout.
pub struct CrosstermTerminal {
    stdout: Stdout,
    entered: bool,
}

impl CrosstermTerminal {
    /// Create a handle to the process terminal.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
            entered: false,
        }
    }

    /// Enter raw mode and the alternate screen, hiding the cursor.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal rejects the mode switch.
    pub fn enter(&mut self) -> Result<()> {
        enable_raw_mode()?;
        execute!(self.stdout, EnterAlternateScreen, cursor::Hide)?;
        self.entered = true;
        Ok(())
    }

    /// Leave the alternate screen and raw mode. Failures are ignored so the
    /// terminal is restored as far as possible.
    pub fn leave(&mut self) {
        if !self.entered {
            return;
        }
        let _ = execute!(self.stdout, cursor::Show, LeaveAlternateScreen);
        let _ = disable_raw_mode();
        self.entered = false;
    }

    /// Wait up to `timeout` for an event the renderer handles.
    ///
    /// # Errors
    ///
    /// Returns an error if polling or reading fails.
    pub fn poll_event(&self, timeout: Duration) -> Result<Option<TerminalEvent>> {
        if event::poll(timeout)? {
            Ok(TerminalEvent::from_crossterm(&event::read()?))
        } else {
            Ok(None)
        }
    }

    /// Writer for rendered frames.
    #[must_use]
    pub fn writer(&self) -> Stdout {
        io::stdout()
    }
}

impl Default for CrosstermTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CrosstermTerminal {
    fn drop(&mut self) {
        self.leave();
    }
}

impl TerminalSize for CrosstermTerminal {
    fn size(&self) -> Result<(u16, u16)> {
        Ok(crossterm::terminal::size()?)
    }
}

/// A terminal of fixed dimensions, for tests and headless rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedSize {
    /// Width in cells.
    pub width: u16,
    /// Height in cells.
    pub height: u16,
}

impl FixedSize {
    /// Create a fixed size.
    #[must_use]
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

impl TerminalSize for FixedSize {
    fn size(&self) -> Result<(u16, u16)> {
        Ok((self.width, self.height))
    }
}
