//! Terminal backend for the Strata incremental renderer.
//!
//! Turns successive immutable scene trees into minimal terminal output:
//!
//! ```text
//! SceneNode ──diff──▶ Patch list ──apply──▶ Scene (registry + R-tree)
//!                                              │ paint dirty cells
//!                                              ▼
//!                      terminal ◀──escape codes── FrameBuffer (front/back)
//! ```
//!
//! - [`Scene`] applies patches and composites dirty elements in paint order,
//!   skipping fully occluded ones
//! - [`FrameBuffer`] double-buffers cells and reports only changed ones
//! - [`DiffRenderer`] writes those cells with as few escape codes as it can
//! - [`RenderScheduler`] drives a [`Renderer`] on a dedicated render thread
//!
//! # Example
//!
//! ```
//! use strata_core::{Rect, SceneNode};
//! use strata_terminal::Renderer;
//!
//! let mut renderer = Renderer::new(Vec::new(), 20, 2);
//! let tree = SceneNode::element("label")
//!     .with_bounds(Rect::new(5, 0, 5, 1))
//!     .with_child(SceneNode::text("Hello"));
//! renderer.submit(Some(tree)).unwrap();
//! renderer.flush().unwrap();
//! ```

#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

mod cell;
mod config;
mod diff_renderer;
mod error;
mod frame;
mod renderer;
mod scene;
mod scheduler;
mod terminal;

pub use cell::{Cell, Modifiers, Style};
pub use config::RenderConfig;
pub use diff_renderer::{to_crossterm_color, DiffRenderer, RenderStats};
pub use error::{Result, StrataError};
pub use frame::{DirtyRegion, FrameBuffer};
pub use renderer::Renderer;
pub use scene::{Content, ElementId, PaintReport, RenderedElement, Scene};
pub use scheduler::{
    FrameDriver, RenderHandle, RenderMode, RenderScheduler, SchedulerConfig, SchedulerState,
    SchedulerStats,
};
pub use terminal::{CrosstermTerminal, FixedSize, TerminalEvent, TerminalSize};
