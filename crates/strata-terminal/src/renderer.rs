//! Renderer facade: diff, patch, paint, flush.

use crate::config::RenderConfig;
use crate::diff_renderer::{DiffRenderer, RenderStats};
use crate::error::Result;
use crate::frame::FrameBuffer;
use crate::scene::{PaintReport, Scene};
use crate::scheduler::FrameDriver;
use crate::terminal::{TerminalEvent, TerminalSize};
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use strata_core::{diff_trees, Rect, SceneNode};
use tracing::{debug, warn};

/// Turns successive scene trees into terminal output.
///
/// Each [`Renderer::submit`] diffs the new tree against the previous one,
/// applies the patches to the [`Scene`] and paints the dirty cells into the
/// back buffer; [`Renderer::flush`] publishes the frame.
pub struct Renderer<W: Write> {
    scene: Scene,
    frame: Arc<Mutex<FrameBuffer>>,
    diff_renderer: DiffRenderer,
    writer: W,
    previous: Option<SceneNode>,
}

impl<W: Write> Renderer<W> {
    /// Create a renderer for a `width` x `height` screen.
    #[must_use]
    pub fn new(writer: W, width: u16, height: u16) -> Self {
        Self::with_config(writer, width, height, &RenderConfig::default())
    }

    /// Create a renderer with explicit settings.
    #[must_use]
    pub fn with_config(writer: W, width: u16, height: u16, config: &RenderConfig) -> Self {
        Self {
            scene: Scene::from_config(config),
            frame: Arc::new(Mutex::new(FrameBuffer::new(width, height))),
            diff_renderer: DiffRenderer::new(width),
            writer,
            previous: None,
        }
    }

    /// Create a renderer sized to `terminal`.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal size cannot be queried.
    pub fn for_terminal(
        writer: W,
        terminal: &impl TerminalSize,
        config: &RenderConfig,
    ) -> Result<Self> {
        let (width, height) = terminal.size()?;
        Ok(Self::with_config(writer, width, height, config))
    }

    /// The element registry.
    #[must_use]
    pub const fn scene(&self) -> &Scene {
        &self.scene
    }

    /// The last submitted tree.
    #[must_use]
    pub const fn tree(&self) -> Option<&SceneNode> {
        self.previous.as_ref()
    }

    /// Shared handle to the frame buffer.
    #[must_use]
    pub fn frame_buffer(&self) -> Arc<Mutex<FrameBuffer>> {
        Arc::clone(&self.frame)
    }

    /// The output writer.
    pub const fn writer(&self) -> &W {
        &self.writer
    }

    /// Take the output writer back.
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn lock_frame(&self) -> MutexGuard<'_, FrameBuffer> {
        self.frame.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `next` the current scene and paint what changed.
    ///
    /// On a patch error the scene is rebuilt from scratch on the next
    /// submit.
    ///
    /// # Errors
    ///
    /// Returns the patch or index error that stopped the update.
    pub fn submit(&mut self, next: Option<SceneNode>) -> Result<PaintReport> {
        let patches = diff_trees(self.previous.as_ref(), next.as_ref());
        if let Err(err) = self.scene.apply_all(&patches) {
            warn!(error = %err, "patch application failed; resetting scene");
            self.reset_scene()?;
            return Err(err);
        }
        self.previous = next;

        let report = self.paint()?;
        debug!(
            patches = patches.len(),
            painted = report.painted.len(),
            skipped = report.skipped.len(),
            "scene submitted"
        );
        Ok(report)
    }

    fn reset_scene(&mut self) -> Result<()> {
        self.scene.clear()?;
        self.previous = None;
        let area = self.lock_frame().area();
        self.scene.mark_dirty(area);
        Ok(())
    }

    fn paint(&mut self) -> Result<PaintReport> {
        let mut frame = self.frame.lock().unwrap_or_else(PoisonError::into_inner);
        self.scene.paint(&mut frame)
    }

    /// React to a terminal event.
    ///
    /// # Errors
    ///
    /// Returns an error if repainting fails.
    pub fn handle_event(&mut self, event: TerminalEvent) -> Result<()> {
        match event {
            TerminalEvent::SizeChanged { width, height } => {
                self.lock_frame().resize(width, height);
                self.diff_renderer.reset(width);
                self.scene.mark_dirty(Rect::new(
                    0,
                    0,
                    i32::from(width),
                    i32::from(height),
                ));
                self.paint()?;
                debug!(width, height, "resized");
            }
        }
        Ok(())
    }

    /// Publish the back buffer and write the changed cells.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the output fails.
    pub fn flush(&mut self) -> Result<RenderStats> {
        let regions = self.lock_frame().swap_buffers();
        let stats = self.diff_renderer.render(&regions, &mut self.writer)?;
        self.writer.flush()?;
        Ok(stats)
    }
}

impl<W: Write> FrameDriver for Renderer<W> {
    fn needs_frame(&self) -> bool {
        self.scene.is_dirty() || self.lock_frame().has_dirty()
    }

    fn render_frame(&mut self) -> Result<()> {
        if self.scene.is_dirty() {
            self.paint()?;
        }
        self.flush().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::FixedSize;
    use strata_core::prop;

    fn label(text: &str, x: i32) -> SceneNode {
        SceneNode::element("label")
            .with_bounds(Rect::new(x, 0, 5, 1))
            .with_child(SceneNode::text(text))
    }

    #[test]
    fn test_first_flush_writes_whole_screen() {
        let mut renderer = Renderer::new(Vec::new(), 10, 2);
        renderer.submit(Some(label("Hello", 0))).unwrap();
        let stats = renderer.flush().unwrap();
        assert_eq!(stats.cells_written, 20);

        let frame = renderer.frame_buffer();
        assert_eq!(frame.lock().unwrap().front_row_text(0), "Hello     ");
    }

    #[test]
    fn test_same_tree_writes_nothing() {
        let mut renderer = Renderer::new(Vec::new(), 10, 1);
        renderer.submit(Some(label("Hello", 0))).unwrap();
        renderer.flush().unwrap();

        let report = renderer.submit(Some(label("Hello", 0))).unwrap();
        assert_eq!(report, PaintReport::default());
        let stats = renderer.flush().unwrap();
        assert_eq!(stats.cells_written, 0);
    }

    #[test]
    fn test_text_change_writes_changed_cells_only() {
        let mut renderer = Renderer::new(Vec::new(), 10, 1);
        renderer.submit(Some(label("Hello", 0))).unwrap();
        renderer.flush().unwrap();

        renderer.submit(Some(label("Help!", 0))).unwrap();
        let stats = renderer.flush().unwrap();
        assert_eq!(stats.cells_written, 2);
        assert_eq!(stats.runs, 1);
    }

    #[test]
    fn test_submit_none_clears_screen() {
        let mut renderer = Renderer::new(Vec::new(), 6, 1);
        renderer.submit(Some(label("abc", 0))).unwrap();
        renderer.flush().unwrap();

        renderer.submit(None).unwrap();
        renderer.flush().unwrap();
        assert!(renderer.scene().is_empty());
        assert_eq!(
            renderer.frame_buffer().lock().unwrap().front_row_text(0),
            "      "
        );
    }

    #[test]
    fn test_resize_repaints_everything() {
        let mut renderer = Renderer::new(Vec::new(), 6, 1);
        renderer.submit(Some(label("abc", 0))).unwrap();
        renderer.flush().unwrap();

        renderer
            .handle_event(TerminalEvent::SizeChanged {
                width: 8,
                height: 2,
            })
            .unwrap();
        let stats = renderer.flush().unwrap();
        assert_eq!(stats.cells_written, 16);
        assert_eq!(
            renderer.frame_buffer().lock().unwrap().front_row_text(0),
            "abc     "
        );
    }

    #[test]
    fn test_extreme_layout_values() {
        let mut renderer = Renderer::new(Vec::new(), 10, 1);
        let far = SceneNode::element("far")
            .with_bounds(Rect::new(i32::MAX - 1, 0, 5, 1))
            .with_prop(prop::FILL, "#");
        let wide = SceneNode::element("wide")
            .with_bounds(Rect::new(-5, 0, i32::MAX, 1))
            .with_child(SceneNode::text("abcdefgh"));
        let tree = SceneNode::fragment(vec![far, wide]);

        renderer.submit(Some(tree.clone())).unwrap();
        renderer.flush().unwrap();
        assert_eq!(
            renderer.frame_buffer().lock().unwrap().front_row_text(0),
            "fgh       "
        );
        assert_eq!(renderer.scene().len(), 3);

        renderer.submit(None).unwrap();
        renderer.submit(Some(tree)).unwrap();
        assert_eq!(renderer.scene().len(), 3);
    }

    #[test]
    fn test_frame_driver() {
        let mut renderer = Renderer::for_terminal(
            Vec::new(),
            &FixedSize::new(4, 1),
            &RenderConfig::default(),
        )
        .unwrap();
        assert!(renderer.needs_frame());
        renderer.render_frame().unwrap();
        assert!(!renderer.needs_frame());

        let tree = SceneNode::element("dot")
            .with_bounds(Rect::new(1, 0, 1, 1))
            .with_prop(prop::FILL, "*");
        renderer.submit(Some(tree)).unwrap();
        assert!(renderer.needs_frame());
        renderer.render_frame().unwrap();
        assert!(!renderer.needs_frame());

        let output = String::from_utf8(renderer.into_writer()).unwrap();
        assert!(output.ends_with('*'));
    }
}
