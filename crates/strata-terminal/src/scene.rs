//! Rendered element registry and compositor.
//!
//! A [`Scene`] mirrors the last submitted tree as an arena of
//! [`RenderedElement`]s under an implicit document root at path `[]`.
//! Patches mutate the registry, the spatial index and the dirty set
//! together; [`Scene::paint`] turns the dirty set into frame writes.
//!
//! Text nodes are laid out as successive lines inside their parent's
//! bounds and take the parent's z and style.

use crate::cell::{Cell, Style};
use crate::config::RenderConfig;
use crate::error::{Result, StrataError};
use crate::frame::FrameBuffer;
use bitvec::prelude::*;
use std::collections::BTreeSet;
use strata_core::{
    layout_bounds, layout_z, prop, Patch, PropChange, PropDelta, Props, Rect, SceneNode,
};
use strata_index::{IndexConfig, SpatialIndex};
use tracing::{debug, trace};
use unicode_width::UnicodeWidthChar;

/// Arena handle of a rendered element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u32);

impl ElementId {
    /// The implicit document root.
    pub const DOCUMENT: Self = Self(0);

    const fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a rendered element shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Content {
    /// The document root
    Document,
    /// Text lines
    Text(String),
    /// Element with its tag
    Element(String),
    /// Component with its kind
    Component(String),
}

/// Registry entry for one live scene node.
#[derive(Clone, Debug)]
pub struct RenderedElement {
    id: ElementId,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    content: Content,
    props: Props,
    bounds: Rect,
    z: i32,
    style: Style,
    fill: char,
}

impl RenderedElement {
    /// Arena handle.
    #[must_use]
    pub const fn id(&self) -> ElementId {
        self.id
    }

    /// Parent element; `None` only for the document root.
    #[must_use]
    pub const fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    /// Children in document order.
    #[must_use]
    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    /// What the element shows.
    #[must_use]
    pub const fn content(&self) -> &Content {
        &self.content
    }

    /// Current props (empty for text and the document).
    #[must_use]
    pub const fn props(&self) -> &Props {
        &self.props
    }

    /// Screen bounds.
    #[must_use]
    pub const fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Stacking order.
    #[must_use]
    pub const fn z(&self) -> i32 {
        self.z
    }

    /// Colors and modifiers.
    #[must_use]
    pub const fn style(&self) -> Style {
        self.style
    }

    /// Text content, for text elements.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Content::Text(text) => Some(text),
            _ => None,
        }
    }

    const fn has_children(&self) -> bool {
        matches!(self.content, Content::Document | Content::Element(_))
    }
}

/// Outcome of one [`Scene::paint`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PaintReport {
    /// Elements painted, in paint order
    pub painted: Vec<ElementId>,
    /// Elements skipped because they are completely occluded
    pub skipped: Vec<ElementId>,
    /// Cells inside the repaint mask
    pub cells: usize,
}

impl PaintReport {
    /// How often `id` was painted.
    #[must_use]
    pub fn paint_count(&self, id: ElementId) -> usize {
        self.painted.iter().filter(|&&p| p == id).count()
    }
}

#[derive(Debug, Default)]
struct DirtyTracker {
    rects: Vec<Rect>,
    elements: BTreeSet<ElementId>,
}

impl DirtyTracker {
    fn mark_rect(&mut self, rect: Rect) {
        if !rect.is_empty() {
            self.rects.push(rect);
        }
    }

    fn is_empty(&self) -> bool {
        self.rects.is_empty() && self.elements.is_empty()
    }

    fn clear(&mut self) {
        self.rects.clear();
        self.elements.clear();
    }
}

/// Cells of the frame that must be repainted.
struct Mask {
    bits: BitVec,
    area: Rect,
    bbox: Option<Rect>,
}

impl Mask {
    fn new(area: Rect) -> Self {
        Self {
            bits: bitvec![0; area.area() as usize],
            area,
            bbox: None,
        }
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        self.area
            .contains_point(x, y)
            .then(|| (y * self.area.width + x) as usize)
    }

    fn add(&mut self, rect: Rect) {
        let clipped = rect.intersect(&self.area);
        if clipped.is_empty() {
            return;
        }
        for (x, y) in clipped.cells() {
            if let Some(i) = self.index(x, y) {
                self.bits.set(i, true);
            }
        }
        self.bbox = Some(self.bbox.map_or(clipped, |b| b.union(&clipped)));
    }

    fn contains(&self, x: i32, y: i32) -> bool {
        self.index(x, y).is_some_and(|i| self.bits[i])
    }

    fn touches(&self, rect: &Rect) -> bool {
        rect.intersect(&self.area)
            .cells()
            .any(|(x, y)| self.contains(x, y))
    }

    /// Extend the mask to the other half of every wide glyph it cuts.
    fn complete_wide_glyphs(&mut self, frame: &FrameBuffer) {
        let partners: Vec<(i32, i32)> = self
            .cells()
            .filter_map(|(x, y)| {
                let cell = frame.get(x, y)?;
                if cell.is_continuation() {
                    Some((x - 1, y))
                } else if cell.width() == 2 {
                    Some((x + 1, y))
                } else {
                    None
                }
            })
            .collect();
        for (x, y) in partners {
            self.add(Rect::new(x, y, 1, 1));
        }
    }

    fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        let width = self.area.width;
        self.bits
            .iter_ones()
            .map(move |i| (i as i32 % width, i as i32 / width))
    }
}

/// Element registry, spatial index and dirty set of one render target.
#[derive(Debug)]
pub struct Scene {
    elements: Vec<Option<RenderedElement>>,
    free: Vec<usize>,
    index: SpatialIndex<ElementId>,
    dirty: DirtyTracker,
    skip_occluded: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Create an empty scene with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(IndexConfig::default(), true)
    }

    /// Create an empty scene.
    #[must_use]
    pub fn with_config(index: IndexConfig, skip_occluded: bool) -> Self {
        let document = RenderedElement {
            id: ElementId::DOCUMENT,
            parent: None,
            children: Vec::new(),
            content: Content::Document,
            props: Props::new(),
            bounds: Rect::EMPTY,
            z: 0,
            style: Style::default(),
            fill: ' ',
        };
        Self {
            elements: vec![Some(document)],
            free: Vec::new(),
            index: SpatialIndex::with_config(index),
            dirty: DirtyTracker::default(),
            skip_occluded,
        }
    }

    /// Create an empty scene from renderer settings.
    #[must_use]
    pub fn from_config(config: &RenderConfig) -> Self {
        Self::with_config(config.index_config(), config.skip_occluded)
    }

    /// Number of live elements, excluding the document root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if the scene has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Look up an element.
    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&RenderedElement> {
        self.elements.get(id.index()).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, id: ElementId) -> Option<&mut RenderedElement> {
        self.elements.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Element at a structural path; `[]` is the document root.
    #[must_use]
    pub fn element_at(&self, path: &[usize]) -> Option<&RenderedElement> {
        self.resolve(path).ok().and_then(|id| self.get(id))
    }

    /// Top-level elements.
    #[must_use]
    pub fn roots(&self) -> &[ElementId] {
        self.get(ElementId::DOCUMENT)
            .map_or(&[], |document| document.children.as_slice())
    }

    /// The spatial index over all elements.
    #[must_use]
    pub const fn index(&self) -> &SpatialIndex<ElementId> {
        &self.index
    }

    /// Topmost element at a cell.
    #[must_use]
    pub fn hit_test(&self, x: i32, y: i32) -> Option<ElementId> {
        self.index.query_point(x, y).first().map(|entry| entry.key)
    }

    /// Check if anything awaits painting.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Force a repaint of `rect` on the next paint.
    pub fn mark_dirty(&mut self, rect: Rect) {
        self.dirty.mark_rect(rect);
    }

    /// Remove every element.
    ///
    /// # Errors
    ///
    /// Returns an error if the spatial index is out of sync.
    pub fn clear(&mut self) -> Result<()> {
        let roots = self
            .get_mut(ElementId::DOCUMENT)
            .map(|document| std::mem::take(&mut document.children))
            .unwrap_or_default();
        for root in roots {
            self.remove_subtree(root)?;
        }
        Ok(())
    }

    // =========================================================================
    // Patch application
    // =========================================================================

    /// Apply patches in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first patch error; earlier patches stay applied.
    pub fn apply_all(&mut self, patches: &[Patch]) -> Result<()> {
        for patch in patches {
            self.apply(patch)?;
        }
        debug!(
            patches = patches.len(),
            elements = self.len(),
            "patches applied"
        );
        Ok(())
    }

    /// Apply one patch.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::PatchApplication`] if the path does not
    /// resolve, an index is out of range, a permutation is invalid, the
    /// target has the wrong kind, or the payload is a fragment.
    pub fn apply(&mut self, patch: &Patch) -> Result<()> {
        trace!(path = ?patch.path(), structural = patch.is_structural(), "apply patch");
        match patch {
            Patch::Replace { path, node } => self.replace(path, node),
            Patch::UpdateProps { path, changes } => self.update_props(path, changes),
            Patch::UpdateText { path, text } => self.update_text(path, text),
            Patch::Insert { path, index, node } => self.insert(path, *index, node),
            Patch::Remove { path, index } => self.remove(path, *index),
            Patch::Move { path, from, to } => self.move_child(path, *from, *to),
            Patch::Reorder { path, permutation } => self.reorder(path, permutation),
        }
    }

    fn resolve(&self, path: &[usize]) -> Result<ElementId> {
        let mut id = ElementId::DOCUMENT;
        for (depth, &i) in path.iter().enumerate() {
            id = self
                .get(id)
                .and_then(|element| element.children.get(i))
                .copied()
                .ok_or_else(|| StrataError::patch(path, format!("no child {i} at depth {depth}")))?;
        }
        Ok(id)
    }

    /// Resolve a parent path and return its child list length.
    fn resolve_parent(&self, path: &[usize]) -> Result<(ElementId, usize)> {
        let id = self.resolve(path)?;
        match self.get(id) {
            Some(parent) if parent.has_children() => Ok((id, parent.children.len())),
            _ => Err(StrataError::patch(path, "target cannot have children")),
        }
    }

    fn children_mut(&mut self, path: &[usize], parent: ElementId) -> Result<&mut Vec<ElementId>> {
        self.get_mut(parent)
            .map(|element| &mut element.children)
            .ok_or_else(|| StrataError::patch(path, "stale parent"))
    }

    fn replace(&mut self, path: &[usize], node: &SceneNode) -> Result<()> {
        let Some((&position, parent_path)) = path.split_last() else {
            return Err(StrataError::patch(path, "cannot replace the document root"));
        };
        reject_fragment(path, node)?;
        let old = self.resolve(path)?;
        let (parent, _) = self.resolve_parent(parent_path)?;

        self.remove_subtree(old)?;
        let new = self.build(node, parent, path)?;
        self.children_mut(path, parent)?[position] = new;
        self.restack()?;
        self.relayout_text(parent)
    }

    fn insert(&mut self, path: &[usize], index: usize, node: &SceneNode) -> Result<()> {
        reject_fragment(path, node)?;
        let (parent, len) = self.resolve_parent(path)?;
        if index > len {
            return Err(StrataError::patch(
                path,
                format!("insert index {index} out of range for {len} children"),
            ));
        }
        let child = self.build(node, parent, path)?;
        self.children_mut(path, parent)?.insert(index, child);
        self.restack()?;
        self.relayout_text(parent)
    }

    fn remove(&mut self, path: &[usize], index: usize) -> Result<()> {
        let (parent, len) = self.resolve_parent(path)?;
        if index >= len {
            return Err(StrataError::patch(
                path,
                format!("remove index {index} out of range for {len} children"),
            ));
        }
        let child = self.children_mut(path, parent)?.remove(index);
        self.remove_subtree(child)?;
        self.relayout_text(parent)
    }

    fn move_child(&mut self, path: &[usize], from: usize, to: usize) -> Result<()> {
        let (parent, len) = self.resolve_parent(path)?;
        if from >= len || to >= len {
            return Err(StrataError::patch(
                path,
                format!("move {from} -> {to} out of range for {len} children"),
            ));
        }
        let children = self.children_mut(path, parent)?;
        let moved = children.remove(from);
        children.insert(to, moved);
        if from != to {
            self.mark_subtree(moved);
            self.restack()?;
        }
        self.relayout_text(parent)
    }

    fn reorder(&mut self, path: &[usize], permutation: &[usize]) -> Result<()> {
        let (parent, len) = self.resolve_parent(path)?;
        let mut seen = bitvec![0; len];
        let valid = permutation.len() == len
            && permutation
                .iter()
                .all(|&old| old < len && !seen.replace(old, true));
        if !valid {
            return Err(StrataError::patch(
                path,
                format!("{permutation:?} is not a permutation of {len} children"),
            ));
        }
        let children = self.children_mut(path, parent)?;
        let reordered: Vec<ElementId> = permutation.iter().map(|&old| children[old]).collect();
        *children = reordered.clone();
        let mut shifted = false;
        for (position, (&old, id)) in permutation.iter().zip(reordered).enumerate() {
            if old != position {
                self.mark_subtree(id);
                shifted = true;
            }
        }
        if shifted {
            self.restack()?;
        }
        self.relayout_text(parent)
    }

    fn update_props(&mut self, path: &[usize], changes: &PropDelta) -> Result<()> {
        let id = self.resolve(path)?;
        let element = self
            .get_mut(id)
            .filter(|e| matches!(e.content, Content::Element(_) | Content::Component(_)))
            .ok_or_else(|| StrataError::patch(path, "props can only change on elements"))?;

        for (name, change) in changes {
            match change {
                PropChange::Set(value) => {
                    element.props.insert(name.clone(), value.clone());
                }
                PropChange::Remove => {
                    element.props.remove(name);
                }
            }
        }
        let bounds = layout_bounds(&element.props);
        let z = layout_z(&element.props);
        let style = Style::from_props(&element.props);
        let fill = fill_char(&element.props);
        if style != element.style || fill != element.fill {
            element.style = style;
            element.fill = fill;
            let current = element.bounds;
            self.dirty.mark_rect(current);
            self.dirty.elements.insert(id);
        }

        self.relocate(id, bounds, z)?;
        self.relayout_text(id)
    }

    fn update_text(&mut self, path: &[usize], text: &str) -> Result<()> {
        let id = self.resolve(path)?;
        let element = self
            .get_mut(id)
            .filter(|e| matches!(e.content, Content::Text(_)))
            .ok_or_else(|| StrataError::patch(path, "text can only change on text nodes"))?;

        element.content = Content::Text(text.to_owned());
        let (bounds, parent) = (element.bounds, element.parent);
        self.dirty.mark_rect(bounds);
        self.dirty.elements.insert(id);
        parent.map_or(Ok(()), |parent| self.relayout_text(parent))
    }

    // =========================================================================
    // Registry maintenance
    // =========================================================================

    fn alloc(&mut self, element: RenderedElement) -> ElementId {
        let id = element.id;
        if let Some(slot) = self.elements.get_mut(id.index()) {
            *slot = Some(element);
        } else {
            self.elements.push(Some(element));
        }
        id
    }

    fn next_id(&mut self) -> ElementId {
        let index = self.free.pop().unwrap_or(self.elements.len());
        ElementId(index as u32)
    }

    /// Create registry entries for `node` and its subtree under `parent`.
    fn build(&mut self, node: &SceneNode, parent: ElementId, path: &[usize]) -> Result<ElementId> {
        let (content, props) = match node {
            SceneNode::Text(text) => (Content::Text(text.clone()), Props::new()),
            SceneNode::Element(element) => {
                (Content::Element(element.tag.clone()), element.props.clone())
            }
            SceneNode::Component(component) => {
                (Content::Component(component.kind.clone()), component.props.clone())
            }
            SceneNode::Fragment(_) => return Err(StrataError::patch(path, "fragment payload")),
        };
        let is_text = matches!(content, Content::Text(_));
        let bounds = if is_text { Rect::EMPTY } else { layout_bounds(&props) };
        let z = layout_z(&props);

        let id = self.next_id();
        self.alloc(RenderedElement {
            id,
            parent: Some(parent),
            children: Vec::new(),
            content,
            style: Style::from_props(&props),
            fill: fill_char(&props),
            props,
            bounds,
            z,
        });
        self.index.insert(id, bounds, z)?;
        self.dirty.mark_rect(bounds);
        self.dirty.elements.insert(id);

        if !is_text {
            let mut children = Vec::new();
            for child in node.flattened_children() {
                children.push(self.build(child, id, path)?);
            }
            if let Some(element) = self.get_mut(id) {
                element.children = children;
            }
            self.relayout_text(id)?;
        }
        Ok(id)
    }

    fn remove_subtree(&mut self, root: ElementId) -> Result<()> {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(element) = self.elements.get_mut(id.index()).and_then(Option::take) else {
                continue;
            };
            let entry = self.index.remove(&id)?;
            self.dirty.mark_rect(entry.bounds);
            self.dirty.elements.remove(&id);
            self.free.push(id.index());
            stack.extend(element.children);
        }
        Ok(())
    }

    /// Renumber the index's tie-break sequences in document order, so that
    /// equal z-indices stack the same way as in a freshly built scene.
    fn restack(&mut self) -> Result<()> {
        let mut stack: Vec<ElementId> = self.roots().iter().rev().copied().collect();
        let mut order = 0u64;
        while let Some(id) = stack.pop() {
            if let Some(element) = self.get(id) {
                stack.extend(element.children.iter().rev().copied());
            }
            self.index.set_seq(&id, order)?;
            order += 1;
        }
        Ok(())
    }

    /// Mark an element and all its descendants for repainting.
    fn mark_subtree(&mut self, root: ElementId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(element) = self.get(id) else {
                continue;
            };
            let bounds = element.bounds;
            stack.extend(element.children.iter().copied());
            self.dirty.mark_rect(bounds);
            self.dirty.elements.insert(id);
        }
    }

    /// Move an element in the index and mark what the move exposes.
    fn relocate(&mut self, id: ElementId, bounds: Rect, z: i32) -> Result<()> {
        let Some(old) = self.index.get(&id).copied() else {
            return Ok(());
        };
        if old.bounds == bounds && old.z == z {
            return Ok(());
        }

        self.dirty.mark_rect(old.bounds);
        self.dirty.mark_rect(bounds);
        self.dirty.elements.insert(id);
        self.index.update(id, bounds, z)?;
        if let Some(element) = self.get_mut(id) {
            element.bounds = bounds;
            element.z = z;
        }

        let Some(moved) = self.index.get(&id).copied() else {
            return Ok(());
        };
        let swept = match (old.bounds.is_empty(), bounds.is_empty()) {
            (true, _) => bounds,
            (_, true) => old.bounds,
            _ => old.bounds.union(&bounds),
        };
        for neighbour in self.index.query(&swept) {
            if neighbour.key == id || !moved.is_above(&neighbour) {
                continue;
            }
            if neighbour.bounds.intersects(&bounds) {
                if self.index.is_completely_occluded(&neighbour.key)? {
                    self.dirty.elements.remove(&neighbour.key);
                } else {
                    self.dirty.elements.insert(neighbour.key);
                }
            } else if neighbour.bounds.intersects(&old.bounds) {
                self.dirty.elements.insert(neighbour.key);
            }
        }
        Ok(())
    }

    /// Lay out the text children of `parent` as consecutive lines.
    fn relayout_text(&mut self, parent: ElementId) -> Result<()> {
        let Some(element) = self.get(parent) else {
            return Ok(());
        };
        let (area, z, style) = match element.content {
            Content::Document => (Rect::EMPTY, 0, Style::default()),
            _ => (element.bounds, element.z, element.style),
        };
        let children = element.children.clone();

        let mut line = 0;
        for child in children {
            let Some(node) = self.get_mut(child).filter(|c| matches!(c.content, Content::Text(_)))
            else {
                continue;
            };
            let lines = node.text().map_or(1, |t| t.split('\n').count()) as i32;
            let bounds = Rect::new(area.x, area.y.saturating_add(line), area.width, lines)
                .intersect(&area);
            line += lines;

            if node.style != style {
                node.style = style;
                let current = node.bounds;
                self.dirty.mark_rect(current);
                self.dirty.elements.insert(child);
            }
            self.relocate(child, bounds, z)?;
        }
        Ok(())
    }

    // =========================================================================
    // Compositing
    // =========================================================================

    /// Paint everything dirty into the back buffer of `frame` and clear the
    /// dirty set.
    ///
    /// Dirty rectangles and the visible regions of dirty elements form the
    /// repaint mask. Masked cells are cleared, then every element touching
    /// the mask is painted once in paint order, clipped to the mask.
    ///
    /// # Errors
    ///
    /// Returns an error if the spatial index is out of sync.
    pub fn paint(&mut self, frame: &mut FrameBuffer) -> Result<PaintReport> {
        let mut mask = Mask::new(frame.area());
        for rect in &self.dirty.rects {
            mask.add(*rect);
        }
        for id in &self.dirty.elements {
            if !self.index.contains_key(id)
                || (self.skip_occluded && self.index.is_completely_occluded(id)?)
            {
                continue;
            }
            for piece in self.index.visible_region(id)?.unwrap_or_default() {
                mask.add(piece);
            }
        }
        self.dirty.clear();
        mask.complete_wide_glyphs(frame);

        let mut report = PaintReport::default();
        let Some(bbox) = mask.bbox else {
            return Ok(report);
        };
        for (x, y) in mask.cells() {
            frame.set_cell(x, y, Cell::default());
            report.cells += 1;
        }

        for entry in self.index.query(&bbox) {
            if !mask.touches(&entry.bounds) {
                continue;
            }
            if self.skip_occluded && self.index.is_completely_occluded(&entry.key)? {
                report.skipped.push(entry.key);
                continue;
            }
            if let Some(element) = self.get(entry.key) {
                paint_element(element, frame, &mask);
                report.painted.push(entry.key);
            }
        }

        debug!(
            painted = report.painted.len(),
            skipped = report.skipped.len(),
            cells = report.cells,
            "scene painted"
        );
        Ok(report)
    }
}

fn reject_fragment(path: &[usize], node: &SceneNode) -> Result<()> {
    if matches!(node, SceneNode::Fragment(_)) {
        return Err(StrataError::patch(path, "fragment payload"));
    }
    Ok(())
}

/// Background glyph of an element: the first character of `fill` if it is
/// one column wide.
fn fill_char(props: &Props) -> char {
    props
        .get(prop::FILL)
        .and_then(|value| value.as_str())
        .and_then(|s| s.chars().next())
        .filter(|&ch| UnicodeWidthChar::width(ch) == Some(1))
        .unwrap_or(' ')
}

fn paint_element(element: &RenderedElement, frame: &mut FrameBuffer, mask: &Mask) {
    let bounds = element.bounds;
    match &element.content {
        Content::Text(text) => {
            for (y, line) in (bounds.y..bounds.bottom()).zip(text.split('\n')) {
                paint_line(frame, mask, bounds, y, line, element.style);
            }
        }
        _ => {
            let cell = Cell::from_char(element.fill, element.style);
            for (x, y) in bounds.intersect(&mask.area).cells() {
                if mask.contains(x, y) {
                    frame.set_cell(x, y, cell.clone());
                }
            }
        }
    }
}

/// Write one text line into row `y` of `bounds`, padding the rest of the
/// row with blanks.
fn paint_line(
    frame: &mut FrameBuffer,
    mask: &Mask,
    bounds: Rect,
    y: i32,
    line: &str,
    style: Style,
) {
    let right = bounds.right().min(mask.area.right());
    let mut x = bounds.x;
    for ch in line.chars() {
        let width = UnicodeWidthChar::width(ch).unwrap_or(0) as i32;
        if width == 0 {
            continue;
        }
        if x >= right || x.saturating_add(width) > bounds.right() {
            break;
        }
        if width == 2 && !(mask.contains(x, y) && mask.contains(x + 1, y)) {
            // Half of a wide glyph is outside the mask.
            for column in x..x + 2 {
                if mask.contains(column, y) {
                    frame.set_cell(column, y, Cell::blank(style));
                }
            }
        } else if mask.contains(x, y) {
            frame.set_cell(x, y, Cell::from_char(ch, style));
        }
        x += width;
    }
    for column in x..right {
        if mask.contains(column, y) {
            frame.set_cell(column, y, Cell::blank(style));
        }
    }
}
