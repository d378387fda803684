//! Arena R-tree over z-ordered entries.
//!
//! Nodes live in a `Vec` and refer to each other by index. Leaves hold the
//! entries themselves; a key map gives O(1) access to an entry's current
//! bounds, which then steers the descent on removal.

use crate::error::SpatialError;
use std::cmp::{Ordering, Reverse};
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::ops::RangeBounds;
use strata_core::Rect;
use tracing::{trace, warn};

/// Requirements on keys stored in the index.
pub trait EntryKey: Copy + Eq + Hash + Debug {}

impl<T: Copy + Eq + Hash + Debug> EntryKey for T {}

/// Tree shape and validation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConfig {
    /// Maximum children per node before it splits
    pub max_fanout: usize,
    /// Minimum children per non-root node before it is dissolved
    pub min_fanout: usize,
    /// Run [`SpatialIndex::validate`] after every mutation
    pub validate_on_mutation: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_fanout: 8,
            min_fanout: 2,
            validate_on_mutation: cfg!(debug_assertions),
        }
    }
}

impl IndexConfig {
    /// Smallest usable maximum fanout.
    pub const MIN_MAX_FANOUT: usize = 4;

    /// True if `2 <= min_fanout <= max_fanout / 2`.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.max_fanout >= Self::MIN_MAX_FANOUT
            && self.min_fanout >= 2
            && self.min_fanout <= self.max_fanout / 2
    }

    fn normalized(self) -> Self {
        let max_fanout = self.max_fanout.max(Self::MIN_MAX_FANOUT);
        let min_fanout = self.min_fanout.clamp(2, max_fanout / 2);
        Self {
            max_fanout,
            min_fanout,
            validate_on_mutation: self.validate_on_mutation,
        }
    }
}

/// One indexed element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpatialEntry<K> {
    /// Caller's key
    pub key: K,
    /// Bounds on screen
    pub bounds: Rect,
    /// Stacking order
    pub z: i32,
    /// Tie-break sequence for equal z; insertion order unless reassigned
    /// with [`SpatialIndex::set_seq`], kept across updates
    pub seq: u64,
}

impl<K> SpatialEntry<K> {
    /// Paint position: z first, higher sequence on top.
    #[must_use]
    pub const fn stacking(&self) -> (i32, u64) {
        (self.z, self.seq)
    }

    /// True if this entry paints over `other`.
    #[must_use]
    pub fn is_above(&self, other: &Self) -> bool {
        self.stacking() > other.stacking()
    }
}

#[derive(Debug, Clone)]
enum Body<K> {
    Leaf(Vec<SpatialEntry<K>>),
    Internal(Vec<usize>),
}

impl<K> Body<K> {
    fn len(&self) -> usize {
        match self {
            Self::Leaf(entries) => entries.len(),
            Self::Internal(children) => children.len(),
        }
    }
}

#[derive(Debug, Clone)]
struct Node<K> {
    parent: Option<usize>,
    mbr: Rect,
    body: Body<K>,
}

impl<K> Node<K> {
    const fn empty_leaf() -> Self {
        Self {
            parent: None,
            mbr: Rect::EMPTY,
            body: Body::Leaf(Vec::new()),
        }
    }
}

/// R-tree of rectangles with z-order, keyed by `K`.
#[derive(Debug, Clone)]
pub struct SpatialIndex<K> {
    nodes: Vec<Option<Node<K>>>,
    free: Vec<usize>,
    root: usize,
    entries: HashMap<K, SpatialEntry<K>>,
    next_seq: u64,
    config: IndexConfig,
}

impl<K: EntryKey> Default for SpatialIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: EntryKey> SpatialIndex<K> {
    /// Create an empty index with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(IndexConfig::default())
    }

    /// Create an empty index. Out-of-range fanouts are clamped.
    #[must_use]
    pub fn with_config(config: IndexConfig) -> Self {
        let normalized = config.normalized();
        if normalized != config {
            warn!(?config, ?normalized, "adjusted spatial index fanout");
        }
        Self {
            nodes: vec![Some(Node::empty_leaf())],
            free: Vec::new(),
            root: 0,
            entries: HashMap::new(),
            next_seq: 0,
            config: normalized,
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Number of indexed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&SpatialEntry<K>> {
        self.entries.get(key)
    }

    /// True if `key` is indexed.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub(crate) fn entry(&self, key: &K) -> Result<SpatialEntry<K>, SpatialError> {
        self.entries
            .get(key)
            .copied()
            .ok_or_else(|| SpatialError::unknown(key))
    }

    /// All entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &SpatialEntry<K>> {
        self.entries.values()
    }

    /// All entries in paint order.
    #[must_use]
    pub fn paint_order(&self) -> Vec<SpatialEntry<K>> {
        let mut all: Vec<_> = self.entries.values().copied().collect();
        sort_paint(&mut all);
        all
    }

    /// Number of levels from the root to the leaves.
    #[must_use]
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut id = self.root;
        while let Body::Internal(children) = &self.node(id).body {
            match children.first() {
                Some(&child) => id = child,
                None => break,
            }
            height += 1;
        }
        height
    }

    /// Remove every entry. The sequence counter keeps running.
    pub fn clear(&mut self) {
        self.nodes = vec![Some(Node::empty_leaf())];
        self.free.clear();
        self.root = 0;
        self.entries.clear();
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Index a new entry.
    pub fn insert(&mut self, key: K, bounds: Rect, z: i32) -> Result<(), SpatialError> {
        if !bounds.is_valid() {
            return Err(SpatialError::InvalidBounds(bounds));
        }
        if self.entries.contains_key(&key) {
            return Err(SpatialError::duplicate(&key));
        }
        let entry = SpatialEntry {
            key,
            bounds,
            z,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.entries.insert(key, entry);
        self.insert_entry(entry);
        self.check_invariants("insert");
        Ok(())
    }

    /// Remove an entry, returning it.
    pub fn remove(&mut self, key: &K) -> Result<SpatialEntry<K>, SpatialError> {
        let entry = self.entry(key)?;
        let leaf = self.find_leaf(key, &entry.bounds).ok_or_else(|| {
            SpatialError::InvariantViolation(format!("{key:?} is not reachable from the root"))
        })?;
        if let Body::Leaf(entries) = &mut self.node_mut(leaf).body {
            entries.retain(|e| e.key != *key);
        }
        self.entries.remove(key);
        self.condense(leaf);
        self.check_invariants("remove");
        Ok(entry)
    }

    /// Move and/or restack an entry. A z-only change is done in place; a
    /// bounds change reinserts the entry under its original sequence number.
    pub fn update(&mut self, key: K, bounds: Rect, z: i32) -> Result<(), SpatialError> {
        let current = self.entry(&key)?;
        if !bounds.is_valid() {
            return Err(SpatialError::InvalidBounds(bounds));
        }
        if current.bounds == bounds {
            return if current.z == z {
                Ok(())
            } else {
                self.update_z_index(&key, z)
            };
        }
        self.remove(&key)?;
        let entry = SpatialEntry {
            bounds,
            z,
            ..current
        };
        self.entries.insert(key, entry);
        self.insert_entry(entry);
        self.check_invariants("update");
        Ok(())
    }

    /// Change only the z-index of an entry. The tree shape is untouched.
    pub fn update_z_index(&mut self, key: &K, z: i32) -> Result<(), SpatialError> {
        self.modify_in_place(key, |entry| entry.z = z)
    }

    /// Replace the tie-break sequence of an entry.
    ///
    /// Owners with an order of their own (a document order, say) use this
    /// so that equal z-indices stack by that order instead of by insertion.
    /// Sequence numbers should stay unique among live entries.
    pub fn set_seq(&mut self, key: &K, seq: u64) -> Result<(), SpatialError> {
        if self.entry(key)?.seq == seq {
            return Ok(());
        }
        self.next_seq = self.next_seq.max(seq.saturating_add(1));
        self.modify_in_place(key, |entry| entry.seq = seq)
    }

    fn modify_in_place(
        &mut self,
        key: &K,
        change: impl Fn(&mut SpatialEntry<K>),
    ) -> Result<(), SpatialError> {
        let bounds = self.entry(key)?.bounds;
        let leaf = self.find_leaf(key, &bounds).ok_or_else(|| {
            SpatialError::InvariantViolation(format!("{key:?} is not reachable from the root"))
        })?;
        if let Body::Leaf(entries) = &mut self.node_mut(leaf).body {
            for entry in entries.iter_mut().filter(|e| e.key == *key) {
                change(entry);
            }
        }
        if let Some(entry) = self.entries.get_mut(key) {
            change(entry);
        }
        Ok(())
    }

    /// Raise an entry above every other entry. Returns its new z-index.
    pub fn bring_to_front(&mut self, key: &K) -> Result<i32, SpatialError> {
        let entry = self.entry(key)?;
        let top = self.entries.values().filter(|e| e.key != *key).map(|e| e.z).max();
        match top {
            Some(top) if top >= entry.z => {
                let z = top.saturating_add(1);
                self.update_z_index(key, z)?;
                Ok(z)
            }
            _ => Ok(entry.z),
        }
    }

    /// Lower an entry below every other entry. Returns its new z-index.
    pub fn send_to_back(&mut self, key: &K) -> Result<i32, SpatialError> {
        let entry = self.entry(key)?;
        let bottom = self.entries.values().filter(|e| e.key != *key).map(|e| e.z).min();
        match bottom {
            Some(bottom) if bottom <= entry.z => {
                let z = bottom.saturating_sub(1);
                self.update_z_index(key, z)?;
                Ok(z)
            }
            _ => Ok(entry.z),
        }
    }

    /// Exchange the z-indices of two entries.
    pub fn swap_z_order(&mut self, a: &K, b: &K) -> Result<(), SpatialError> {
        let za = self.entry(a)?.z;
        let zb = self.entry(b)?.z;
        self.update_z_index(a, zb)?;
        self.update_z_index(b, za)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Entries intersecting `rect`, lowest first (paint order).
    #[must_use]
    pub fn query(&self, rect: &Rect) -> Vec<SpatialEntry<K>> {
        let mut hits = self.search(|mbr| mbr.intersects(rect), |e| e.bounds.intersects(rect));
        sort_paint(&mut hits);
        hits
    }

    /// Entries containing the cell `(x, y)`, topmost first (hit-test order).
    #[must_use]
    pub fn query_point(&self, x: i32, y: i32) -> Vec<SpatialEntry<K>> {
        let mut hits = self.search(
            |mbr| mbr.contains_point(x, y),
            |e| e.bounds.contains_point(x, y),
        );
        hits.sort_by_key(|e| Reverse(e.stacking()));
        hits
    }

    /// Entries whose z-index lies in `range`, in paint order.
    #[must_use]
    pub fn query_z_range<R: RangeBounds<i32>>(&self, range: R) -> Vec<SpatialEntry<K>> {
        let mut hits: Vec<_> = self
            .entries
            .values()
            .filter(|e| range.contains(&e.z))
            .copied()
            .collect();
        sort_paint(&mut hits);
        hits
    }

    /// Entries intersecting `rect` whose z-index lies in `range`, in paint
    /// order.
    #[must_use]
    pub fn query_in_z_range<R: RangeBounds<i32>>(
        &self,
        rect: &Rect,
        range: R,
    ) -> Vec<SpatialEntry<K>> {
        let mut hits = self.query(rect);
        hits.retain(|e| range.contains(&e.z));
        hits
    }

    fn search(
        &self,
        descend: impl Fn(&Rect) -> bool,
        hit: impl Fn(&SpatialEntry<K>) -> bool,
    ) -> Vec<SpatialEntry<K>> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if !descend(&node.mbr) {
                continue;
            }
            match &node.body {
                Body::Leaf(entries) => out.extend(entries.iter().filter(|e| hit(e)).copied()),
                Body::Internal(children) => stack.extend(children.iter().copied()),
            }
        }
        out
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Check MBR containment, parent links, fanout, equal leaf depth and
    /// that leaves and the key map hold exactly the same entries.
    pub fn validate(&self) -> Result<(), SpatialError> {
        let fail = |msg: String| Err(SpatialError::InvariantViolation(msg));
        let (min, max) = (self.config.min_fanout, self.config.max_fanout);

        let Some(Some(root)) = self.nodes.get(self.root) else {
            return fail(format!("root {} is dangling", self.root));
        };
        if root.parent.is_some() {
            return fail("root has a parent".to_string());
        }
        if matches!(&root.body, Body::Internal(children) if children.len() < 2) {
            return fail("internal root has fewer than two children".to_string());
        }

        let mut leaf_depth = None;
        let mut seen = HashSet::with_capacity(self.entries.len());
        let mut reachable = 0usize;
        let mut stack = vec![(self.root, 0usize)];

        while let Some((id, depth)) = stack.pop() {
            let Some(Some(node)) = self.nodes.get(id) else {
                return fail(format!("node {id} is dangling"));
            };
            reachable += 1;

            let count = node.body.len();
            if count > max {
                return fail(format!("node {id} holds {count} > {max} children"));
            }
            if id != self.root && count < min {
                return fail(format!("node {id} holds {count} < {min} children"));
            }

            match &node.body {
                Body::Leaf(entries) => {
                    match leaf_depth {
                        None => leaf_depth = Some(depth),
                        Some(expected) if expected != depth => {
                            return fail(format!("leaf {id} at depth {depth}, expected {expected}"));
                        }
                        Some(_) => {}
                    }
                    for entry in entries {
                        if !node.mbr.contains(&entry.bounds) {
                            return fail(format!("leaf {id} MBR misses {:?}", entry.key));
                        }
                        if !seen.insert(entry.key) {
                            return fail(format!("{:?} stored twice", entry.key));
                        }
                        if self.entries.get(&entry.key) != Some(entry) {
                            return fail(format!("{:?} differs from the key map", entry.key));
                        }
                    }
                }
                Body::Internal(children) => {
                    for &child_id in children {
                        let Some(Some(child)) = self.nodes.get(child_id) else {
                            return fail(format!("node {id} links dangling child {child_id}"));
                        };
                        if child.parent != Some(id) {
                            return fail(format!("node {child_id} has a stale parent link"));
                        }
                        if !node.mbr.contains(&child.mbr) {
                            return fail(format!("node {id} MBR misses child {child_id}"));
                        }
                        stack.push((child_id, depth + 1));
                    }
                }
            }
        }

        if seen.len() != self.entries.len() {
            return fail(format!(
                "{} entries in leaves, {} in the key map",
                seen.len(),
                self.entries.len()
            ));
        }
        let live = self.nodes.iter().filter(|n| n.is_some()).count();
        if live != reachable {
            return fail(format!("{live} live nodes, {reachable} reachable"));
        }
        Ok(())
    }

    fn check_invariants(&self, op: &str) {
        if self.config.validate_on_mutation {
            if let Err(err) = self.validate() {
                panic!("spatial index corrupted by {op}: {err}");
            }
        }
    }

    // =========================================================================
    // Tree maintenance
    // =========================================================================

    fn node(&self, id: usize) -> &Node<K> {
        match self.nodes.get(id) {
            Some(Some(node)) => node,
            _ => panic!("dangling node id {id}"),
        }
    }

    fn node_mut(&mut self, id: usize) -> &mut Node<K> {
        match self.nodes.get_mut(id) {
            Some(Some(node)) => node,
            _ => panic!("dangling node id {id}"),
        }
    }

    fn alloc(&mut self, node: Node<K>) -> usize {
        if let Some(id) = self.free.pop() {
            self.nodes[id] = Some(node);
            id
        } else {
            self.nodes.push(Some(node));
            self.nodes.len() - 1
        }
    }

    fn release(&mut self, id: usize) {
        self.nodes[id] = None;
        self.free.push(id);
    }

    fn compute_mbr(&self, id: usize) -> Rect {
        let rects: Vec<Rect> = match &self.node(id).body {
            Body::Leaf(entries) => entries.iter().map(|e| e.bounds).collect(),
            Body::Internal(children) => children.iter().map(|&c| self.node(c).mbr).collect(),
        };
        rects
            .into_iter()
            .reduce(|a, b| a.union(&b))
            .unwrap_or(Rect::EMPTY)
    }

    fn refresh_mbr(&mut self, id: usize) {
        let mbr = self.compute_mbr(id);
        self.node_mut(id).mbr = mbr;
    }

    fn insert_entry(&mut self, entry: SpatialEntry<K>) {
        let leaf = self.choose_leaf(&entry.bounds);
        if let Body::Leaf(entries) = &mut self.node_mut(leaf).body {
            entries.push(entry);
        }
        self.adjust_tree(leaf);
    }

    /// Descend along the child needing the least enlargement; ties go to
    /// the smaller child, then to the lower child index.
    fn choose_leaf(&self, bounds: &Rect) -> usize {
        let mut id = self.root;
        loop {
            let Body::Internal(children) = &self.node(id).body else {
                return id;
            };
            let best = children.iter().copied().min_by_key(|&child| {
                let mbr = self.node(child).mbr;
                (mbr.enlargement(bounds), mbr.area())
            });
            match best {
                Some(child) => id = child,
                None => return id,
            }
        }
    }

    fn find_leaf(&self, key: &K, bounds: &Rect) -> Option<usize> {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if !node.mbr.contains(bounds) {
                continue;
            }
            match &node.body {
                Body::Leaf(entries) => {
                    if entries.iter().any(|e| e.key == *key) {
                        return Some(id);
                    }
                }
                Body::Internal(children) => stack.extend(children.iter().copied()),
            }
        }
        None
    }

    /// Walk from `start` to the root, splitting overflowing nodes and
    /// refreshing MBRs.
    fn adjust_tree(&mut self, start: usize) {
        let mut id = start;
        loop {
            let sibling = (self.node(id).body.len() > self.config.max_fanout).then(|| self.split(id));
            self.refresh_mbr(id);

            let Some(parent) = self.node(id).parent else {
                if let Some(sibling) = sibling {
                    self.grow_root(id, sibling);
                }
                return;
            };
            if let Some(sibling) = sibling {
                self.node_mut(sibling).parent = Some(parent);
                if let Body::Internal(children) = &mut self.node_mut(parent).body {
                    children.push(sibling);
                }
            }
            id = parent;
        }
    }

    fn grow_root(&mut self, left: usize, right: usize) {
        let root = self.alloc(Node {
            parent: None,
            mbr: Rect::EMPTY,
            body: Body::Internal(vec![left, right]),
        });
        self.node_mut(left).parent = Some(root);
        self.node_mut(right).parent = Some(root);
        self.root = root;
        self.refresh_mbr(root);
        trace!(root, height = self.height(), "grew spatial index root");
    }

    /// Split an overflowing node in two; returns the new sibling.
    fn split(&mut self, id: usize) -> usize {
        let min_fill = self.config.min_fanout;
        let parent = self.node(id).parent;
        let body = std::mem::replace(&mut self.node_mut(id).body, Body::Internal(Vec::new()));

        let (kept, moved) = match body {
            Body::Leaf(entries) => {
                let rects: Vec<Rect> = entries.iter().map(|e| e.bounds).collect();
                let (a, b) = quadratic_split(&rects, min_fill);
                (Body::Leaf(pick(&entries, &a)), Body::Leaf(pick(&entries, &b)))
            }
            Body::Internal(children) => {
                let rects: Vec<Rect> = children.iter().map(|&c| self.node(c).mbr).collect();
                let (a, b) = quadratic_split(&rects, min_fill);
                (
                    Body::Internal(pick(&children, &a)),
                    Body::Internal(pick(&children, &b)),
                )
            }
        };

        let moved_children = match &moved {
            Body::Internal(children) => children.clone(),
            Body::Leaf(_) => Vec::new(),
        };
        self.node_mut(id).body = kept;
        let sibling = self.alloc(Node {
            parent,
            mbr: Rect::EMPTY,
            body: moved,
        });
        for child in moved_children {
            self.node_mut(child).parent = Some(sibling);
        }
        self.refresh_mbr(id);
        self.refresh_mbr(sibling);
        trace!(node = id, sibling, "split spatial index node");
        sibling
    }

    /// Dissolve underflowing nodes on the path from `leaf` to the root,
    /// reinsert their entries and shrink the root.
    fn condense(&mut self, leaf: usize) {
        let mut orphans = Vec::new();
        let mut id = leaf;
        while let Some(parent) = self.node(id).parent {
            if self.node(id).body.len() < self.config.min_fanout {
                if let Body::Internal(children) = &mut self.node_mut(parent).body {
                    children.retain(|&c| c != id);
                }
                self.dissolve(id, &mut orphans);
            } else {
                self.refresh_mbr(id);
            }
            id = parent;
        }
        self.refresh_mbr(self.root);
        self.shrink_root();

        if !orphans.is_empty() {
            trace!(count = orphans.len(), "reinserting orphaned entries");
        }
        for entry in orphans {
            self.insert_entry(entry);
        }
    }

    fn dissolve(&mut self, id: usize, orphans: &mut Vec<SpatialEntry<K>>) {
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let Some(node) = self.nodes.get_mut(next).and_then(Option::take) else {
                continue;
            };
            self.free.push(next);
            match node.body {
                Body::Leaf(entries) => orphans.extend(entries),
                Body::Internal(children) => stack.extend(children),
            }
        }
    }

    fn shrink_root(&mut self) {
        loop {
            let children = match &self.node(self.root).body {
                Body::Internal(children) => children.clone(),
                Body::Leaf(_) => return,
            };
            match children.as_slice() {
                [] => {
                    let root = self.root;
                    *self.node_mut(root) = Node::empty_leaf();
                    return;
                }
                [only] => {
                    let old = self.root;
                    self.root = *only;
                    self.node_mut(*only).parent = None;
                    self.release(old);
                }
                _ => return,
            }
        }
    }
}

fn sort_paint<K>(entries: &mut [SpatialEntry<K>]) {
    entries.sort_by_key(SpatialEntry::stacking);
}

fn pick<T: Copy>(items: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| items[i]).collect()
}

/// Pick the pair wasting the most area if grouped together.
fn pick_seeds(rects: &[Rect]) -> (usize, usize) {
    let mut best = (0, 1);
    let mut worst_waste = i64::MIN;
    for i in 0..rects.len() {
        for j in i + 1..rects.len() {
            let waste = rects[i].union(&rects[j]).area() - rects[i].area() - rects[j].area();
            if waste > worst_waste {
                worst_waste = waste;
                best = (i, j);
            }
        }
    }
    best
}

/// Guttman's quadratic split. Both groups receive at least `min_fill`
/// items as long as `rects.len() >= 2 * min_fill`.
fn quadratic_split(rects: &[Rect], min_fill: usize) -> (Vec<usize>, Vec<usize>) {
    let (seed_a, seed_b) = pick_seeds(rects);
    let mut group_a = vec![seed_a];
    let mut group_b = vec![seed_b];
    let mut mbr_a = rects[seed_a];
    let mut mbr_b = rects[seed_b];
    let mut rest: Vec<usize> = (0..rects.len())
        .filter(|&i| i != seed_a && i != seed_b)
        .collect();

    while !rest.is_empty() {
        if group_a.len() + rest.len() <= min_fill {
            group_a.append(&mut rest);
            break;
        }
        if group_b.len() + rest.len() <= min_fill {
            group_b.append(&mut rest);
            break;
        }

        // Assign the item with the strongest preference first.
        let mut chosen = 0;
        let mut strongest = -1;
        for (pos, &i) in rest.iter().enumerate() {
            let preference = (mbr_a.enlargement(&rects[i]) - mbr_b.enlargement(&rects[i])).abs();
            if preference > strongest {
                strongest = preference;
                chosen = pos;
            }
        }
        let i = rest.remove(chosen);

        let to_a = match mbr_a
            .enlargement(&rects[i])
            .cmp(&mbr_b.enlargement(&rects[i]))
        {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => match mbr_a.area().cmp(&mbr_b.area()) {
                Ordering::Less => true,
                Ordering::Greater => false,
                Ordering::Equal => group_a.len() <= group_b.len(),
            },
        };
        if to_a {
            group_a.push(i);
            mbr_a = mbr_a.union(&rects[i]);
        } else {
            group_b.push(i);
            mbr_b = mbr_b.union(&rects[i]);
        }
    }
    (group_a, group_b)
}
