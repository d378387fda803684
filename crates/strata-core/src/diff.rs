//! Scene tree diffing.
//!
//! Compares two [`SceneNode`] trees and produces the ordered list of
//! [`Patch`]es that turns the old tree into the new one.
//!
//! # Algorithm
//!
//! The diff runs depth-first from an implicit document node at path `[]`.
//! The scene root (or the flattened children of a root fragment) are its
//! children, so a tree's first top-level node lives at `[0]`.
//!
//! 1. **Matching**: children are matched by key when every child on both
//!    sides carries a key and the keys are unique on each side; otherwise
//!    they are matched by position.
//! 2. **Reconciliation**: nodes of a different kind or tag are replaced
//!    wholesale. Same-typed nodes get a text or prop update, then their
//!    children are reconciled.
//!
//! Patches must be applied strictly in the order they are returned. Child
//! indices in a patch always refer to the list as it looks after all
//! preceding patches have been applied.

use crate::scene::{flatten, PropValue, Props, SceneNode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A change to a single prop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropChange {
    /// Set the prop to a new value
    Set(PropValue),
    /// Remove the prop
    Remove,
}

/// Prop changes keyed by prop name. Absent names are unchanged.
pub type PropDelta = BTreeMap<String, PropChange>;

/// One edit to apply to the rendered scene.
///
/// `Insert`, `Remove`, `Move` and `Reorder` address the parent's path; the
/// other variants address the node itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Patch {
    /// Replace the node and its whole subtree
    Replace {
        /// Path to the node
        path: Vec<usize>,
        /// New subtree
        node: SceneNode,
    },
    /// Change some props of an element or component
    UpdateProps {
        /// Path to the node
        path: Vec<usize>,
        /// Changed props only
        changes: PropDelta,
    },
    /// Change the content of a text node
    UpdateText {
        /// Path to the node
        path: Vec<usize>,
        /// New content
        text: String,
    },
    /// Insert a subtree as a child
    Insert {
        /// Path to the parent
        path: Vec<usize>,
        /// Position in the parent's children
        index: usize,
        /// Subtree to insert
        node: SceneNode,
    },
    /// Remove a child and its subtree
    Remove {
        /// Path to the parent
        path: Vec<usize>,
        /// Position in the parent's children
        index: usize,
    },
    /// Move one child to another position
    Move {
        /// Path to the parent
        path: Vec<usize>,
        /// Current position
        from: usize,
        /// Position after the move
        to: usize,
    },
    /// Permute the parent's children: `permutation[new_pos] = old_pos`
    Reorder {
        /// Path to the parent
        path: Vec<usize>,
        /// Full-length permutation of the child list
        permutation: Vec<usize>,
    },
}

impl Patch {
    /// The path this patch is addressed to.
    #[must_use]
    pub fn path(&self) -> &[usize] {
        match self {
            Self::Replace { path, .. }
            | Self::UpdateProps { path, .. }
            | Self::UpdateText { path, .. }
            | Self::Insert { path, .. }
            | Self::Remove { path, .. }
            | Self::Move { path, .. }
            | Self::Reorder { path, .. } => path,
        }
    }

    /// True for patches that change a parent's child list.
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Insert { .. } | Self::Remove { .. } | Self::Move { .. } | Self::Reorder { .. }
        )
    }
}

/// Shallow prop delta between two prop maps.
#[must_use]
pub fn prop_delta(old: &Props, new: &Props) -> PropDelta {
    let mut delta = PropDelta::new();
    for (name, value) in new {
        if old.get(name) != Some(value) {
            delta.insert(name.clone(), PropChange::Set(value.clone()));
        }
    }
    for name in old.keys() {
        if !new.contains_key(name) {
            delta.insert(name.clone(), PropChange::Remove);
        }
    }
    delta
}

/// Scene tree differ.
#[derive(Debug, Default)]
pub struct TreeDiffer {
    /// Current path during traversal
    current_path: Vec<usize>,
}

impl TreeDiffer {
    /// Create a new tree differ.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the patches that turn `old` into `new`.
    #[must_use]
    pub fn diff(&mut self, old: Option<&SceneNode>, new: Option<&SceneNode>) -> Vec<Patch> {
        let mut patches = Vec::new();
        self.current_path.clear();
        if let (Some(a), Some(b)) = (old, new) {
            if std::ptr::eq(a, b) {
                return patches;
            }
        }
        let old_top = top_level(old);
        let new_top = top_level(new);
        self.diff_children(&old_top, &new_top, &mut patches);
        patches
    }

    fn path_to(&self, index: usize) -> Vec<usize> {
        let mut path = self.current_path.clone();
        path.push(index);
        path
    }

    fn diff_node(&mut self, old: &SceneNode, new: &SceneNode, patches: &mut Vec<Patch>) {
        if std::ptr::eq(old, new) {
            return;
        }
        if !old.same_type(new) {
            patches.push(Patch::Replace {
                path: self.current_path.clone(),
                node: new.clone(),
            });
            return;
        }

        match (old, new) {
            (SceneNode::Text(a), SceneNode::Text(b)) => {
                if a != b {
                    patches.push(Patch::UpdateText {
                        path: self.current_path.clone(),
                        text: b.clone(),
                    });
                }
            }
            (SceneNode::Element(a), SceneNode::Element(b)) => {
                self.diff_props(&a.props, &b.props, patches);
                let old_children = flatten(&a.children);
                let new_children = flatten(&b.children);
                self.diff_children(&old_children, &new_children, patches);
            }
            (SceneNode::Component(a), SceneNode::Component(b)) => {
                self.diff_props(&a.props, &b.props, patches);
            }
            // Fragments never reach here: children are flattened first.
            _ => {}
        }
    }

    fn diff_props(&self, old: &Props, new: &Props, patches: &mut Vec<Patch>) {
        let changes = prop_delta(old, new);
        if !changes.is_empty() {
            patches.push(Patch::UpdateProps {
                path: self.current_path.clone(),
                changes,
            });
        }
    }

    fn diff_children(
        &mut self,
        old_children: &[&SceneNode],
        new_children: &[&SceneNode],
        patches: &mut Vec<Patch>,
    ) {
        match (unique_keys(old_children), unique_keys(new_children)) {
            (Some(old_keys), Some(new_keys)) => {
                self.diff_keyed(old_children, &old_keys, new_children, &new_keys, patches);
            }
            _ => self.diff_positional(old_children, new_children, patches),
        }
    }

    fn diff_positional(
        &mut self,
        old_children: &[&SceneNode],
        new_children: &[&SceneNode],
        patches: &mut Vec<Patch>,
    ) {
        for (i, (old, new)) in old_children.iter().zip(new_children).enumerate() {
            self.current_path.push(i);
            self.diff_node(old, new, patches);
            self.current_path.pop();
        }

        for (i, new) in new_children.iter().enumerate().skip(old_children.len()) {
            patches.push(Patch::Insert {
                path: self.current_path.clone(),
                index: i,
                node: (*new).clone(),
            });
        }

        for i in (new_children.len()..old_children.len()).rev() {
            patches.push(Patch::Remove {
                path: self.current_path.clone(),
                index: i,
            });
        }
    }

    fn diff_keyed(
        &mut self,
        old_children: &[&SceneNode],
        old_keys: &[&str],
        new_children: &[&SceneNode],
        new_keys: &[&str],
        patches: &mut Vec<Patch>,
    ) {
        let new_index: HashMap<&str, usize> =
            new_keys.iter().enumerate().map(|(i, k)| (*k, i)).collect();
        let old_index: HashMap<&str, usize> =
            old_keys.iter().enumerate().map(|(i, k)| (*k, i)).collect();

        // Phase 1: remove keys that are gone, highest index first
        for (i, key) in old_keys.iter().enumerate().rev() {
            if !new_index.contains_key(key) {
                patches.push(Patch::Remove {
                    path: self.current_path.clone(),
                    index: i,
                });
            }
        }

        // Phase 2: bring the kept children into their new relative order
        let kept_old: Vec<&str> = old_keys
            .iter()
            .copied()
            .filter(|k| new_index.contains_key(k))
            .collect();
        let kept_pos: HashMap<&str, usize> =
            kept_old.iter().enumerate().map(|(i, k)| (*k, i)).collect();
        let permutation: Vec<usize> = new_keys
            .iter()
            .filter_map(|k| kept_pos.get(k).copied())
            .collect();
        self.emit_reorders(&permutation, patches);

        // Phase 3: insert new keys at their final position
        for (i, key) in new_keys.iter().enumerate() {
            if !old_index.contains_key(key) {
                patches.push(Patch::Insert {
                    path: self.current_path.clone(),
                    index: i,
                    node: new_children[i].clone(),
                });
            }
        }

        // Phase 4: diff kept children in place
        for (i, key) in new_keys.iter().enumerate() {
            if let Some(&old_i) = old_index.get(key) {
                self.current_path.push(i);
                self.diff_node(old_children[old_i], new_children[i], patches);
                self.current_path.pop();
            }
        }
    }

    /// Split `permutation` into independent blocks and emit one `Move` per
    /// swapped pair and one `Reorder` per larger block.
    fn emit_reorders(&self, permutation: &[usize], patches: &mut Vec<Patch>) {
        let mut start = 0;
        let mut reach = 0;
        for (i, &p) in permutation.iter().enumerate() {
            reach = reach.max(p);
            if reach != i {
                continue;
            }
            match i - start {
                0 => {}
                1 => patches.push(Patch::Move {
                    path: self.current_path.clone(),
                    from: i,
                    to: start,
                }),
                _ => {
                    let mut block: Vec<usize> = (0..permutation.len()).collect();
                    block[start..=i].copy_from_slice(&permutation[start..=i]);
                    patches.push(Patch::Reorder {
                        path: self.current_path.clone(),
                        permutation: block,
                    });
                }
            }
            start = i + 1;
        }
    }
}

/// Top-level nodes under the document root.
fn top_level(root: Option<&SceneNode>) -> Vec<&SceneNode> {
    root.map_or_else(Vec::new, |node| flatten(std::slice::from_ref(node)))
}

/// Keys of all children if every child is keyed and no key repeats.
fn unique_keys<'a>(children: &[&'a SceneNode]) -> Option<Vec<&'a str>> {
    let mut seen = HashSet::with_capacity(children.len());
    children
        .iter()
        .map(|&child| child.key().filter(|key| seen.insert(*key)))
        .collect()
}

/// Convenience function to diff two trees.
#[must_use]
pub fn diff_trees(old: Option<&SceneNode>, new: Option<&SceneNode>) -> Vec<Patch> {
    let mut differ = TreeDiffer::new();
    differ.diff(old, new)
}
