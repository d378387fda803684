//! Immutable scene trees.
//!
//! A [`SceneNode`] tree is produced by the component layer on every state
//! change and handed to the differ. Layout has already happened upstream:
//! element and component nodes carry their absolute bounds and z-index as
//! ordinary props (see [`prop`]).

use crate::geometry::Rect;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known prop names.
pub mod prop {
    /// Absolute column of the left edge.
    pub const X: &str = "x";
    /// Absolute row of the top edge.
    pub const Y: &str = "y";
    /// Width in cells.
    pub const WIDTH: &str = "width";
    /// Height in cells.
    pub const HEIGHT: &str = "height";
    /// Stacking order; higher paints on top.
    pub const Z: &str = "z";
    /// Foreground color.
    pub const FG: &str = "fg";
    /// Background color.
    pub const BG: &str = "bg";
    /// Bold text.
    pub const BOLD: &str = "bold";
    /// Italic text.
    pub const ITALIC: &str = "italic";
    /// Underlined text.
    pub const UNDERLINE: &str = "underline";
    /// Dim text.
    pub const DIM: &str = "dim";
    /// Reversed colors.
    pub const REVERSE: &str = "reverse";
    /// Glyph used to fill the element's bounds.
    pub const FILL: &str = "fill";
}

/// A single prop value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    /// Explicit null
    Null,
    /// Boolean flag
    Bool(bool),
    /// Integer
    Int(i64),
    /// String
    Str(String),
}

impl PropValue {
    /// Integer value, if this is an `Int`.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Boolean value, if this is a `Bool`.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// String value, if this is a `Str`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for PropValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for PropValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// Ordered prop map.
pub type Props = BTreeMap<String, PropValue>;

fn int_prop(props: &Props, name: &str) -> i32 {
    props
        .get(name)
        .and_then(PropValue::as_int)
        .map_or(0, |v| v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
}

/// Bounds attached by the layout pass. Missing values are 0, negative
/// sizes are clamped to 0 and sizes are cut so the far edges fit in `i32`.
#[must_use]
pub fn layout_bounds(props: &Props) -> Rect {
    let x = int_prop(props, prop::X);
    let y = int_prop(props, prop::Y);
    Rect::new(
        x,
        y,
        int_prop(props, prop::WIDTH).clamp(0, i32::MAX.saturating_sub(x)),
        int_prop(props, prop::HEIGHT).clamp(0, i32::MAX.saturating_sub(y)),
    )
}

/// Z-index attached by the layout pass (0 when missing).
#[must_use]
pub fn layout_z(props: &Props) -> i32 {
    int_prop(props, prop::Z)
}

/// An element node: tag, props, children and an optional sibling key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementNode {
    /// Element tag
    pub tag: String,
    /// Props, including layout output
    pub props: Props,
    /// Child nodes
    pub children: Vec<SceneNode>,
    /// Optional key for matching across renders
    pub key: Option<String>,
}

/// A component placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentNode {
    /// Component kind
    pub kind: String,
    /// Props, including layout output
    pub props: Props,
}

/// The discriminant of a [`SceneNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Text leaf
    Text,
    /// Element
    Element,
    /// Transparent grouping
    Fragment,
    /// Component placeholder
    Component,
}

/// One node of an immutable scene tree.
///
/// `Clone` is a deep copy; trees never share mutable state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SceneNode {
    /// Text leaf
    Text(String),
    /// Element with props and children
    Element(ElementNode),
    /// Transparent grouping, flattened into the parent's children
    Fragment(Vec<SceneNode>),
    /// Component placeholder
    Component(ComponentNode),
}

impl SceneNode {
    /// Create a text leaf.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    /// Create an element with no props or children.
    #[must_use]
    pub fn element(tag: impl Into<String>) -> Self {
        Self::Element(ElementNode {
            tag: tag.into(),
            props: Props::new(),
            children: Vec::new(),
            key: None,
        })
    }

    /// Create a fragment.
    #[must_use]
    pub fn fragment(children: Vec<Self>) -> Self {
        Self::Fragment(children)
    }

    /// Create a component placeholder with no props.
    #[must_use]
    pub fn component(kind: impl Into<String>) -> Self {
        Self::Component(ComponentNode {
            kind: kind.into(),
            props: Props::new(),
        })
    }

    /// Set a prop. No-op on text and fragment nodes.
    #[must_use]
    pub fn with_prop(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        if let Some(props) = self.props_mut() {
            props.insert(name.into(), value.into());
        }
        self
    }

    /// Set the layout bounds props.
    #[must_use]
    pub fn with_bounds(self, bounds: Rect) -> Self {
        self.with_prop(prop::X, bounds.x)
            .with_prop(prop::Y, bounds.y)
            .with_prop(prop::WIDTH, bounds.width)
            .with_prop(prop::HEIGHT, bounds.height)
    }

    /// Set the z-index prop.
    #[must_use]
    pub fn with_z(self, z: i32) -> Self {
        self.with_prop(prop::Z, z)
    }

    /// Set the key. Only elements carry keys.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        if let Self::Element(el) = &mut self {
            el.key = Some(key.into());
        }
        self
    }

    /// Add a child node with fluent API. Only elements and fragments have
    /// children.
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        match &mut self {
            Self::Element(el) => el.children.push(child),
            Self::Fragment(children) => children.push(child),
            Self::Text(_) | Self::Component(_) => {}
        }
        self
    }

    /// Add several children.
    #[must_use]
    pub fn with_children(self, children: impl IntoIterator<Item = Self>) -> Self {
        children.into_iter().fold(self, Self::with_child)
    }

    /// Node discriminant.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Text(_) => NodeKind::Text,
            Self::Element(_) => NodeKind::Element,
            Self::Fragment(_) => NodeKind::Fragment,
            Self::Component(_) => NodeKind::Component,
        }
    }

    /// Sibling key, if any.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Element(el) => el.key.as_deref(),
            _ => None,
        }
    }

    /// Props of elements and components.
    #[must_use]
    pub const fn props(&self) -> Option<&Props> {
        match self {
            Self::Element(el) => Some(&el.props),
            Self::Component(c) => Some(&c.props),
            Self::Text(_) | Self::Fragment(_) => None,
        }
    }

    fn props_mut(&mut self) -> Option<&mut Props> {
        match self {
            Self::Element(el) => Some(&mut el.props),
            Self::Component(c) => Some(&mut c.props),
            Self::Text(_) | Self::Fragment(_) => None,
        }
    }

    /// Direct children, before fragment flattening.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        match self {
            Self::Element(el) => &el.children,
            Self::Fragment(children) => children,
            Self::Text(_) | Self::Component(_) => &[],
        }
    }

    /// Children with nested fragments spliced in place.
    #[must_use]
    pub fn flattened_children(&self) -> Vec<&Self> {
        flatten(self.children())
    }

    /// True if both nodes are the same kind and, for elements and
    /// components, the same tag. Only such pairs are diffed in place.
    #[must_use]
    pub fn same_type(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(_), Self::Text(_)) | (Self::Fragment(_), Self::Fragment(_)) => true,
            (Self::Element(a), Self::Element(b)) => a.tag == b.tag,
            (Self::Component(a), Self::Component(b)) => a.kind == b.kind,
            _ => false,
        }
    }

    /// Number of non-fragment nodes in this subtree.
    #[must_use]
    pub fn node_count(&self) -> usize {
        let own = usize::from(!matches!(self, Self::Fragment(_)));
        own + self.children().iter().map(Self::node_count).sum::<usize>()
    }
}

/// Splice fragments into a flat sibling list.
#[must_use]
pub fn flatten(nodes: &[SceneNode]) -> Vec<&SceneNode> {
    let mut out = Vec::with_capacity(nodes.len());
    flatten_into(nodes, &mut out);
    out
}

fn flatten_into<'a>(nodes: &'a [SceneNode], out: &mut Vec<&'a SceneNode>) {
    for node in nodes {
        match node {
            SceneNode::Fragment(children) => flatten_into(children, out),
            other => out.push(other),
        }
    }
}
