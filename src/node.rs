//! The node model.
//!
//! A [`Node`] is the only entity in a tree: a tag, an ordered attribute map
//! and an ordered list of children. Nodes are built once by the builder and
//! never mutated afterwards, so the type only exposes read access.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Number;

/// Tag used for provisional nodes handed to components and for wrapping
/// primitive component results. Rendered transparently in HTML.
pub const FRAGMENT: &str = "fragment";

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A finished tree element. The tag is always a literal, non-empty name.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    tag: String,
    attributes: Props,
    children: Vec<Child>,
}

impl Node {
    pub(crate) fn new(tag: String, attributes: Props, children: Vec<Child>) -> Self {
        debug_assert!(!tag.is_empty(), "node tag must not be empty");
        Self {
            tag,
            attributes,
            children,
        }
    }

    /// A `fragment` node carrying the given attributes and children.
    pub fn fragment(attributes: Props, children: Vec<Child>) -> Self {
        Self::new(FRAGMENT.to_string(), attributes, children)
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attributes(&self) -> &Props {
        &self.attributes
    }

    pub fn children(&self) -> &[Child] {
        &self.children
    }

    /// Shortcut for `self.attributes().get(name)`.
    pub fn attribute(&self, name: &str) -> Option<&PropValue> {
        self.attributes.get(name)
    }

    pub fn is_fragment(&self) -> bool {
        self.tag == FRAGMENT
    }

    /// Take the node apart. Components use this to forward what they
    /// received into a node of their own.
    pub fn into_parts(self) -> (String, Props, Vec<Child>) {
        (self.tag, self.attributes, self.children)
    }
}

// ---------------------------------------------------------------------------
// Children
// ---------------------------------------------------------------------------

/// One entry of a node's children.
#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    Node(Node),
    /// Plain text, escaped on output.
    Text(String),
    /// Pre-escaped markup, written verbatim.
    Raw(Markup),
    /// A nested sequence that survived the single level of flattening.
    List(Vec<Child>),
}

impl Child {
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Child::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Child::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<Node> for Child {
    fn from(node: Node) -> Self {
        Child::Node(node)
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Text(text.to_string())
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Child::Text(text)
    }
}

impl From<&String> for Child {
    fn from(text: &String) -> Self {
        Child::Text(text.clone())
    }
}

impl From<Markup> for Child {
    fn from(markup: Markup) -> Self {
        Child::Raw(markup)
    }
}

impl<T: Into<Child>> From<Vec<T>> for Child {
    fn from(items: Vec<T>) -> Self {
        Child::List(items.into_iter().map(Into::into).collect())
    }
}

/// Markup that is trusted and must not be escaped (style blocks, import
/// maps, inline scripts).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markup(String);

impl Markup {
    pub fn new(markup: impl Into<String>) -> Self {
        Self(markup.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

/// Ordered attribute map. Keys are unique; re-inserting a key replaces the
/// value but keeps the original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props(IndexMap<String, PropValue>);

impl Props {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PropValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Merge `other` into `self`; keys from `other` win.
    pub fn merge(&mut self, other: Props) {
        for (key, value) in other.0 {
            self.0.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<PropValue>> FromIterator<(K, V)> for Props {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = Props::new();
        for (key, value) in iter {
            props.insert(key, value);
        }
        props
    }
}

impl IntoIterator for Props {
    type Item = (String, PropValue);
    type IntoIter = indexmap::map::IntoIter<String, PropValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Build a [`Props`] map: `props! { "class" => "main", "hidden" => true }`.
#[macro_export]
macro_rules! props {
    () => {
        $crate::Props::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut props = $crate::Props::new();
        $(props.insert($key, $value);)+
        props
    }};
}

/// An attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    /// Deliberately empty. Omitted from HTML, kept as `null` in payloads.
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    /// Nested property bag, e.g. island props.
    Map(Props),
    /// Not JSON-safe; both serializers reject it.
    Handler(Handler),
}

impl PropValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PropValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        PropValue::String(s.to_string())
    }
}

impl From<String> for PropValue {
    fn from(s: String) -> Self {
        PropValue::String(s)
    }
}

impl From<&String> for PropValue {
    fn from(s: &String) -> Self {
        PropValue::String(s.clone())
    }
}

impl From<bool> for PropValue {
    fn from(b: bool) -> Self {
        PropValue::Bool(b)
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {
        $(impl From<$ty> for PropValue {
            fn from(n: $ty) -> Self {
                PropValue::Number(Number::from(n))
            }
        })*
    };
}

impl_from_integer!(i32, i64, u32, u64, usize);

impl From<f64> for PropValue {
    /// Non-finite floats have no JSON form and become `Null`.
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(PropValue::Null, PropValue::Number)
    }
}

impl From<Props> for PropValue {
    fn from(props: Props) -> Self {
        PropValue::Map(props)
    }
}

impl From<Handler> for PropValue {
    fn from(handler: Handler) -> Self {
        PropValue::Handler(handler)
    }
}

impl<T: Into<PropValue>> From<Option<T>> for PropValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(PropValue::Null, Into::into)
    }
}

/// A callable placed in an attribute bag. It can be carried by a tree but
/// never serialized.
#[derive(Clone)]
pub struct Handler {
    name: String,
    func: Arc<dyn Fn() + Send + Sync>,
}

impl Handler {
    pub fn new(name: impl Into<String>, func: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").field("name", &self.name).finish()
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}
