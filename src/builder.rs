//! Tree construction.
//!
//! [`h`] (and the variadic [`h!`](crate::h!) macro) turn a tag and a list of
//! heterogeneous arguments into a [`Node`]. Construction happens in two
//! passes: every argument is first classified into attributes or children,
//! then either a literal node is assembled or the component is expanded.
//!
//! Component expansion is tracked on a per-thread stack. Components usually
//! build their output with `h!` themselves, so the stack spans nested calls
//! and the outermost builder's depth limit applies to the whole expansion.

use std::cell::RefCell;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::component::{ComponentInput, IntoTag, Tag};
use crate::node::{Child, Markup, Node, Props};
use crate::{Result, StrikeError};

/// Expansion depth used by [`h`] and `Builder::default()`.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// `name`, then any run of `#id` / `.class` suffixes.
static TAG_SHORTHAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9-]*)?((?:[#.][^#.\s]+)*)$").expect("valid tag regex")
});

static TAG_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]*$").expect("valid tag name regex"));

static SHORTHAND_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([#.])([^#.\s]+)").expect("valid shorthand regex"));

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

/// One builder argument after conversion, before classification.
#[derive(Debug)]
pub enum Arg {
    /// An attribute bag; merged, last wins.
    Props(Props),
    /// A single child.
    Child(Child),
    /// A list argument; contributes each element as its own child.
    Children(Vec<Child>),
    /// A nested build that already failed.
    Failed(StrikeError),
}

impl From<Props> for Arg {
    fn from(props: Props) -> Self {
        Arg::Props(props)
    }
}

impl From<Child> for Arg {
    fn from(child: Child) -> Self {
        Arg::Child(child)
    }
}

impl From<Node> for Arg {
    fn from(node: Node) -> Self {
        Arg::Child(Child::Node(node))
    }
}

impl From<&str> for Arg {
    fn from(text: &str) -> Self {
        Arg::Child(text.into())
    }
}

impl From<String> for Arg {
    fn from(text: String) -> Self {
        Arg::Child(text.into())
    }
}

impl From<&String> for Arg {
    fn from(text: &String) -> Self {
        Arg::Child(text.into())
    }
}

impl From<Markup> for Arg {
    fn from(markup: Markup) -> Self {
        Arg::Child(markup.into())
    }
}

impl<T: Into<Child>> From<Vec<T>> for Arg {
    fn from(items: Vec<T>) -> Self {
        Arg::Children(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Arg>> From<Result<T>> for Arg {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => value.into(),
            Err(err) => Arg::Failed(err),
        }
    }
}

/// Arguments sorted into the node record.
#[derive(Debug, Default)]
struct Classified {
    attributes: Props,
    children: Vec<Child>,
}

fn classify(args: impl IntoIterator<Item = Arg>) -> Result<Classified> {
    let mut out = Classified::default();
    for arg in args {
        match arg {
            Arg::Props(props) => out.attributes.merge(props),
            Arg::Child(child) => out.children.push(child),
            Arg::Children(children) => out.children.extend(children),
            Arg::Failed(err) => return Err(err),
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tag shorthand
// ---------------------------------------------------------------------------

/// Whether `tag` is a plain element name, the name part [`parse_tag`]
/// accepts.
pub fn is_valid_tag_name(tag: &str) -> bool {
    TAG_NAME.is_match(tag)
}

/// Split `div#main.col.wide` into the element name and its shorthand
/// attributes (`id`, then a space-joined `class`). A bare shorthand such as
/// `.note` defaults to `div`.
pub fn parse_tag(raw: &str) -> Result<(String, Props)> {
    let caps = TAG_SHORTHAND
        .captures(raw)
        .ok_or_else(|| StrikeError::Construction(format!("malformed tag `{raw}`")))?;

    let name = caps.get(1).map(|m| m.as_str());
    let suffixes = caps.get(2).map_or("", |m| m.as_str());

    let name = match (name, suffixes.is_empty()) {
        (Some(name), _) => name,
        (None, false) => "div",
        (None, true) => return Err(StrikeError::Construction("empty tag name".into())),
    };

    let mut id = None;
    let mut classes = Vec::new();
    for part in SHORTHAND_PART.captures_iter(suffixes) {
        match &part[1] {
            "#" => id = Some(part[2].to_string()),
            _ => classes.push(part[2].to_string()),
        }
    }

    let mut attributes = Props::new();
    if let Some(id) = id {
        attributes.insert("id", id);
    }
    if !classes.is_empty() {
        attributes.insert("class", classes.join(" "));
    }
    Ok((name.to_string(), attributes))
}

// ---------------------------------------------------------------------------
// Expansion stack
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct ExpansionStack {
    frames: Vec<&'static str>,
    limit: usize,
}

thread_local! {
    static EXPANSION: RefCell<ExpansionStack> = RefCell::new(ExpansionStack::default());
}

/// Pops its frame when the component returns, including on error.
struct Frame;

impl Frame {
    fn enter(name: &'static str, limit: usize) -> Result<Self> {
        EXPANSION.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.frames.is_empty() {
                stack.limit = limit;
            }
            if stack.frames.len() >= stack.limit {
                return Err(StrikeError::Construction(format!(
                    "component expansion exceeded max depth {}: {} > {}",
                    stack.limit,
                    stack.frames.join(" > "),
                    name
                )));
            }
            stack.frames.push(name);
            Ok(Frame)
        })
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        EXPANSION.with(|stack| {
            stack.borrow_mut().frames.pop();
        });
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Tree builder with a configurable component expansion limit.
#[derive(Debug, Clone, Copy)]
pub struct Builder {
    max_depth: usize,
}

impl Default for Builder {
    fn default() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }
}

impl Builder {
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Build a node from a tag (or component) and its arguments.
    ///
    /// # Errors
    /// `StrikeError::Construction` for a malformed tag, a component that
    /// returns nothing renderable, or an expansion deeper than the limit.
    /// Errors carried by nested arguments or raised inside components are
    /// returned unchanged.
    pub fn build<'a, M>(
        &self,
        tag: impl IntoTag<'a, M>,
        args: impl IntoIterator<Item = Arg>,
    ) -> Result<Node> {
        let Classified {
            attributes,
            children,
        } = classify(args)?;

        match tag.into_tag() {
            Tag::Name(raw) => {
                let (name, mut merged) = parse_tag(&raw)?;
                merged.merge(attributes);
                trace!(tag = %name, children = children.len(), "built element");
                Ok(Node::new(name, merged, children))
            }
            Tag::Component(component) => {
                let name = component.name();
                let _frame = Frame::enter(name, self.max_depth)?;
                debug!(component = name, "expanding component");
                component
                    .invoke(ComponentInput {
                        props: attributes,
                        children,
                    })?
                    .ok_or_else(|| {
                        StrikeError::Construction(format!(
                            "component `{name}` returned a non-renderable value"
                        ))
                    })
            }
        }
    }
}

/// Build with the default builder. See [`Builder::build`].
pub fn h<'a, M>(tag: impl IntoTag<'a, M>, args: impl IntoIterator<Item = Arg>) -> Result<Node> {
    Builder::default().build(tag, args)
}

/// Variadic form of [`h`]: `h!("div.main", props! {"id" => "x"}, "text", child)`.
///
/// Each argument goes through `Arg::from`, so nested `h!` results can be
/// passed directly; the first failed one aborts the build.
#[macro_export]
macro_rules! h {
    ($tag:expr $(, $arg:expr)* $(,)?) => {
        $crate::h($tag, ::std::vec![$($crate::Arg::from($arg)),*])
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::PropValue;
    use crate::{component::component, props};
    use pretty_assertions::assert_eq;

    #[test]
    fn shorthand_id_and_classes() {
        let (name, attrs) = parse_tag("div#main.col.wide").unwrap();
        assert_eq!(name, "div");
        assert_eq!(attrs.get("id").and_then(PropValue::as_str), Some("main"));
        assert_eq!(
            attrs.get("class").and_then(PropValue::as_str),
            Some("col wide")
        );
    }

    #[test]
    fn bare_shorthand_defaults_to_div() {
        let (name, attrs) = parse_tag(".note").unwrap();
        assert_eq!(name, "div");
        assert_eq!(attrs.len(), 1);
    }

    #[test]
    fn tag_names_reject_markup() {
        assert!(is_valid_tag_name("strike-island"));
        assert!(is_valid_tag_name("h1"));
        assert!(!is_valid_tag_name(""));
        assert!(!is_valid_tag_name("img src=x"));
        assert!(!is_valid_tag_name("div.note"));
        assert!(!is_valid_tag_name("a>"));
    }

    #[test]
    fn custom_element_names_parse() {
        let (name, attrs) = parse_tag("strike-island").unwrap();
        assert_eq!(name, "strike-island");
        assert!(attrs.is_empty());
    }

    #[test]
    fn malformed_tags_fail() {
        for raw in ["", "di v", "div#", "1div"] {
            let err = parse_tag(raw).unwrap_err();
            assert!(matches!(err, StrikeError::Construction(_)), "{raw}");
        }
    }

    #[test]
    fn explicit_attributes_beat_shorthand() {
        let node = h!("p#a.x", props! { "id" => "b" }).unwrap();
        assert_eq!(node.attribute("id").and_then(PropValue::as_str), Some("b"));
        assert_eq!(node.attribute("class").and_then(PropValue::as_str), Some("x"));
    }

    #[test]
    fn nested_failure_aborts_build() {
        let err = h!("div", h!(""), "after").unwrap_err();
        assert!(matches!(err, StrikeError::Construction(_)));
    }

    #[test]
    fn depth_limit_applies_to_nested_components() {
        fn recurse(depth: usize) -> Result<Node> {
            h(
                component("Recurse", move || {
                    if depth == 0 {
                        h!("span")
                    } else {
                        recurse(depth - 1)
                    }
                }),
                vec![],
            )
        }

        let builder = Builder::with_max_depth(3);
        let ok = builder.build(component("Outer", || recurse(1)), vec![]);
        assert!(ok.is_ok());

        let err = builder
            .build(component("Outer", || recurse(5)), vec![])
            .unwrap_err();
        match err {
            StrikeError::Construction(msg) => {
                assert!(msg.contains("max depth 3"), "{msg}");
                assert!(msg.contains("Outer > Recurse"), "{msg}");
            }
            other => panic!("unexpected error: {other}"),
        }

        // The stack unwinds on failure.
        assert!(builder.build(component("Again", || recurse(1)), vec![]).is_ok());
    }
}
