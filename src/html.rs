//! HTML serialization.
//!
//! Writes a finished tree as markup in document order. Islands and slots
//! are ordinary custom elements here; the only island-specific rule is how
//! map-valued attributes are carried (see [`write_attributes`]).

use tracing::{trace, warn};

use crate::builder::is_valid_tag_name;
use crate::island::ISLAND_TAG;
use crate::node::{Child, Node, PropValue};
use crate::utils::push_escaped_html;
use crate::{Result, StrikeError};

/// Elements written without a closing tag. Children are never rendered.
pub const VOID_ELEMENTS: [&str; 13] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Render a tree to an HTML string.
///
/// # Errors
/// `StrikeError::Serialization` if an attribute holds a handler, a tag or
/// attribute name would break out of its element, or an island prop map
/// cannot be encoded.
pub fn to_html(node: &Node) -> Result<String> {
    let mut out = String::with_capacity(256);
    write_node(&mut out, node)?;
    Ok(out)
}

/// Append the rendering of `node` to `out`.
pub fn write_node(out: &mut String, node: &Node) -> Result<()> {
    if node.is_fragment() {
        return write_children(out, node.children());
    }

    let tag = node.tag();
    if !is_valid_tag_name(tag) {
        return Err(StrikeError::Serialization(format!("invalid tag name `{tag}`")));
    }
    out.push('<');
    out.push_str(tag);
    write_attributes(out, node)?;
    out.push('>');

    if is_void(tag) {
        if !node.children().is_empty() {
            warn!(tag, count = node.children().len(), "void element children ignored");
        }
        return Ok(());
    }

    write_children(out, node.children())?;
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
    Ok(())
}

fn write_children(out: &mut String, children: &[Child]) -> Result<()> {
    for child in children {
        match child {
            Child::Node(node) => write_node(out, node)?,
            Child::Text(text) => push_escaped_html(out, text),
            Child::Raw(markup) => out.push_str(markup.as_str()),
            Child::List(items) => write_children(out, items)?,
        }
    }
    Ok(())
}

/// Write ` name="value"` pairs in insertion order.
///
/// - null values are omitted
/// - booleans and numbers are stringified
/// - maps become `data-<name>` JSON blobs on islands and are skipped
///   elsewhere
/// - handlers are an error
fn write_attributes(out: &mut String, node: &Node) -> Result<()> {
    let on_island = node.tag() == ISLAND_TAG;
    for (name, value) in node.attributes().iter() {
        match value {
            PropValue::Null => {}
            PropValue::String(s) => push_attribute(out, name, s)?,
            PropValue::Bool(b) => push_attribute(out, name, if *b { "true" } else { "false" })?,
            PropValue::Number(n) => push_attribute(out, name, &n.to_string())?,
            PropValue::Map(props) if on_island => {
                let blob = serde_json::to_string(props)
                    .map_err(|e| StrikeError::Serialization(e.to_string()))?;
                if name.starts_with("data-") {
                    push_attribute(out, name, &blob)?;
                } else {
                    push_attribute(out, &format!("data-{name}"), &blob)?;
                }
            }
            PropValue::Map(_) => {
                trace!(tag = node.tag(), attribute = name, "map attribute skipped");
            }
            PropValue::Handler(handler) => {
                return Err(StrikeError::Serialization(format!(
                    "attribute `{name}` on <{}> holds handler `{}`",
                    node.tag(),
                    handler.name()
                )));
            }
        }
    }
    Ok(())
}

/// Attribute names may not contain whitespace, quotes, `<`, `>`, `/`, `=`
/// or control characters.
fn is_valid_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && !name.chars().any(|c| {
            c.is_whitespace()
                || c.is_control()
                || matches!(c, '"' | '\'' | '<' | '>' | '/' | '=')
        })
}

fn push_attribute(out: &mut String, name: &str, value: &str) -> Result<()> {
    if !is_valid_attribute_name(name) {
        return Err(StrikeError::Serialization(format!(
            "invalid attribute name `{name}`"
        )));
    }
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    push_escaped_html(out, value);
    out.push('"');
    Ok(())
}
