//! Payload serialization for the client runtime.
//!
//! Wire format:
//!
//! ```text
//! element  {"$strike":"element","tag_type":"div","props":{..},"children":[..]}
//! text     "plain string"
//! raw      {"$strike":"html","html":"<b>trusted</b>"}
//! list     [ ..children.. ]
//! ```
//!
//! Unlike HTML, null attributes are kept as JSON `null`.

use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::builder::is_valid_tag_name;
use crate::node::{Child, Markup, Node, PropValue, Props};
use crate::{Result, StrikeError};

/// Discriminator key for non-string payload objects.
pub const KIND_KEY: &str = "$strike";

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode a tree as a JSON value.
///
/// # Errors
/// `StrikeError::Serialization` if any attribute (at any depth) holds a
/// handler.
pub fn to_payload(node: &Node) -> Result<Value> {
    serde_json::to_value(node).map_err(|e| StrikeError::Serialization(e.to_string()))
}

/// Encode a tree straight to a JSON string.
pub fn to_payload_string(node: &Node) -> Result<String> {
    serde_json::to_string(node).map_err(|e| StrikeError::Serialization(e.to_string()))
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry(KIND_KEY, "element")?;
        map.serialize_entry("tag_type", self.tag())?;
        map.serialize_entry("props", self.attributes())?;
        map.serialize_entry("children", self.children())?;
        map.end()
    }
}

impl Serialize for Child {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Child::Node(node) => node.serialize(serializer),
            Child::Text(text) => serializer.serialize_str(text),
            Child::Raw(markup) => markup.serialize(serializer),
            Child::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

impl Serialize for Markup {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(KIND_KEY, "html")?;
        map.serialize_entry("html", self.as_str())?;
        map.end()
    }
}

impl Serialize for Props {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Serialize for PropValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            PropValue::Null => serializer.serialize_unit(),
            PropValue::Bool(b) => serializer.serialize_bool(*b),
            PropValue::Number(n) => n.serialize(serializer),
            PropValue::String(s) => serializer.serialize_str(s),
            PropValue::Map(props) => props.serialize(serializer),
            PropValue::Handler(handler) => Err(S::Error::custom(format!(
                "handler `{}` is not JSON-safe",
                handler.name()
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Rebuild a tree from its payload, the way the client runtime reads it.
///
/// # Errors
/// `StrikeError::Serialization` for anything that is not a well-formed
/// element payload.
pub fn from_payload(value: &Value) -> Result<Node> {
    let obj = value
        .as_object()
        .ok_or_else(|| malformed("root is not an object"))?;
    decode_element(obj)
}

fn decode_element(obj: &Map<String, Value>) -> Result<Node> {
    if obj.get(KIND_KEY).and_then(Value::as_str) != Some("element") {
        return Err(malformed("expected an element"));
    }
    let tag = obj
        .get("tag_type")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| malformed("element without tag_type"))?;
    if !is_valid_tag_name(tag) {
        return Err(malformed(&format!("invalid tag_type `{tag}`")));
    }
    let props = match obj.get("props") {
        Some(Value::Object(map)) => decode_props(map),
        None => Props::new(),
        Some(_) => return Err(malformed("props is not an object")),
    };
    let children = match obj.get("children") {
        Some(Value::Array(items)) => items.iter().map(decode_child).collect::<Result<_>>()?,
        None => Vec::new(),
        Some(_) => return Err(malformed("children is not an array")),
    };
    Ok(Node::new(tag.to_string(), props, children))
}

fn decode_child(value: &Value) -> Result<Child> {
    match value {
        Value::String(text) => Ok(Child::Text(text.clone())),
        Value::Array(items) => Ok(Child::List(
            items.iter().map(decode_child).collect::<Result<_>>()?,
        )),
        Value::Object(obj) => match obj.get(KIND_KEY).and_then(Value::as_str) {
            Some("element") => decode_element(obj).map(Child::Node),
            Some("html") => obj
                .get("html")
                .and_then(Value::as_str)
                .map(|html| Child::Raw(Markup::new(html)))
                .ok_or_else(|| malformed("html child without markup")),
            _ => Err(malformed("unknown child object")),
        },
        other => Err(malformed(&format!("unexpected child `{other}`"))),
    }
}

fn decode_props(map: &Map<String, Value>) -> Props {
    map.iter()
        .map(|(key, value)| (key.as_str(), decode_value(value)))
        .collect()
}

fn decode_value(value: &Value) -> PropValue {
    match value {
        Value::Null => PropValue::Null,
        Value::Bool(b) => PropValue::Bool(*b),
        Value::Number(n) => PropValue::Number(n.clone()),
        Value::String(s) => PropValue::String(s.clone()),
        Value::Object(map) => PropValue::Map(decode_props(map)),
        // Attribute arrays are never produced by the encoder.
        Value::Array(_) => PropValue::String(value.to_string()),
    }
}

fn malformed(reason: &str) -> StrikeError {
    StrikeError::Serialization(format!("malformed payload: {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Handler;
    use crate::{h, island, props, slot};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn element_shape() {
        let node = h!("a", props! { "href" => "/" }, "Home").unwrap();
        assert_eq!(
            to_payload(&node).unwrap(),
            json!({
                "$strike": "element",
                "tag_type": "a",
                "props": { "href": "/" },
                "children": ["Home"]
            })
        );
    }

    #[test]
    fn null_props_are_kept() {
        let node = h!("div", props! { "value" => PropValue::Null }).unwrap();
        let payload = to_payload(&node).unwrap();
        assert_eq!(payload["props"], json!({ "value": null }));
    }

    #[test]
    fn raw_markup_and_nested_lists() {
        let node = h!("p", Markup::new("<i>x</i>"), vec![vec!["a", "b"]]).unwrap();
        assert_eq!(
            to_payload(&node).unwrap()["children"],
            json!([{ "$strike": "html", "html": "<i>x</i>" }, ["a", "b"]])
        );
    }

    #[test]
    fn handler_fails_even_when_nested() {
        let node = h!(
            "div",
            props! { "meta" => props! { "cb" => Handler::new("cb", || {}) } }
        )
        .unwrap();
        let err = to_payload(&node).unwrap_err();
        match err {
            StrikeError::Serialization(msg) => assert!(msg.contains("cb"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn round_trip_preserves_everything() {
        let node = h!(
            "section.col",
            props! { "data-n" => 3, "hidden" => false, "note" => PropValue::Null },
            island(
                "SidebarNoteContent",
                props! { "id" => "1", "title" => "Meeting" },
                vec![
                    h!("strong", "Meeting").unwrap().into(),
                    slot(vec![h!("i", "(No content)").unwrap().into()])
                        .unwrap()
                        .into(),
                ],
            ),
            Markup::new("<hr>"),
            vec![vec!["x"]]
        )
        .unwrap();

        let back = from_payload(&to_payload(&node).unwrap()).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn rejects_non_elements() {
        assert!(from_payload(&json!("text")).is_err());
        assert!(from_payload(&json!({ "$strike": "html", "html": "" })).is_err());
        assert!(from_payload(&json!({ "$strike": "element", "tag_type": "" })).is_err());
    }

    #[test]
    fn rejects_tags_that_smuggle_attributes() {
        let value = json!({
            "$strike": "element",
            "tag_type": "div",
            "children": [{ "$strike": "element", "tag_type": "img src=x onerror=alert(1)" }]
        });
        let err = from_payload(&value).unwrap_err();
        assert!(matches!(err, StrikeError::Serialization(_)));
        assert!(err.to_string().contains("invalid tag_type"));
    }
}
