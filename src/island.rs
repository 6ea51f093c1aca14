//! Island and slot markers.
//!
//! An island is a subtree the client runtime hydrates on its own: the
//! `strike-island` element names the component export to mount and carries
//! the props it should be mounted with. A slot holds fallback content that
//! stays hidden until streamed content replaces it.

use crate::builder::h;
use crate::node::{Child, Props};
use crate::{Arg, Node, Result};

pub const ISLAND_TAG: &str = "strike-island";
pub const SLOT_TAG: &str = "strike-slot";

/// Attribute naming the client component export.
pub const COMPONENT_EXPORT_ATTR: &str = "component-export";
/// Attribute holding the island props map (`data-props` in HTML).
pub const PROPS_ATTR: &str = "props";

/// Style rules that keep markers out of layout. Served by the page as a
/// static `<style>` block.
pub const ISLAND_STYLES: &str = "
strike-slot {
    display: none;
}
strike-island {
    display: contents;
}
";

/// Mark `children` as the server rendering of client component `export`.
pub fn island(export: &str, props: Props, children: Vec<Child>) -> Result<Node> {
    let mut attributes = Props::new();
    attributes.insert(COMPONENT_EXPORT_ATTR, export);
    attributes.insert(PROPS_ATTR, props);
    h(ISLAND_TAG, [Arg::Props(attributes), Arg::Children(children)])
}

/// Fallback content shown until the real content streams in.
pub fn slot(children: Vec<Child>) -> Result<Node> {
    h(SLOT_TAG, [Arg::Children(children)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::PropValue;
    use crate::props;

    #[test]
    fn island_carries_export_and_props() {
        let node = island(
            "EditButton",
            props! { "noteId" => PropValue::Null, "title" => "New" },
            vec!["New".into()],
        )
        .unwrap();
        assert_eq!(node.tag(), ISLAND_TAG);
        assert_eq!(
            node.attribute(COMPONENT_EXPORT_ATTR).and_then(PropValue::as_str),
            Some("EditButton")
        );
        match node.attribute(PROPS_ATTR) {
            Some(PropValue::Map(props)) => {
                assert!(props.get("noteId").unwrap().is_null());
                assert_eq!(props.len(), 2);
            }
            other => panic!("unexpected props: {other:?}"),
        }
        assert_eq!(node.children().len(), 1);
    }

    #[test]
    fn slot_wraps_children() {
        let node = slot(vec!["loading".into(), "...".into()]).unwrap();
        assert_eq!(node.tag(), SLOT_TAG);
        assert_eq!(node.children().len(), 2);
        assert!(node.attributes().is_empty());
    }
}
