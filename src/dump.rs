//! Raw tree dumps
//!
//! Converts a native element and its descendants into nested JSON objects:
//!
//! ```text
//! { "tag": ..., "value": ..., "attributes": {...}, "allChildren": [...],
//!   "<child tag>": [...], ... }
//! ```
//!
//! Child groups share the object with the fixed keys, so a child named
//! `tag`, `value`, `attributes` or `allChildren` replaces that entry.
//! [`raw_tree_dump_strict`] reports the collision instead.

use crate::dom::NativeNode;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde_json::{Map, Value};

const RESERVED_KEYS: [&str; 4] = ["tag", "value", "attributes", "allChildren"];

/// Dump `node` and its element descendants.
///
/// ```
/// let root = xmlbrowser::parse(r#"<a x="1"><b>hi</b></a>"#).unwrap();
/// let dump = xmlbrowser::raw_tree_dump(&root);
/// assert_eq!(dump["tag"], "a");
/// assert_eq!(dump["b"][0]["value"], "hi");
/// ```
pub fn raw_tree_dump(node: &NativeNode) -> Value {
    dump_node(node)
}

/// Like [`raw_tree_dump`], but fails when any child tag collides with one of
/// the fixed keys
pub fn raw_tree_dump_strict(node: &NativeNode) -> Result<Value> {
    check_reserved(node)?;
    Ok(dump_node(node))
}

fn dump_node(node: &NativeNode) -> Value {
    let attributes: Map<String, Value> = node
        .attributes()
        .into_iter()
        .map(|(name, value)| (name.to_string(), Value::from(value)))
        .collect();

    let children = node.element_children();
    let mut all_children = Vec::new();
    let mut by_tag: IndexMap<&str, Vec<Value>> = IndexMap::new();
    for child in &children {
        let dumped = dump_node(child);
        by_tag.entry(child.name()).or_default().push(dumped.clone());
        all_children.push(dumped);
    }

    let mut object = Map::new();
    object.insert("tag".to_string(), Value::from(node.name()));
    object.insert("value".to_string(), Value::from(node.text()));
    object.insert("attributes".to_string(), Value::Object(attributes));
    object.insert("allChildren".to_string(), Value::Array(all_children));
    for (tag, group) in by_tag {
        object.insert(tag.to_string(), Value::Array(group));
    }
    Value::Object(object)
}

fn check_reserved(node: &NativeNode) -> Result<()> {
    let mut pending = vec![node.clone()];
    while let Some(current) = pending.pop() {
        for child in current.element_children() {
            if RESERVED_KEYS.contains(&child.name()) {
                return Err(Error::ReservedKey {
                    tag: child.name().to_string(),
                });
            }
            pending.push(child);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse;
    use serde_json::json;

    #[test]
    fn test_dump_shape() {
        let root = parse(r#"<a x="1"><b>hi</b></a>"#).unwrap();
        let dump = raw_tree_dump(&root);
        assert_eq!(dump["tag"], "a");
        assert_eq!(dump["attributes"], json!({"x": "1"}));
        assert_eq!(dump["allChildren"].as_array().unwrap().len(), 1);
        assert_eq!(dump["b"][0], dump["allChildren"][0]);
        assert_eq!(
            dump["b"][0],
            json!({"tag": "b", "value": "hi", "attributes": {}, "allChildren": []})
        );
    }

    #[test]
    fn test_key_order() {
        let root = parse("<r><y/><x/><y/></r>").unwrap();
        let dump = raw_tree_dump(&root);
        let keys: Vec<_> = dump.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["tag", "value", "attributes", "allChildren", "y", "x"]);
        assert_eq!(dump["y"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_reserved_key_collision_overwrites() {
        let root = parse("<r>text<value>inner</value></r>").unwrap();
        let dump = raw_tree_dump(&root);
        // the child group replaced the node's own text
        assert_eq!(dump["value"][0]["value"], "inner");
        assert_eq!(dump["allChildren"][0]["tag"], "value");
    }

    #[test]
    fn test_strict_rejects_collision_anywhere() {
        let root = parse("<r><a><tag/></a></r>").unwrap();
        assert!(matches!(
            raw_tree_dump_strict(&root),
            Err(Error::ReservedKey { tag }) if tag == "tag"
        ));

        let root = parse("<r><a/></r>").unwrap();
        assert_eq!(raw_tree_dump_strict(&root).unwrap(), raw_tree_dump(&root));
    }
}
