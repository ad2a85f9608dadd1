//! Small value helpers shared by DTOs and tree consumers.

use crate::model::Record;
use serde_json::Value;

/// Key holding nested children in assembled trees.
pub const CHILDREN_KEY: &str = "children";
/// Key written by [`to_flat_trees`] on every flattened node.
pub const DEPTH_KEY: &str = "depth";

/// Coerces a request value toward a boolean.
///
/// Absent or `null` becomes `false` and booleans pass through. Strings are
/// lowercased and parsed as a JSON literal; the parsed literal is returned,
/// or the original string when parsing fails. Other values pass through.
pub fn to_boolean(value: Option<&Value>) -> Value {
    match value {
        None | Some(Value::Null) => Value::Bool(false),
        Some(Value::Bool(flag)) => Value::Bool(*flag),
        Some(Value::String(text)) => {
            let lowered = text.to_lowercase();
            serde_json::from_str(&lowered).unwrap_or_else(|_| Value::String(text.clone()))
        }
        Some(other) => other.clone(),
    }
}

/// Flattens nested trees depth first, tagging each node with its depth.
///
/// Nodes come out parent first, children in order. The `children` key is
/// removed from every emitted node.
pub fn to_flat_trees(trees: Vec<Record>, depth: u32) -> Vec<Record> {
    let mut flat = Vec::new();
    flatten_into(&mut flat, trees, depth);
    flat
}

fn flatten_into(flat: &mut Vec<Record>, trees: Vec<Record>, depth: u32) {
    for mut node in trees {
        let children: Vec<Record> = match node.remove(CHILDREN_KEY) {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(child) => Some(child),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        node.insert(DEPTH_KEY.to_string(), Value::from(depth));
        flat.push(node);
        flatten_into(flat, children, depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::{to_boolean, to_flat_trees};
    use crate::model::Record;
    use serde_json::{json, Value};

    #[test]
    fn absent_and_null_become_false() {
        assert_eq!(to_boolean(None), json!(false));
        assert_eq!(to_boolean(Some(&Value::Null)), json!(false));
    }

    #[test]
    fn booleans_pass_through() {
        assert_eq!(to_boolean(Some(&json!(true))), json!(true));
        assert_eq!(to_boolean(Some(&json!(false))), json!(false));
    }

    #[test]
    fn strings_parse_case_insensitively() {
        assert_eq!(to_boolean(Some(&json!("true"))), json!(true));
        assert_eq!(to_boolean(Some(&json!("FALSE"))), json!(false));
        assert_eq!(to_boolean(Some(&json!("True"))), json!(true));
    }

    #[test]
    fn unparseable_strings_are_returned_unchanged() {
        assert_eq!(to_boolean(Some(&json!("yes"))), json!("yes"));
        assert_eq!(to_boolean(Some(&json!("Yes"))), json!("Yes"));
    }

    #[test]
    fn parsable_non_boolean_literals_leak_through() {
        assert_eq!(to_boolean(Some(&json!("1"))), json!(1));
        assert_eq!(to_boolean(Some(&json!("NULL"))), Value::Null);
        assert_eq!(to_boolean(Some(&json!(0))), json!(0));
    }

    #[test]
    fn flat_trees_walk_depth_first() {
        let trees = match json!([
            {
                "id": "root",
                "children": [
                    { "id": "a", "children": [ { "id": "a1", "children": [] } ] },
                    { "id": "b", "children": [] }
                ]
            }
        ]) {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect::<Vec<Record>>(),
            _ => unreachable!(),
        };

        let flat = to_flat_trees(trees, 0);
        let order: Vec<(&str, u64)> = flat
            .iter()
            .map(|node| {
                (
                    node["id"].as_str().unwrap(),
                    node["depth"].as_u64().unwrap(),
                )
            })
            .collect();
        assert_eq!(order, vec![("root", 0), ("a", 1), ("a1", 2), ("b", 1)]);
        assert!(flat.iter().all(|node| !node.contains_key("children")));
    }
}
