//! Structural diff over nested JSON trees.
//!
//! Maps are walked key by key. Anything else, lists included, is compared
//! as a whole: a list that gains, loses or reorders elements yields one
//! `Modified` change at the list's own path.

use serde_json::Value as JsonValue;

/// One difference between two trees, addressed by its map-key path.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeChange {
    Added {
        path: Vec<String>,
        value: JsonValue,
    },
    Removed {
        path: Vec<String>,
        value: JsonValue,
    },
    Modified {
        path: Vec<String>,
        old: JsonValue,
        new: JsonValue,
    },
}

impl TreeChange {
    pub fn path(&self) -> &[String] {
        match self {
            TreeChange::Added { path, .. }
            | TreeChange::Removed { path, .. }
            | TreeChange::Modified { path, .. } => path,
        }
    }
}

/// Differences from `old` to `new`. Within a map, removals and descents
/// follow `old`'s key order and additions follow `new`'s.
pub fn diff(old: &JsonValue, new: &JsonValue) -> Vec<TreeChange> {
    let mut changes = Vec::new();
    let mut path = Vec::new();
    walk(old, new, &mut path, &mut changes);
    changes
}

fn walk(old: &JsonValue, new: &JsonValue, path: &mut Vec<String>, changes: &mut Vec<TreeChange>) {
    match (old, new) {
        (JsonValue::Object(old_map), JsonValue::Object(new_map)) => {
            for (key, old_value) in old_map {
                path.push(key.clone());
                match new_map.get(key) {
                    Some(new_value) => walk(old_value, new_value, path, changes),
                    None => changes.push(TreeChange::Removed {
                        path: path.clone(),
                        value: old_value.clone(),
                    }),
                }
                path.pop();
            }
            for (key, new_value) in new_map {
                if !old_map.contains_key(key) {
                    let mut added = path.clone();
                    added.push(key.clone());
                    changes.push(TreeChange::Added {
                        path: added,
                        value: new_value.clone(),
                    });
                }
            }
        }
        _ if old != new => changes.push(TreeChange::Modified {
            path: path.clone(),
            old: old.clone(),
            new: new.clone(),
        }),
        _ => {}
    }
}

/// Follow `path` through nested maps.
pub fn lookup<'a>(tree: &'a JsonValue, path: &[String]) -> Option<&'a JsonValue> {
    path.iter().try_fold(tree, |node, key| node.as_object()?.get(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn p(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_identical_trees() {
        let tree = json!({"A": {"x": {"k": "1:int", "l": ["a", "b"]}}});
        assert!(diff(&tree, &tree).is_empty());
    }

    #[test]
    fn test_added_removed_modified() {
        let old = json!({"A": {"x": {"k": "1:int"}, "y": {}}});
        let new = json!({"A": {"x": {"k": "2:int"}, "z": {"k": "v"}}});
        let changes = diff(&old, &new);
        assert_eq!(
            changes,
            vec![
                TreeChange::Modified {
                    path: p(&["A", "x", "k"]),
                    old: json!("1:int"),
                    new: json!("2:int"),
                },
                TreeChange::Removed {
                    path: p(&["A", "y"]),
                    value: json!({}),
                },
                TreeChange::Added {
                    path: p(&["A", "z"]),
                    value: json!({"k": "v"}),
                },
            ]
        );
    }

    #[test]
    fn test_list_change_is_atomic() {
        let old = json!({"l": [1, 2, 3]});
        let new = json!({"l": [1, 2]});
        let changes = diff(&old, &new);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path(), p(&["l"]).as_slice());
    }

    #[test]
    fn test_type_change_is_modified() {
        let changes = diff(&json!({"a": "x"}), &json!({"a": {"b": "x"}}));
        assert!(matches!(&changes[..], [TreeChange::Modified { .. }]));
    }

    #[test]
    fn test_lookup() {
        let tree = json!({"A": {"x": {"k": "v"}}});
        assert_eq!(lookup(&tree, &p(&["A", "x", "k"])), Some(&json!("v")));
        assert_eq!(lookup(&tree, &p(&["A", "y"])), None);
        assert_eq!(lookup(&tree, &[]), Some(&tree));
    }
}
