//! Order-insensitive diff of JSON content
//!
//! Objects are compared as maps: two objects are equal iff they have the same
//! key set with equal values, regardless of insertion order. Arrays are
//! compared element by element. Every difference is reported with a readable
//! path built from object keys and array indices (e.g. `parameters.tables[2]`).

use serde_json::Value;

use projsync_model::JsonMap;

use crate::text::diff_text;

/// Maximum recursion depth; deeper differences are reported as one change
const MAX_DIFF_DEPTH: usize = 128;

/// One changed path
#[derive(Debug, Clone, PartialEq)]
pub struct JsonChange {
    pub path: String,
    /// Value on the remote side, `None` if only in local
    pub remote: Option<Value>,
    /// Value on the local side, `None` if only in remote
    pub local: Option<Value>,
}

/// Diff two JSON objects
pub fn diff_maps(remote: &JsonMap, local: &JsonMap) -> Vec<JsonChange> {
    let mut changes = Vec::new();
    diff_objects(remote, local, String::new(), &mut changes, 0);
    changes
}

/// Render changes as indented text, one block per path
pub fn format_changes(changes: &[JsonChange], context: usize) -> String {
    let mut out = Vec::new();
    for change in changes {
        out.push(format!("{}:", display_path(&change.path)));
        match (&change.remote, &change.local) {
            (Some(Value::String(r)), Some(Value::String(l)))
                if r.contains('\n') || l.contains('\n') =>
            {
                if let Some(text) = diff_text(r, l, context) {
                    out.extend(text.lines().map(|line| format!("  {line}")));
                }
            }
            (remote, local) => {
                if let Some(remote) = remote {
                    out.push(format!("  - {}", compact(remote)));
                }
                if let Some(local) = local {
                    out.push(format!("  + {}", compact(local)));
                }
            }
        }
    }
    out.join("\n")
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "<root>" } else { path }
}

fn compact(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}

fn child_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn diff_objects(
    remote: &JsonMap,
    local: &JsonMap,
    path: String,
    changes: &mut Vec<JsonChange>,
    depth: usize,
) {
    // Keys are visited in sorted order so output does not depend on
    // insertion order of either side.
    let mut keys: Vec<&String> = remote.keys().chain(local.keys()).collect();
    keys.sort();
    keys.dedup();

    for key in keys {
        let child = child_path(&path, key);
        match (remote.get(key), local.get(key)) {
            (Some(r), Some(l)) => diff_values(r, l, child, changes, depth + 1),
            (r, l) => changes.push(JsonChange {
                path: child,
                remote: r.cloned(),
                local: l.cloned(),
            }),
        }
    }
}

fn diff_values(
    remote: &Value,
    local: &Value,
    path: String,
    changes: &mut Vec<JsonChange>,
    depth: usize,
) {
    if depth > MAX_DIFF_DEPTH {
        if remote != local {
            changes.push(JsonChange {
                path,
                remote: Some(remote.clone()),
                local: Some(local.clone()),
            });
        }
        return;
    }

    match (remote, local) {
        (Value::Object(r), Value::Object(l)) => diff_objects(r, l, path, changes, depth),
        (Value::Array(r), Value::Array(l)) => {
            for i in 0..r.len().max(l.len()) {
                let child = format!("{path}[{i}]");
                match (r.get(i), l.get(i)) {
                    (Some(rv), Some(lv)) => diff_values(rv, lv, child, changes, depth + 1),
                    (rv, lv) => changes.push(JsonChange {
                        path: child,
                        remote: rv.cloned(),
                        local: lv.cloned(),
                    }),
                }
            }
        }
        _ => {
            if remote != local {
                changes.push(JsonChange {
                    path,
                    remote: Some(remote.clone()),
                    local: Some(local.clone()),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn map(value: Value) -> JsonMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_reordered_keys_are_equal() {
        let remote = map(json!({"a": 1, "b": {"x": true, "y": [1, 2]}}));
        let local = map(json!({"b": {"y": [1, 2], "x": true}, "a": 1}));
        assert!(diff_maps(&remote, &local).is_empty());
    }

    #[test]
    fn test_nested_paths() {
        let remote = map(json!({"parameters": {"db": {"host": "a"}}, "tables": [1, 2, 3]}));
        let local = map(json!({"parameters": {"db": {"host": "b"}}, "tables": [1, 2]}));

        let paths: Vec<_> = diff_maps(&remote, &local)
            .into_iter()
            .map(|c| c.path)
            .collect();

        assert_eq!(paths, vec!["parameters.db.host", "tables[2]"]);
    }

    #[test]
    fn test_only_one_side() {
        let remote = map(json!({"old": 1}));
        let local = map(json!({"new": 2}));
        let changes = diff_maps(&remote, &local);

        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].path, "new");
        assert_eq!(changes[0].remote, None);
        assert_eq!(changes[1].path, "old");
        assert_eq!(changes[1].local, None);
    }

    #[test]
    fn test_format_changes() {
        let remote = map(json!({"host": "a", "port": 1}));
        let local = map(json!({"host": "b"}));
        let text = format_changes(&diff_maps(&remote, &local), 2);

        assert_eq!(text, "host:\n  - \"a\"\n  + \"b\"\nport:\n  - 1");
    }

    #[test]
    fn test_format_multiline_string_uses_text_diff() {
        let remote = map(json!({"query": "SELECT *\nFROM a\nWHERE x = 1"}));
        let local = map(json!({"query": "SELECT *\nFROM b\nWHERE x = 1"}));
        let text = format_changes(&diff_maps(&remote, &local), 2);

        assert_eq!(
            text,
            "query:\n    SELECT *\n  - FROM a\n  + FROM b\n    WHERE x = 1"
        );
    }

    #[test]
    fn test_deep_nesting_does_not_overflow() {
        fn nested(depth: usize, leaf: &str) -> Value {
            let mut current = json!({"leaf": leaf});
            for _ in 0..depth {
                current = json!({"nested": current});
            }
            current
        }

        let remote = map(nested(150, "old"));
        let local = map(nested(150, "new"));
        assert_eq!(diff_maps(&remote, &local).len(), 1);
    }
}
