//! Integration tests for the diff engine

use pretty_assertions::assert_eq;
use projsync_diff::{DiffOptions, Differ, ResultState};
use projsync_model::{
    Branch, BranchKey, Config, ConfigKey, ConfigRow, JsonMap, ManifestRecord, Object, ObjectKey,
    ObjectState, Registry, Relation, Relations, ConfigId, ComponentId, RowId, Block, Code,
    Transformation,
};
use proptest::prelude::*;
use rstest::rstest;
use serde_json::{Value, json};

fn map(value: Value) -> JsonMap {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

fn both(remote: impl Into<Object>, local: impl Into<Object>, path: &str) -> ObjectState {
    let remote = remote.into();
    let local = local.into();
    let key = local.key();
    ObjectState::from_remote(remote)
        .with_local(local)
        .unwrap()
        .with_manifest(ManifestRecord::new(key, path).persisted())
        .unwrap()
}

fn config_key() -> ConfigKey {
    ConfigKey::new(1, "keboola.ex-db-mysql", "101")
}

#[rstest]
#[case::branch(Branch::new(1, "Main").into())]
#[case::config(Config::new(&config_key(), "Extractor").into())]
#[case::row(ConfigRow::new(&config_key().row("5"), "Table").into())]
fn test_object_equal_to_itself(#[case] object: Object) {
    let state = both(object.clone(), object, "main/x");
    let result = Differ::default().diff_state(&state).unwrap().unwrap();
    assert_eq!(result.state, ResultState::Equal);
    assert!(result.changed_fields.is_empty());
}

#[test]
fn test_one_sided_states() {
    let mut registry = Registry::new();
    registry.apply_remote(Branch::new(1, "Main").into()).unwrap();
    registry
        .apply_local(
            Branch::new(2, "Feature").into(),
            ManifestRecord::new(BranchKey::new(2).into(), "feature").persisted(),
        )
        .unwrap();

    let results = Differ::default().diff(&registry);

    assert!(!results.equal);
    assert_eq!(
        results.get(&BranchKey::new(1).into()).unwrap().state,
        ResultState::OnlyInRemote
    );
    assert_eq!(
        results.get(&BranchKey::new(2).into()).unwrap().state,
        ResultState::OnlyInLocal
    );
    assert_eq!(results.format(false), "-  B branch \"1\"\n+  B feature");
}

#[test]
fn test_two_branches_with_changed_config() {
    let key = config_key();
    let mut remote_config = Config::new(&key, "Extractor");
    remote_config.content = map(json!({"parameters": {"db": {"host": "a"}}}));
    let mut local_config = remote_config.clone();
    local_config.content = map(json!({"parameters": {"db": {"host": "b"}}}));

    let mut registry = Registry::new();
    registry
        .insert(both(Branch::default_branch(1, "Main"), Branch::default_branch(1, "Main"), "main"))
        .unwrap();
    registry
        .insert(both(Branch::new(2, "Dev"), Branch::new(2, "Dev"), "dev"))
        .unwrap();
    registry
        .insert(both(remote_config, local_config, "main/extractor/mysql"))
        .unwrap();

    let results = Differ::default().diff(&registry);

    assert!(!results.equal);
    assert_eq!(results.count(ResultState::Equal), 2);
    let changed = results.get(&key.clone().into()).unwrap();
    assert_eq!(changed.state, ResultState::NotEqual);
    assert_eq!(changed.changed_fields.names(), vec!["content"]);
    assert!(
        changed
            .changed_fields
            .get("content")
            .unwrap()
            .has_path("parameters.db.host")
    );
    assert_eq!(
        results.format(true),
        [
            "CH C main/extractor/mysql",
            "  content:",
            "    parameters.db.host:",
            "      - \"a\"",
            "      + \"b\"",
        ]
        .join("\n")
    );
}

#[test]
fn test_reordered_nested_json_is_equal() {
    let key = config_key();
    let mut remote = Config::new(&key, "Extractor");
    remote.content = map(json!({"a": {"x": 1, "y": [1, {"p": true, "q": null}]}, "b": "s"}));
    let mut local = remote.clone();
    local.content = map(json!({"b": "s", "a": {"y": [1, {"q": null, "p": true}], "x": 1}}));

    let result = Differ::default()
        .diff_state(&both(remote, local, "main/c"))
        .unwrap()
        .unwrap();

    assert_eq!(result.state, ResultState::Equal);
}

#[test]
fn test_script_change_keeps_context() {
    let key = config_key();
    let script: String = (1..=8).map(|i| format!("SELECT {i};\n")).collect();
    let transformation = |script: &str| Transformation {
        blocks: vec![Block::new("Block").with_code(Code::new("Code").with_script(script))],
    };

    let mut remote = Config::new(&key, "Transformation");
    remote.transformation = Some(transformation(&script));
    let mut local = remote.clone();
    local.transformation = Some(transformation(&script.replace("SELECT 6;", "SELECT six;")));

    let differ = Differ::new(DiffOptions { context_lines: 1 });
    let result = differ.diff_state(&both(remote, local, "main/t")).unwrap().unwrap();

    assert_eq!(result.changed_fields.names(), vec!["transformation"]);
    assert_eq!(
        result.changed_fields.get("transformation").unwrap().diff(),
        "...\n  SELECT 5;\n- SELECT 6;\n+ SELECT six;\n  SELECT 7;\n..."
    );
}

#[test]
fn test_relation_changes_are_tracked_per_side() {
    let key = config_key();
    let mut remote = Config::new(&key, "Extractor");
    remote.relations = [Relation::VariablesFrom {
        variables_id: ConfigId::new("v1"),
    }]
    .into_iter()
    .collect();
    let mut local = remote.clone();
    local.relations = [
        Relation::VariablesFrom {
            variables_id: ConfigId::new("v2"),
        },
        Relation::SchedulerFor {
            component_id: ComponentId::new("ex"),
            config_id: ConfigId::new("1"),
        },
    ]
    .into_iter()
    .collect();

    let result = Differ::default()
        .diff_state(&both(remote, local, "main/c"))
        .unwrap()
        .unwrap();

    let relations = result.changed_fields.get("relations").unwrap();
    assert!(relations.has_path("in_api"));
    assert!(!relations.has_path("in_manifest"));
    assert_eq!(
        relations.diff(),
        [
            "in_api:",
            "  - variables from \"v1\"",
            "  + variables from \"v2\"",
            "  + scheduler for \"ex/1\"",
        ]
        .join("\n")
    );
}

#[test]
fn test_manifest_side_relation_only() {
    let key = config_key();
    let row_key = key.row("r1");
    let remote = ConfigRow::new(&row_key, "Values");
    let mut local = remote.clone();
    local.relations = Relations::from_iter([Relation::SharedCodeVariablesFor {
        config_id: ConfigId::new("c"),
        row_id: RowId::new("r"),
    }]);

    let result = Differ::default()
        .diff_state(&both(remote, local, "main/c/rows/r1"))
        .unwrap()
        .unwrap();

    let relations = result.changed_fields.get("relations").unwrap();
    assert_eq!(relations.paths().collect::<Vec<_>>(), vec!["in_manifest"]);
}

#[test]
fn test_error_does_not_stop_other_states() {
    let empty = ObjectState::new(ObjectKey::from(BranchKey::new(9)));
    let ok = ObjectState::from_remote(Branch::new(1, "Main").into());

    let results = Differ::default().diff_states([&empty, &ok]);

    assert!(results.has_errors());
    assert!(!results.equal);
    assert_eq!(results.results.len(), 1);
}

fn json_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z]{0,8}".prop_map(Value::String),
    ]
}

fn json_value() -> impl Strategy<Value = Value> {
    json_leaf().prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

/// Rebuild a value with every object's keys in reverse order
fn reverse_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .rev()
                .map(|(k, v)| (k.clone(), reverse_keys(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(reverse_keys).collect()),
        other => other.clone(),
    }
}

proptest! {
    #[test]
    fn key_order_never_matters(
        content in prop::collection::btree_map("[a-z]{1,4}", json_value(), 0..6)
    ) {
        let content: JsonMap = content.into_iter().collect();
        let key = config_key();
        let mut remote = Config::new(&key, "C");
        remote.content = content.clone();
        let mut local = remote.clone();
        local.content = map(reverse_keys(&Value::Object(content)));

        let changed = Differ::default()
            .diff_objects(&remote.into(), &local.into())
            .unwrap();
        prop_assert!(changed.is_empty());
    }

    #[test]
    fn diff_is_symmetric_in_detecting_change(a in "[a-z]{0,6}", b in "[a-z]{0,6}") {
        let remote: Object = Branch::new(1, a.clone()).into();
        let local: Object = Branch::new(1, b.clone()).into();
        let differ = Differ::default();
        let forward = differ.diff_objects(&remote, &local).unwrap();
        let backward = differ.diff_objects(&local, &remote).unwrap();
        prop_assert_eq!(forward.is_empty(), a == b);
        prop_assert_eq!(forward.names(), backward.names());
    }
}
