//! Tests for the plan builder

use projsync_core::{Direction, Error, Operation, Plan, SyncOptions};
use projsync_model::{BranchKey, Config, ConfigKey, ObjectKey, Relation};
use projsync_test_utils::{TestProject, branch, config, default_branch, row};
use rstest::rstest;

fn plan_for(project: &TestProject, direction: Direction) -> Plan {
    let engine = project.engine();
    let registry = engine.load().expect("Should load project");
    let results = engine.diff(&registry).expect("Should diff project");
    Plan::build(direction, &results, &registry).expect("Should build plan")
}

fn operation_of(plan: &Plan, key: impl Into<ObjectKey>) -> Option<Operation> {
    plan.get(&key.into()).map(|action| action.operation)
}

/// Main on both sides, a local-only branch, a remote-only config and a
/// config renamed locally
fn mixed_project() -> TestProject {
    let mut project = TestProject::new();
    project
        .both(default_branch(1, "Main"), "main")
        .local(branch(2, "Feature"), "2-feature")
        .remote(config(1, "ex", "1", "New"))
        .remote(config(1, "ex", "2", "Cfg"))
        .local(config(1, "ex", "2", "Cfg Renamed"), "main/ex/cfg");
    project
}

mod classification {
    use super::*;
    use pretty_assertions::assert_eq;

    #[rstest]
    #[case(Direction::Pull, Operation::DeleteLocal, Operation::SaveLocal, Operation::SaveLocal)]
    #[case(Direction::Push, Operation::SaveRemote, Operation::DeleteRemote, Operation::SaveRemote)]
    fn test_operations_per_direction(
        #[case] direction: Direction,
        #[case] only_local: Operation,
        #[case] only_remote: Operation,
        #[case] changed: Operation,
    ) {
        let plan = plan_for(&mixed_project(), direction);

        assert_eq!(plan.direction(), direction);
        assert_eq!(plan.len(), 3);
        assert_eq!(operation_of(&plan, BranchKey::new(1)), None);
        assert_eq!(operation_of(&plan, BranchKey::new(2)), Some(only_local));
        assert_eq!(
            operation_of(&plan, ConfigKey::new(1, "ex", "1")),
            Some(only_remote)
        );
        assert_eq!(
            operation_of(&plan, ConfigKey::new(1, "ex", "2")),
            Some(changed)
        );
    }

    #[test]
    fn test_equal_project_has_empty_plan() {
        let mut project = TestProject::new();
        project
            .both(default_branch(1, "Main"), "main")
            .both(config(1, "ex", "1", "Cfg"), "main/ex/cfg")
            .both(row(1, "ex", "1", "1", "Row"), "main/ex/cfg/rows/row");

        for direction in [Direction::Pull, Direction::Push] {
            let plan = plan_for(&project, direction);
            assert!(plan.is_empty());
            assert_eq!(plan.summary().total(), 0);
        }
    }

    #[test]
    fn test_push_deletes_only_subtree_root() {
        let mut project = TestProject::new();
        project
            .both(default_branch(1, "Main"), "main")
            .remote(branch(3, "Gone"))
            .remote(config(3, "ex", "1", "Cfg"))
            .remote(row(3, "ex", "1", "1", "Row"));

        let plan = plan_for(&project, Direction::Push);

        assert_eq!(plan.len(), 1);
        assert_eq!(
            operation_of(&plan, BranchKey::new(3)),
            Some(Operation::DeleteRemote)
        );
    }

    #[test]
    fn test_push_deletes_config_under_kept_branch() {
        let mut project = TestProject::new();
        project
            .both(default_branch(1, "Main"), "main")
            .remote(config(1, "ex", "1", "Cfg"))
            .remote(row(1, "ex", "1", "1", "Row"));

        let plan = plan_for(&project, Direction::Push);

        let keys: Vec<ObjectKey> = plan.actions().iter().map(|a| a.key().clone()).collect();
        assert_eq!(keys, vec![ObjectKey::from(ConfigKey::new(1, "ex", "1"))]);
    }
}

mod remote_only_branch {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Main on both sides and a branch that only exists remotely
    fn old_branch_project() -> TestProject {
        let mut project = TestProject::new();
        project
            .both(default_branch(1, "Main"), "main")
            .remote(branch(999, "Old"));
        project
    }

    #[test]
    fn test_pull_saves_branch_locally() {
        let plan = plan_for(&old_branch_project(), Direction::Pull);

        assert_eq!(plan.len(), 1);
        assert_eq!(
            operation_of(&plan, BranchKey::new(999)),
            Some(Operation::SaveLocal)
        );
        assert_eq!(plan.summary().save_local, 1);
    }

    #[test]
    fn test_push_deletion_skipped_without_force() {
        let project = old_branch_project();

        let plan = plan_for(&project, Direction::Push);
        assert_eq!(plan.len(), 1);
        assert_eq!(
            operation_of(&plan, BranchKey::new(999)),
            Some(Operation::DeleteRemote)
        );
        assert_eq!(plan.summary().skipped, 1);

        let report = project
            .engine()
            .push(SyncOptions::default())
            .expect("Should push");
        let execution = report.execution.as_ref().expect("Should execute");
        assert_eq!(execution.skipped.len(), 1);
        assert!(execution.applied.is_empty());
        assert!(project.remote.contains(&BranchKey::new(999).into()));
    }
}

mod relations {
    use super::*;
    use pretty_assertions::assert_eq;

    /// A config whose local copy records a relation only the manifest knows
    fn project_with_manifest_relation() -> TestProject {
        let key = ConfigKey::new(1, "ex.variables", "10");
        let remote = Config::new(&key, "Vars");
        let mut local = remote.clone();
        local.relations.add(Relation::VariablesFor {
            component_id: "ex".into(),
            config_id: "1".into(),
        });

        let mut project = TestProject::new();
        project
            .both(default_branch(1, "Main"), "main")
            .remote(remote.into())
            .local(local.into(), "main/ex.variables/vars");
        project
    }

    #[test]
    fn test_manifest_relation_change_is_pulled() {
        let plan = plan_for(&project_with_manifest_relation(), Direction::Pull);

        let action = plan
            .get(&ConfigKey::new(1, "ex.variables", "10").into())
            .expect("Should plan the config");
        assert_eq!(action.operation, Operation::SaveLocal);
        assert_eq!(action.changed_fields.names(), vec!["relations"]);
    }

    #[test]
    fn test_manifest_relation_change_is_not_pushed() {
        let plan = plan_for(&project_with_manifest_relation(), Direction::Push);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_api_relation_change_is_pushed_not_pulled() {
        let key = ConfigKey::new(1, "ex", "1");
        let remote = Config::new(&key, "Cfg");
        let mut local = remote.clone();
        local.relations.add(Relation::VariablesFrom {
            variables_id: "10".into(),
        });

        let mut project = TestProject::new();
        project
            .both(default_branch(1, "Main"), "main")
            .remote(remote.into())
            .local(local.into(), "main/ex/cfg");

        assert!(plan_for(&project, Direction::Pull).is_empty());
        assert_eq!(
            operation_of(&plan_for(&project, Direction::Push), key),
            Some(Operation::SaveRemote)
        );
    }
}

mod validation {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_branch_deletion_rejected() {
        let mut project = TestProject::new();
        project.remote(default_branch(1, "Main"));

        let engine = project.engine();
        let registry = engine.load().expect("Should load project");
        let results = engine.diff(&registry).expect("Should diff project");
        let result = engine.plan(Direction::Push, &registry, &results, &SyncOptions::force());

        match result {
            Err(Error::DefaultBranchDeletion { key }) => {
                assert_eq!(key, ObjectKey::from(BranchKey::new(1)));
            }
            other => panic!("Expected DefaultBranchDeletion, got {other:?}"),
        }
    }

    #[test]
    fn test_every_violation_reported() {
        let mut project = TestProject::new();
        project
            .remote(default_branch(1, "Main"))
            .remote(default_branch(2, "Other Main"));

        let plan = plan_for(&project, Direction::Push);
        let err = plan.validate().expect_err("Should reject the plan");

        match err {
            Error::Multiple(errors) => assert_eq!(errors.len(), 2),
            other => panic!("Expected Multiple, got {other:?}"),
        }
    }
}

mod rendering {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_empty_plan() {
        let mut project = TestProject::new();
        project.both(default_branch(1, "Main"), "main");

        let plan = plan_for(&project, Direction::Pull);

        assert_eq!(plan.format(), "Plan for \"pull\" operation:\n  no difference");
    }

    #[test]
    fn test_format_marks_and_changed_fields() {
        let mut project = TestProject::new();
        project
            .both(default_branch(1, "Main"), "main")
            .local(branch(2, "Feature"), "2-feature")
            .remote(config(1, "ex", "2", "Cfg"))
            .local(config(1, "ex", "2", "Cfg Renamed"), "main/ex/cfg");

        let plan = plan_for(&project, Direction::Pull);

        assert_eq!(
            plan.format(),
            "Plan for \"pull\" operation:\n  ×  B 2-feature\n  CH C main/ex/cfg | changed: name"
        );
    }

    #[test]
    fn test_skipped_remote_deletion_hint() {
        let mut project = TestProject::new();
        project
            .both(default_branch(1, "Main"), "main")
            .both(config(1, "ex", "1", "Cfg"), "main/ex/cfg")
            .remote(config(1, "ex", "2", "Old"));

        let mut plan = plan_for(&project, Direction::Push);
        let rendered = plan.format();

        assert!(rendered.contains(" - SKIPPED"));
        assert!(
            rendered.ends_with("Skipped remote objects deletion, use \"--force\" to delete them.")
        );
        assert_eq!(plan.summary().delete_remote, 1);
        assert_eq!(plan.summary().skipped, 1);

        plan.set_allow_remote_delete(true);
        assert!(!plan.format().contains("SKIPPED"));
        assert_eq!(plan.summary().skipped, 0);
    }
}
