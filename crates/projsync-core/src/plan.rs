//! Plan builder
//!
//! Turns diff results into a directional list of actions. Pull makes the
//! local tree match the remote project; push makes the remote project match
//! the local tree. Both directions share one classification:
//!
//! | result           | pull          | push                      |
//! |------------------|---------------|---------------------------|
//! | `Equal`          | nothing       | nothing                   |
//! | `NotEqual`       | `SaveLocal`   | `SaveRemote`              |
//! | `OnlyInLocal`    | `DeleteLocal` | `SaveRemote`              |
//! | `OnlyInRemote`   | `SaveLocal`   | `DeleteRemote` (gated)    |
//!
//! A change limited to relations that only matter to the other side is not
//! planned at all.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use projsync_diff::{ChangedFields, ResultState, Results};
use projsync_model::{ObjectKey, ObjectKind, ObjectState, Registry, RelationSide};

use crate::error::{Error, Errors, Result};

/// Name of the changed field holding relations
const RELATIONS_FIELD: &str = "relations";

/// Sync direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Remote to local
    Pull,
    /// Local to remote
    Push,
}

impl Direction {
    /// Relation side the destination cares about
    fn destination_side(self) -> RelationSide {
        match self {
            Self::Pull => RelationSide::Manifest,
            Self::Push => RelationSide::Api,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pull => write!(f, "pull"),
            Self::Push => write!(f, "push"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    SaveLocal,
    SaveRemote,
    DeleteLocal,
    DeleteRemote,
}

impl Operation {
    /// Whether the operation writes to the local tree
    pub fn is_local(self) -> bool {
        matches!(self, Self::SaveLocal | Self::DeleteLocal)
    }

    pub fn is_delete(self) -> bool {
        matches!(self, Self::DeleteLocal | Self::DeleteRemote)
    }

    pub fn verb(self) -> &'static str {
        match self {
            Self::SaveLocal => "save local",
            Self::SaveRemote => "save remote",
            Self::DeleteLocal => "delete local",
            Self::DeleteRemote => "delete remote",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// One planned change of one object
#[derive(Debug, Clone)]
pub struct Action {
    /// Snapshot of the state when the plan was built
    pub state: ObjectState,
    pub changed_fields: ChangedFields,
    pub result_state: ResultState,
    pub operation: Operation,
    /// Manifest path, or the key when the object has no local record yet
    pub path: String,
}

impl Action {
    pub fn key(&self) -> &ObjectKey {
        self.state.key()
    }

    pub fn kind(&self) -> ObjectKind {
        self.key().kind()
    }

    pub fn level(&self) -> usize {
        self.key().level()
    }

    /// Mark used in the rendered plan
    fn mark(&self) -> &'static str {
        if self.operation.is_delete() {
            "×"
        } else if self.result_state == ResultState::NotEqual {
            "CH"
        } else {
            "+"
        }
    }

    fn line(&self, skipped: bool) -> String {
        let mut line = format!("{:<2} {} {}", self.mark(), self.kind().abbr(), self.path);
        if self.result_state == ResultState::NotEqual && !self.changed_fields.is_empty() {
            line.push_str(&format!(" | changed: {}", self.changed_fields));
        }
        if skipped {
            line.push_str(" - SKIPPED");
        }
        line
    }
}

/// Action counts per operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub save_local: usize,
    pub save_remote: usize,
    pub delete_local: usize,
    pub delete_remote: usize,
    /// Remote deletions that will not run without `--force`
    pub skipped: usize,
}

impl PlanSummary {
    pub fn total(&self) -> usize {
        self.save_local + self.save_remote + self.delete_local + self.delete_remote
    }
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} local saves, {} remote saves, {} local deletes, {} remote deletes",
            self.save_local, self.save_remote, self.delete_local, self.delete_remote
        )?;
        if self.skipped > 0 {
            write!(f, " ({} skipped)", self.skipped)?;
        }
        Ok(())
    }
}

/// Ordered list of actions for one direction
#[derive(Debug, Clone)]
pub struct Plan {
    direction: Direction,
    actions: Vec<Action>,
    allow_remote_delete: bool,
}

impl Plan {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            actions: Vec::new(),
            allow_remote_delete: false,
        }
    }

    /// Build the plan for `direction` from diff results
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingState`] if a result has no state in the
    /// registry.
    pub fn build(direction: Direction, results: &Results, registry: &Registry) -> Result<Self> {
        let mut plan = Self::new(direction);

        for result in &results.results {
            let state = registry.get(&result.key).ok_or_else(|| Error::MissingState {
                key: result.key.clone(),
            })?;

            let operation = match (direction, result.state) {
                (_, ResultState::Equal) => None,
                (Direction::Pull, ResultState::NotEqual) => {
                    affects(&result.changed_fields, direction).then_some(Operation::SaveLocal)
                }
                (Direction::Push, ResultState::NotEqual) => {
                    affects(&result.changed_fields, direction).then_some(Operation::SaveRemote)
                }
                (Direction::Pull, ResultState::OnlyInLocal) => Some(Operation::DeleteLocal),
                (Direction::Pull, ResultState::OnlyInRemote) => Some(Operation::SaveLocal),
                (Direction::Push, ResultState::OnlyInLocal) => Some(Operation::SaveRemote),
                (Direction::Push, ResultState::OnlyInRemote) => {
                    // Deleting a whole subtree is planned at its root only
                    // when the ancestors still exist locally.
                    registry
                        .has_local_chain(&result.key)
                        .then_some(Operation::DeleteRemote)
                }
            };

            let Some(operation) = operation else {
                if result.state != ResultState::Equal {
                    debug!(key = %result.key.desc(), state = %result.state, "Not planned");
                }
                continue;
            };

            plan.actions.push(Action {
                state: state.clone(),
                changed_fields: result.changed_fields.clone(),
                result_state: result.state,
                operation,
                path: result.path.clone(),
            });
        }

        plan.sort();
        Ok(plan)
    }

    /// Pull plan: make the local tree match the remote project
    pub fn pull(results: &Results, registry: &Registry) -> Result<Self> {
        Self::build(Direction::Pull, results, registry)
    }

    /// Push plan: make the remote project match the local tree
    pub fn push(results: &Results, registry: &Registry) -> Result<Self> {
        Self::build(Direction::Push, results, registry)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn into_actions(self) -> Vec<Action> {
        self.actions
    }

    pub fn push_action(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn get(&self, key: &ObjectKey) -> Option<&Action> {
        self.actions.iter().find(|a| a.key() == key)
    }

    /// Allow or forbid execution of `DeleteRemote` actions
    pub fn set_allow_remote_delete(&mut self, allow: bool) {
        self.allow_remote_delete = allow;
    }

    pub fn allow_remote_delete(&self) -> bool {
        self.allow_remote_delete
    }

    /// Whether the action will be skipped at execution
    pub fn is_skipped(&self, action: &Action) -> bool {
        action.operation == Operation::DeleteRemote && !self.allow_remote_delete
    }

    /// Sort actions by path, then kind
    pub fn sort(&mut self) {
        self.actions.sort_by(|a, b| {
            a.path
                .cmp(&b.path)
                .then_with(|| a.kind().cmp(&b.kind()))
                .then_with(|| a.key().cmp(b.key()))
        });
    }

    /// Check the plan before execution
    ///
    /// # Errors
    ///
    /// Every remote deletion of a default branch is reported as
    /// [`Error::DefaultBranchDeletion`].
    pub fn validate(&self) -> Result<()> {
        let mut errors = Errors::new();
        for action in &self.actions {
            if action.operation != Operation::DeleteRemote {
                continue;
            }
            let is_default = action.state.remote().is_some_and(|o| o.is_default_branch())
                || action.state.local().is_some_and(|o| o.is_default_branch());
            if is_default {
                errors.push(Error::DefaultBranchDeletion {
                    key: action.key().clone(),
                });
            }
        }
        errors.into_result()
    }

    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for action in &self.actions {
            match action.operation {
                Operation::SaveLocal => summary.save_local += 1,
                Operation::SaveRemote => summary.save_remote += 1,
                Operation::DeleteLocal => summary.delete_local += 1,
                Operation::DeleteRemote => summary.delete_remote += 1,
            }
            if self.is_skipped(action) {
                summary.skipped += 1;
            }
        }
        summary
    }

    /// Render the plan
    pub fn format(&self) -> String {
        let mut out = vec![format!("Plan for \"{}\" operation:", self.direction)];
        if self.actions.is_empty() {
            out.push("  no difference".to_string());
            return out.join("\n");
        }

        let mut skipped = false;
        for action in &self.actions {
            let is_skipped = self.is_skipped(action);
            skipped |= is_skipped;
            out.push(format!("  {}", action.line(is_skipped)));
        }
        if skipped {
            out.push(String::new());
            out.push(
                "Skipped remote objects deletion, use \"--force\" to delete them.".to_string(),
            );
        }
        out.join("\n")
    }
}

/// Whether a `NotEqual` result changes anything the destination cares about
fn affects(changed: &ChangedFields, direction: Direction) -> bool {
    if changed.len() != 1 {
        return true;
    }
    match changed.get(RELATIONS_FIELD) {
        Some(relations) => relations.has_path(direction.destination_side().path()),
        None => true,
    }
}
