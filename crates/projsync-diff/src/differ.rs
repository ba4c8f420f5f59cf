//! The diff engine
//!
//! For every object state the engine classifies the pair of remote and local
//! views and, when both exist, compares every declared field with the
//! comparator matching its value type.

use projsync_model::{Object, ObjectState, Registry};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::fields::{Field, FieldValue, fields_for};
use crate::json::{diff_maps, format_changes};
use crate::relations::{diff_relations, format_side_diffs};
use crate::render::{
    render_orchestration, render_shared_code_config, render_shared_code_row,
    render_transformation,
};
use crate::result::{ChangedFields, DiffResult, ResultState, Results};
use crate::text::{DEFAULT_CONTEXT_LINES, diff_text};

/// Options for the diff engine
#[derive(Debug, Clone, Copy)]
pub struct DiffOptions {
    /// Unchanged lines kept around each change in text diffs
    pub context_lines: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            context_lines: DEFAULT_CONTEXT_LINES,
        }
    }
}

/// Rendered difference of one field
struct FieldDiff {
    text: String,
    paths: Vec<String>,
}

/// Compares remote and local views of object states
#[derive(Debug, Clone, Default)]
pub struct Differ {
    options: DiffOptions,
}

impl Differ {
    pub fn new(options: DiffOptions) -> Self {
        Self { options }
    }

    /// Diff every state in the registry
    pub fn diff(&self, registry: &Registry) -> Results {
        self.diff_states(registry.states())
    }

    /// Diff a collection of states
    ///
    /// Comparison errors are collected in [`Results::errors`]; the remaining
    /// states are still diffed.
    pub fn diff_states<'a>(&self, states: impl IntoIterator<Item = &'a ObjectState>) -> Results {
        let mut results = Vec::new();
        let mut errors = Vec::new();

        for state in states {
            match self.diff_state(state) {
                Ok(Some(result)) => {
                    if result.state != ResultState::Equal {
                        debug!(
                            key = %result.key,
                            state = %result.state,
                            changed = %result.changed_fields,
                            "Object differs"
                        );
                    }
                    results.push(result);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(key = %state.key(), error = %e, "Diff failed");
                    errors.push(e);
                }
            }
        }

        let equal = errors.is_empty() && results.iter().all(|r| r.state == ResultState::Equal);
        Results {
            equal,
            results,
            errors,
        }
    }

    /// Diff one state
    ///
    /// Returns `None` for a state holding only a manifest record.
    pub fn diff_state(&self, state: &ObjectState) -> Result<Option<DiffResult>> {
        state.validate().map_err(|source| Error::InvalidState {
            key: state.key().clone(),
            source,
        })?;

        let (result_state, changed_fields) = match (state.remote(), state.local()) {
            (Some(remote), Some(local)) => {
                let changed = self.diff_objects(remote, local)?;
                let result_state = if changed.is_empty() {
                    ResultState::Equal
                } else {
                    ResultState::NotEqual
                };
                (result_state, changed)
            }
            (Some(_), None) => (ResultState::OnlyInRemote, ChangedFields::new()),
            (None, Some(_)) => (ResultState::OnlyInLocal, ChangedFields::new()),
            (None, None) => return Ok(None),
        };

        Ok(Some(DiffResult {
            key: state.key().clone(),
            path: state
                .path()
                .map(str::to_string)
                .unwrap_or_else(|| state.key().to_string()),
            state: result_state,
            changed_fields,
        }))
    }

    /// Compare two objects of the same kind field by field
    pub fn diff_objects(&self, remote: &Object, local: &Object) -> Result<ChangedFields> {
        if remote.kind() != local.kind() {
            return Err(Error::KindMismatch {
                key: local.key(),
                remote: remote.kind(),
                local: local.kind(),
            });
        }

        let mut changed = ChangedFields::new();
        for &field in fields_for(remote.kind()) {
            let undeclared = |object: &Object| Error::UndeclaredField {
                key: object.key(),
                kind: object.kind(),
                field: field.name(),
            };
            let r = field.value(remote).ok_or_else(|| undeclared(remote))?;
            let l = field.value(local).ok_or_else(|| undeclared(local))?;

            if let Some(diff) = self.compare(remote, field, r, l)? {
                let entry = changed.add(field.name());
                entry.set_diff(diff.text);
                for path in diff.paths {
                    entry.add_path(path);
                }
            }
        }
        Ok(changed)
    }

    fn compare(
        &self,
        object: &Object,
        field: Field,
        remote: FieldValue<'_>,
        local: FieldValue<'_>,
    ) -> Result<Option<FieldDiff>> {
        let context = self.options.context_lines;
        let text_only = |text: Option<String>| {
            text.map(|text| FieldDiff {
                text,
                paths: Vec::new(),
            })
        };

        let diff = match (remote, local) {
            (FieldValue::Bool(r), FieldValue::Bool(l)) => {
                text_only((r != l).then(|| format!("- {r}\n+ {l}")))
            }
            (FieldValue::Text(r), FieldValue::Text(l)) => text_only(diff_text(r, l, context)),
            (FieldValue::Map(r), FieldValue::Map(l)) => {
                let changes = diff_maps(r, l);
                (!changes.is_empty()).then(|| FieldDiff {
                    text: format_changes(&changes, context),
                    paths: changes.into_iter().map(|c| c.path).collect(),
                })
            }
            (FieldValue::Relations(r), FieldValue::Relations(l)) => {
                let sides = diff_relations(r, l);
                (!sides.is_empty()).then(|| FieldDiff {
                    text: format_side_diffs(&sides),
                    paths: sides.iter().map(|s| s.side.path().to_string()).collect(),
                })
            }
            (FieldValue::Orchestration(r), FieldValue::Orchestration(l)) => {
                text_only(diff_rendered(r, l, render_orchestration, context))
            }
            (FieldValue::Transformation(r), FieldValue::Transformation(l)) => {
                text_only(diff_rendered(r, l, render_transformation, context))
            }
            (FieldValue::SharedCodeConfig(r), FieldValue::SharedCodeConfig(l)) => {
                text_only(diff_rendered(r, l, render_shared_code_config, context))
            }
            (FieldValue::SharedCodeRow(r), FieldValue::SharedCodeRow(l)) => {
                text_only(diff_rendered(r, l, render_shared_code_row, context))
            }
            (r, l) => {
                return Err(Error::TypeMismatch {
                    key: object.key(),
                    field: field.name(),
                    remote: r.type_name(),
                    local: l.type_name(),
                });
            }
        };
        Ok(diff)
    }
}

/// Diff two rendered structures, either of which may be absent
fn diff_rendered<T: PartialEq>(
    remote: Option<&T>,
    local: Option<&T>,
    render: impl Fn(&T) -> String,
    context: usize,
) -> Option<String> {
    if remote == local {
        return None;
    }
    let remote = remote.map(&render).unwrap_or_default();
    let local = local.map(&render).unwrap_or_default();
    diff_text(&remote, &local, context)
}
