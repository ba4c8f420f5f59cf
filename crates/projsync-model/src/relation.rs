//! Relations between objects
//!
//! A relation is a typed link from the owning object to another object. Each
//! variant is observed from exactly one side: either the remote API exposes it
//! (e.g. a config referencing its variables in its content) or only the local
//! manifest records it (e.g. the variables config pointing back to its owner).
//! The two sides are sourced independently, so they are compared separately.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::key::{ComponentId, ConfigId, RowId};

/// Side from which a relation is observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationSide {
    /// Defined by the remote API
    Api,
    /// Defined only in the local manifest
    Manifest,
}

impl RelationSide {
    pub const ALL: [RelationSide; 2] = [RelationSide::Api, RelationSide::Manifest];

    /// Path name recorded in changed fields for this side
    pub fn path(self) -> &'static str {
        match self {
            Self::Api => "in_api",
            Self::Manifest => "in_manifest",
        }
    }
}

impl fmt::Display for RelationSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A typed link to another object
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Relation {
    /// Variables config belongs to the given config
    VariablesFor {
        component_id: ComponentId,
        config_id: ConfigId,
    },
    /// Config uses the given variables config
    VariablesFrom { variables_id: ConfigId },
    /// Config uses the given values row of its variables config
    VariablesValuesFrom { values_id: RowId },
    /// Variables config belongs to the given shared code row
    SharedCodeVariablesFor {
        config_id: ConfigId,
        row_id: RowId,
    },
    /// Shared code row uses the given variables config
    SharedCodeVariablesFrom { variables_id: ConfigId },
    /// Scheduler config targets the given config
    SchedulerFor {
        component_id: ComponentId,
        config_id: ConfigId,
    },
}

impl Relation {
    pub fn side(&self) -> RelationSide {
        match self {
            Self::VariablesFor { .. } | Self::SharedCodeVariablesFor { .. } => {
                RelationSide::Manifest
            }
            Self::VariablesFrom { .. }
            | Self::VariablesValuesFrom { .. }
            | Self::SharedCodeVariablesFrom { .. }
            | Self::SchedulerFor { .. } => RelationSide::Api,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VariablesFor {
                component_id,
                config_id,
            } => write!(f, "variables for \"{component_id}/{config_id}\""),
            Self::VariablesFrom { variables_id } => write!(f, "variables from \"{variables_id}\""),
            Self::VariablesValuesFrom { values_id } => {
                write!(f, "variables values from \"{values_id}\"")
            }
            Self::SharedCodeVariablesFor { config_id, row_id } => {
                write!(f, "shared code variables for \"{config_id}/{row_id}\"")
            }
            Self::SharedCodeVariablesFrom { variables_id } => {
                write!(f, "shared code variables from \"{variables_id}\"")
            }
            Self::SchedulerFor {
                component_id,
                config_id,
            } => write!(f, "scheduler for \"{component_id}/{config_id}\""),
        }
    }
}

/// Relations owned by one object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Relations(Vec<Relation>);

impl Relations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, relation: Relation) {
        if !self.0.contains(&relation) {
            self.0.push(relation);
        }
    }

    pub fn remove(&mut self, relation: &Relation) -> bool {
        let before = self.0.len();
        self.0.retain(|r| r != relation);
        before != self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relation> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Relations of one side, sorted and deduplicated
    pub fn on_side(&self, side: RelationSide) -> Vec<&Relation> {
        let mut out: Vec<&Relation> = self.0.iter().filter(|r| r.side() == side).collect();
        out.sort();
        out.dedup();
        out
    }
}

impl FromIterator<Relation> for Relations {
    fn from_iter<I: IntoIterator<Item = Relation>>(iter: I) -> Self {
        let mut relations = Relations::new();
        for relation in iter {
            relations.add(relation);
        }
        relations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sides() {
        let owner = Relation::VariablesFrom {
            variables_id: ConfigId::new("v1"),
        };
        let back = Relation::VariablesFor {
            component_id: ComponentId::new("ex"),
            config_id: ConfigId::new("c1"),
        };
        assert_eq!(owner.side(), RelationSide::Api);
        assert_eq!(back.side(), RelationSide::Manifest);
    }

    #[test]
    fn test_on_side_is_sorted_and_filtered() {
        let relations: Relations = [
            Relation::VariablesValuesFrom {
                values_id: RowId::new("r"),
            },
            Relation::VariablesFor {
                component_id: ComponentId::new("ex"),
                config_id: ConfigId::new("c1"),
            },
            Relation::VariablesFrom {
                variables_id: ConfigId::new("v1"),
            },
        ]
        .into_iter()
        .collect();

        let api = relations.on_side(RelationSide::Api);
        assert_eq!(api.len(), 2);
        assert!(matches!(api[0], Relation::VariablesFrom { .. }));
        assert_eq!(relations.on_side(RelationSide::Manifest).len(), 1);
    }

    #[test]
    fn test_add_deduplicates() {
        let mut relations = Relations::new();
        let r = Relation::VariablesFrom {
            variables_id: ConfigId::new("v1"),
        };
        relations.add(r.clone());
        relations.add(r.clone());
        assert_eq!(relations.len(), 1);
        assert!(relations.remove(&r));
        assert!(relations.is_empty());
    }
}
