//! Orchestration structure of an orchestrator config

use serde::{Deserialize, Serialize};

use crate::key::{ComponentId, ConfigId};
use crate::object::JsonMap;

/// Ordered phases of an orchestration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Orchestration {
    #[serde(default)]
    pub phases: Vec<Phase>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    /// Names of the phases this phase waits for
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub content: JsonMap,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    pub enabled: bool,
    pub component_id: ComponentId,
    /// Target config, absent when the task carries inline configuration
    pub config_id: Option<ConfigId>,
    #[serde(default)]
    pub content: JsonMap,
}

impl Phase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn depends_on(mut self, phase: impl Into<String>) -> Self {
        self.depends_on.push(phase.into());
        self
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }
}

impl Task {
    pub fn new(
        name: impl Into<String>,
        component_id: impl Into<String>,
        config_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            component_id: ComponentId::new(component_id),
            config_id: Some(ConfigId::new(config_id)),
            content: JsonMap::new(),
        }
    }
}
