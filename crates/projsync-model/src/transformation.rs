//! Transformation and shared code structures

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::key::{ComponentId, RowId};

/// Code blocks of a transformation config
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transformation {
    #[serde(default)]
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub name: String,
    #[serde(default)]
    pub codes: Vec<Code>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Code {
    pub name: String,
    #[serde(default)]
    pub scripts: Vec<Script>,
}

/// One script of a code
///
/// A script is either inline text or a link to a shared code row, resolved by
/// a mapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Script {
    Static { content: String },
    SharedCodeLink { row_id: RowId },
}

impl Script {
    pub fn new(content: impl Into<String>) -> Self {
        Self::Static {
            content: content.into(),
        }
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static { content } => f.write_str(content.trim_end()),
            Self::SharedCodeLink { row_id } => write!(f, "{{{{:codes/{row_id}}}}}"),
        }
    }
}

impl Block {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            codes: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: Code) -> Self {
        self.codes.push(code);
        self
    }
}

impl Code {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scripts: Vec::new(),
        }
    }

    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.scripts.push(Script::new(script));
        self
    }
}

/// Shared code config: the component its rows may be linked from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedCodeConfig {
    pub target_component_id: ComponentId,
}

/// Shared code row: one reusable code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedCodeRow {
    pub target_component_id: ComponentId,
    #[serde(default)]
    pub scripts: Vec<Script>,
}
