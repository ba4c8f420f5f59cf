//! Typed objects of a project

use serde::{Deserialize, Serialize};

use crate::key::{
    BranchId, BranchKey, ComponentId, ConfigId, ConfigKey, ConfigRowKey, ObjectKey, ObjectKind,
    RowId,
};
use crate::orchestration::Orchestration;
use crate::relation::Relations;
use crate::transformation::{SharedCodeConfig, SharedCodeRow, Transformation};

/// JSON object preserving key order, compared order-insensitively
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub branch_id: BranchId,
    pub component_id: ComponentId,
    pub id: ConfigId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_disabled: bool,
    #[serde(default)]
    pub content: JsonMap,
    #[serde(default)]
    pub relations: Relations,
    #[serde(default)]
    pub orchestration: Option<Orchestration>,
    #[serde(default)]
    pub transformation: Option<Transformation>,
    #[serde(default)]
    pub shared_code: Option<SharedCodeConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigRow {
    pub branch_id: BranchId,
    pub component_id: ComponentId,
    pub config_id: ConfigId,
    pub id: RowId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_disabled: bool,
    #[serde(default)]
    pub content: JsonMap,
    #[serde(default)]
    pub relations: Relations,
    #[serde(default)]
    pub shared_code: Option<SharedCodeRow>,
}

impl Branch {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: BranchId(id),
            name: name.into(),
            description: String::new(),
            is_default: false,
        }
    }

    pub fn default_branch(id: u64, name: impl Into<String>) -> Self {
        Self {
            is_default: true,
            ..Self::new(id, name)
        }
    }

    pub fn key(&self) -> BranchKey {
        BranchKey { id: self.id }
    }
}

impl Config {
    pub fn new(key: &ConfigKey, name: impl Into<String>) -> Self {
        Self {
            branch_id: key.branch_id,
            component_id: key.component_id.clone(),
            id: key.id.clone(),
            name: name.into(),
            description: String::new(),
            is_disabled: false,
            content: JsonMap::new(),
            relations: Relations::new(),
            orchestration: None,
            transformation: None,
            shared_code: None,
        }
    }

    pub fn key(&self) -> ConfigKey {
        ConfigKey {
            branch_id: self.branch_id,
            component_id: self.component_id.clone(),
            id: self.id.clone(),
        }
    }
}

impl ConfigRow {
    pub fn new(key: &ConfigRowKey, name: impl Into<String>) -> Self {
        Self {
            branch_id: key.branch_id,
            component_id: key.component_id.clone(),
            config_id: key.config_id.clone(),
            id: key.id.clone(),
            name: name.into(),
            description: String::new(),
            is_disabled: false,
            content: JsonMap::new(),
            relations: Relations::new(),
            shared_code: None,
        }
    }

    pub fn key(&self) -> ConfigRowKey {
        ConfigRowKey {
            branch_id: self.branch_id,
            component_id: self.component_id.clone(),
            config_id: self.config_id.clone(),
            id: self.id.clone(),
        }
    }
}

/// Payload of any object in the project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Object {
    Branch(Branch),
    Config(Config),
    ConfigRow(ConfigRow),
}

impl Object {
    pub fn key(&self) -> ObjectKey {
        match self {
            Self::Branch(o) => ObjectKey::Branch(o.key()),
            Self::Config(o) => ObjectKey::Config(o.key()),
            Self::ConfigRow(o) => ObjectKey::ConfigRow(o.key()),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Branch(_) => ObjectKind::Branch,
            Self::Config(_) => ObjectKind::Config,
            Self::ConfigRow(_) => ObjectKind::ConfigRow,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Branch(o) => &o.name,
            Self::Config(o) => &o.name,
            Self::ConfigRow(o) => &o.name,
        }
    }

    /// Relations of the object, `None` for branches
    pub fn relations(&self) -> Option<&Relations> {
        match self {
            Self::Branch(_) => None,
            Self::Config(o) => Some(&o.relations),
            Self::ConfigRow(o) => Some(&o.relations),
        }
    }

    pub fn relations_mut(&mut self) -> Option<&mut Relations> {
        match self {
            Self::Branch(_) => None,
            Self::Config(o) => Some(&mut o.relations),
            Self::ConfigRow(o) => Some(&mut o.relations),
        }
    }

    /// Whether this is a branch flagged as the project default
    pub fn is_default_branch(&self) -> bool {
        matches!(self, Self::Branch(b) if b.is_default)
    }

    pub fn as_branch(&self) -> Option<&Branch> {
        match self {
            Self::Branch(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_config(&self) -> Option<&Config> {
        match self {
            Self::Config(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_config_row(&self) -> Option<&ConfigRow> {
        match self {
            Self::ConfigRow(o) => Some(o),
            _ => None,
        }
    }
}

impl From<Branch> for Object {
    fn from(o: Branch) -> Self {
        Self::Branch(o)
    }
}

impl From<Config> for Object {
    fn from(o: Config) -> Self {
        Self::Config(o)
    }
}

impl From<ConfigRow> for Object {
    fn from(o: ConfigRow) -> Self {
        Self::ConfigRow(o)
    }
}
