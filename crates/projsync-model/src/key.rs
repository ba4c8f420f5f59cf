//! Hierarchical object keys
//!
//! Every object in a project is identified by an [`ObjectKey`]. Keys form a
//! strict chain `Branch → Config → ConfigRow`: a child key embeds the ids of
//! all of its ancestors, so the parent of any key can be derived without a
//! lookup.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric id of a development branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchId(pub u64);

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(
    /// Id of a component, e.g. `keboola.ex-db-mysql`
    ComponentId
);
string_id!(
    /// Id of a configuration, unique within a component
    ConfigId
);
string_id!(
    /// Id of a configuration row, unique within a configuration
    RowId
);

/// Kind of an object, ordered by hierarchy level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Branch,
    Config,
    ConfigRow,
}

impl ObjectKind {
    /// All kinds, parents first
    pub const ALL: [ObjectKind; 3] = [
        ObjectKind::Branch,
        ObjectKind::Config,
        ObjectKind::ConfigRow,
    ];

    /// Depth in the hierarchy, `0` for branches
    pub fn level(self) -> usize {
        match self {
            Self::Branch => 0,
            Self::Config => 1,
            Self::ConfigRow => 2,
        }
    }

    /// One-letter abbreviation used in diff and plan output
    pub fn abbr(self) -> &'static str {
        match self {
            Self::Branch => "B",
            Self::Config => "C",
            Self::ConfigRow => "R",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Branch => write!(f, "branch"),
            Self::Config => write!(f, "config"),
            Self::ConfigRow => write!(f, "config row"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BranchKey {
    pub id: BranchId,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConfigKey {
    pub branch_id: BranchId,
    pub component_id: ComponentId,
    pub id: ConfigId,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConfigRowKey {
    pub branch_id: BranchId,
    pub component_id: ComponentId,
    pub config_id: ConfigId,
    pub id: RowId,
}

impl BranchKey {
    pub fn new(id: u64) -> Self {
        Self { id: BranchId(id) }
    }
}

impl ConfigKey {
    pub fn new(branch_id: u64, component_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            branch_id: BranchId(branch_id),
            component_id: ComponentId::new(component_id),
            id: ConfigId::new(id),
        }
    }

    pub fn branch_key(&self) -> BranchKey {
        BranchKey { id: self.branch_id }
    }

    /// Key of a row belonging to this config
    pub fn row(&self, id: impl Into<String>) -> ConfigRowKey {
        ConfigRowKey {
            branch_id: self.branch_id,
            component_id: self.component_id.clone(),
            config_id: self.id.clone(),
            id: RowId::new(id),
        }
    }
}

impl ConfigRowKey {
    pub fn config_key(&self) -> ConfigKey {
        ConfigKey {
            branch_id: self.branch_id,
            component_id: self.component_id.clone(),
            id: self.config_id.clone(),
        }
    }
}

/// Key of any object in the project
///
/// The derived ordering sorts branches before configs before rows, which is
/// also the order in which parents must be created.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectKey {
    Branch(BranchKey),
    Config(ConfigKey),
    ConfigRow(ConfigRowKey),
}

impl ObjectKey {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Branch(_) => ObjectKind::Branch,
            Self::Config(_) => ObjectKind::Config,
            Self::ConfigRow(_) => ObjectKind::ConfigRow,
        }
    }

    pub fn level(&self) -> usize {
        self.kind().level()
    }

    pub fn branch_id(&self) -> BranchId {
        match self {
            Self::Branch(k) => k.id,
            Self::Config(k) => k.branch_id,
            Self::ConfigRow(k) => k.branch_id,
        }
    }

    /// Key of the direct parent, `None` for branches
    pub fn parent(&self) -> Option<ObjectKey> {
        match self {
            Self::Branch(_) => None,
            Self::Config(k) => Some(Self::Branch(k.branch_key())),
            Self::ConfigRow(k) => Some(Self::Config(k.config_key())),
        }
    }

    /// All ancestors, nearest first
    pub fn ancestors(&self) -> Vec<ObjectKey> {
        let mut out = Vec::new();
        let mut current = self.parent();
        while let Some(key) = current {
            current = key.parent();
            out.push(key);
        }
        out
    }

    /// Whether `self` is a strict ancestor of `other`
    pub fn is_ancestor_of(&self, other: &ObjectKey) -> bool {
        other.ancestors().iter().any(|a| a == self)
    }

    /// Compact form for log fields, e.g. `R:1/keboola.ex-db/100/200`
    pub fn desc(&self) -> String {
        match self {
            Self::Branch(k) => format!("B:{}", k.id),
            Self::Config(k) => format!("C:{}/{}/{}", k.branch_id, k.component_id, k.id),
            Self::ConfigRow(k) => format!(
                "R:{}/{}/{}/{}",
                k.branch_id, k.component_id, k.config_id, k.id
            ),
        }
    }
}

impl From<BranchKey> for ObjectKey {
    fn from(key: BranchKey) -> Self {
        Self::Branch(key)
    }
}

impl From<ConfigKey> for ObjectKey {
    fn from(key: ConfigKey) -> Self {
        Self::Config(key)
    }
}

impl From<ConfigRowKey> for ObjectKey {
    fn from(key: ConfigRowKey) -> Self {
        Self::ConfigRow(key)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Branch(k) => write!(f, "branch \"{}\"", k.id),
            Self::Config(k) => write!(
                f,
                "config \"branch:{}/component:{}/config:{}\"",
                k.branch_id, k.component_id, k.id
            ),
            Self::ConfigRow(k) => write!(
                f,
                "config row \"branch:{}/component:{}/config:{}/row:{}\"",
                k.branch_id, k.component_id, k.config_id, k.id
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_key() -> ObjectKey {
        ConfigKey::new(1, "keboola.ex-db", "100").row("200").into()
    }

    #[test]
    fn test_parent_chain() {
        let row = row_key();
        let config = row.parent().unwrap();
        let branch = config.parent().unwrap();

        assert_eq!(config, ObjectKey::Config(ConfigKey::new(1, "keboola.ex-db", "100")));
        assert_eq!(branch, ObjectKey::Branch(BranchKey::new(1)));
        assert!(branch.parent().is_none());
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let ancestors = row_key().ancestors();
        assert_eq!(ancestors.len(), 2);
        assert_eq!(ancestors[0].kind(), ObjectKind::Config);
        assert_eq!(ancestors[1].kind(), ObjectKind::Branch);
    }

    #[test]
    fn test_is_ancestor_of() {
        let row = row_key();
        let branch = ObjectKey::Branch(BranchKey::new(1));
        let other_branch = ObjectKey::Branch(BranchKey::new(2));

        assert!(branch.is_ancestor_of(&row));
        assert!(!other_branch.is_ancestor_of(&row));
        assert!(!row.is_ancestor_of(&row));
    }

    #[test]
    fn test_ordering_parents_first() {
        let mut keys = vec![
            row_key(),
            ObjectKey::Config(ConfigKey::new(1, "keboola.ex-db", "100")),
            ObjectKey::Branch(BranchKey::new(1)),
        ];
        keys.sort();
        let kinds: Vec<_> = keys.iter().map(ObjectKey::kind).collect();
        assert_eq!(kinds, ObjectKind::ALL.to_vec());
    }

    #[test]
    fn test_display() {
        assert_eq!(ObjectKey::Branch(BranchKey::new(7)).to_string(), "branch \"7\"");
        assert_eq!(
            row_key().to_string(),
            "config row \"branch:1/component:keboola.ex-db/config:100/row:200\""
        );
    }

    #[test]
    fn test_desc() {
        assert_eq!(ObjectKey::Branch(BranchKey::new(7)).desc(), "B:7");
        assert_eq!(row_key().desc(), "R:1/keboola.ex-db/100/200");
    }

    #[test]
    fn test_serde_tagged() {
        let key = ObjectKey::Config(ConfigKey::new(1, "ex", "2"));
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(json["kind"], "config");
        assert_eq!(json["component_id"], "ex");
        let back: ObjectKey = serde_json::from_value(json).unwrap();
        assert_eq!(back, key);
    }
}
