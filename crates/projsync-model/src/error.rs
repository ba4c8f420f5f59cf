//! Error types for projsync-model

use crate::key::{ObjectKey, ObjectKind};

/// Result type for projsync-model operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in projsync-model operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A state without remote, local and manifest views
    #[error("State of {key} has no remote, local or manifest view")]
    EmptyState { key: ObjectKey },

    /// An object was attached to a state with a different key
    #[error("Key mismatch: state is {expected}, object is {actual}")]
    KeyMismatch {
        expected: ObjectKey,
        actual: ObjectKey,
    },

    /// Local and remote objects of one state are of different kinds
    #[error("Kind mismatch for {key}: remote is {remote}, local is {local}")]
    KindMismatch {
        key: ObjectKey,
        remote: ObjectKind,
        local: ObjectKind,
    },

    /// Object missing from the registry
    #[error("Object not found in registry: {0}")]
    NotFound(ObjectKey),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}
