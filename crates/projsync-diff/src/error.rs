//! Error types for projsync-diff

use projsync_model::{ObjectKey, ObjectKind};

/// Result type for projsync-diff operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comparison errors
///
/// These are collected per object and never stop the diff of other objects.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The state itself violates its invariants
    #[error("Cannot diff {key}: {source}")]
    InvalidState {
        key: ObjectKey,
        #[source]
        source: projsync_model::Error,
    },

    /// Remote and local objects are of different kinds
    #[error("Cannot diff {key}: remote is a {remote}, local is a {local}")]
    KindMismatch {
        key: ObjectKey,
        remote: ObjectKind,
        local: ObjectKind,
    },

    /// A declared field yielded values of different types on the two sides
    #[error("Cannot diff field \"{field}\" of {key}: remote is {remote}, local is {local}")]
    TypeMismatch {
        key: ObjectKey,
        field: &'static str,
        remote: &'static str,
        local: &'static str,
    },

    /// A field declared for the kind is not available on the object
    #[error("Field \"{field}\" is not declared for {kind} {key}")]
    UndeclaredField {
        key: ObjectKey,
        kind: ObjectKind,
        field: &'static str,
    },
}
