//! Error types for projsync-core

use std::fmt;
use std::path::PathBuf;

use projsync_model::ObjectKey;

/// Result type for projsync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while planning and applying a sync
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A diff result refers to a key the registry does not know
    #[error("No state found for {key}")]
    MissingState { key: ObjectKey },

    /// The plan would delete the default branch remotely
    #[error("Cannot delete the default {key}")]
    DefaultBranchDeletion { key: ObjectKey },

    /// An action lacks the view it needs to be applied
    #[error("Cannot {operation} {key}: {reason}")]
    InvalidAction {
        key: ObjectKey,
        operation: &'static str,
        reason: String,
    },

    /// The run was cancelled before all actions were dispatched
    #[error("Operation cancelled")]
    Cancelled,

    /// A backend call failed
    #[error("Backend error on {key}: {message}")]
    Backend { key: ObjectKey, message: String },

    /// A backend load failed for a reason not tied to one object
    #[error("Load failed: {message}")]
    Load { message: String },

    /// An object was expected in a backend but is absent
    #[error("Not found: {0}")]
    NotFound(ObjectKey),

    /// A mapper hook failed
    #[error("Mapper \"{mapper}\" failed: {source}")]
    Mapper {
        mapper: String,
        #[source]
        source: Box<Error>,
    },

    /// A mapper rejected an object
    #[error("{message}")]
    Rejected { message: String },

    /// Configuration file not found at expected path
    #[error("Configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration values are out of range
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Several errors collected from independent operations
    #[error(transparent)]
    Multiple(Errors),

    // Transparent wrappers for underlying crate errors
    /// Object model error from projsync-model
    #[error(transparent)]
    Model(#[from] projsync_model::Error),

    /// Comparison error from projsync-diff
    #[error(transparent)]
    Diff(#[from] projsync_diff::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
}

impl Error {
    pub fn backend(key: ObjectKey, message: impl Into<String>) -> Self {
        Self::Backend {
            key,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

/// Aggregate of errors collected without failing fast
#[derive(Debug, Default)]
pub struct Errors(Vec<Error>);

impl Errors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: impl Into<Error>) {
        match error.into() {
            Error::Multiple(inner) => self.0.extend(inner.0),
            error => self.0.push(error),
        }
    }

    pub fn extend(&mut self, errors: impl IntoIterator<Item = Error>) {
        for error in errors {
            self.push(error);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Error> {
        self.0.iter()
    }

    /// `Ok` when empty, the single error when there is one, otherwise
    /// [`Error::Multiple`]
    pub fn into_result(mut self) -> Result<()> {
        match self.0.len() {
            0 => Ok(()),
            1 => Err(self.0.remove(0)),
            _ => Err(Error::Multiple(self)),
        }
    }
}

impl IntoIterator for Errors {
    type Item = Error;
    type IntoIter = std::vec::IntoIter<Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => write!(f, "no errors"),
            [single] => write!(f, "{single}"),
            many => {
                write!(f, "{} errors occurred:", many.len())?;
                for error in many {
                    write!(f, "\n- {error}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Errors {}

#[cfg(test)]
mod tests {
    use super::*;
    use projsync_model::BranchKey;

    #[test]
    fn test_into_result() {
        assert!(Errors::new().into_result().is_ok());

        let mut one = Errors::new();
        one.push(Error::Cancelled);
        assert!(matches!(one.into_result(), Err(Error::Cancelled)));

        let mut many = Errors::new();
        many.push(Error::Cancelled);
        many.push(Error::NotFound(BranchKey::new(1).into()));
        assert!(matches!(many.into_result(), Err(Error::Multiple(e)) if e.len() == 2));
    }

    #[test]
    fn test_push_flattens_nested() {
        let mut inner = Errors::new();
        inner.push(Error::Cancelled);
        inner.push(Error::Cancelled);

        let mut outer = Errors::new();
        outer.push(Error::Multiple(inner));
        assert_eq!(outer.len(), 2);
    }

    #[test]
    fn test_display_bullets() {
        let mut errors = Errors::new();
        errors.push(Error::Cancelled);
        errors.push(Error::NotFound(BranchKey::new(1).into()));
        assert_eq!(
            errors.to_string(),
            "2 errors occurred:\n- Operation cancelled\n- Not found: branch \"1\""
        );
    }
}
