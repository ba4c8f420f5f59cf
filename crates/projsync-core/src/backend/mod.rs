//! Backend abstraction
//!
//! The engine talks to the local tree and to the remote project only through
//! [`LocalBackend`] and [`RemoteBackend`]. Backends own their mapper pipeline
//! and call its hooks while loading and saving; the engine never invokes a
//! mapper directly.

mod memory;
mod naming;

pub use memory::{MemoryLocal, MemoryRemote, RemoteWrite, StoredObject};
pub use naming::{DefaultNaming, NamingResolver};

use projsync_model::{Manifest, ManifestRecord, Object, ObjectKey, ObjectState};

use crate::error::{Errors, Result};
use crate::mapper::{MapperContext, RemoteChanges};

/// States produced by a full load, with the errors of objects that failed
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub states: Vec<ObjectState>,
    pub errors: Errors,
    /// Local saves requested by remote change hooks during the load
    pub local_saves: Vec<ObjectKey>,
}

impl LoadOutcome {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// The states, or the collected errors if any object failed
    pub fn into_result(self) -> Result<Vec<ObjectState>> {
        self.errors.into_result()?;
        Ok(self.states)
    }
}

/// The local directory tree
pub trait LocalBackend: Send + Sync {
    /// Load every object recorded in the manifest
    ///
    /// A record whose object is missing on disk yields a state holding only
    /// the record, flagged `not_found`.
    fn load_all(&self, ctx: &MapperContext<'_>, manifest: &Manifest) -> LoadOutcome;

    /// Write an object at the path of its record
    fn save(&self, ctx: &MapperContext<'_>, record: &ManifestRecord, object: &Object)
    -> Result<()>;

    /// Remove the object directory of a record
    ///
    /// Deleting a directory that no longer exists succeeds.
    fn delete(&self, record: &ManifestRecord) -> Result<()>;
}

/// The remote project
pub trait RemoteBackend: Send + Sync {
    /// Load every object of the project
    fn load_all(&self, ctx: &MapperContext<'_>) -> LoadOutcome;

    /// Create or update an object, returning the object as stored remotely
    fn save(&self, object: &Object, change_description: &str) -> Result<Object>;

    /// Delete an object and everything below it
    fn delete(&self, key: &ObjectKey, change_description: &str) -> Result<()>;

    /// Run the remote change hooks over a finished batch of writes
    fn after_batch(&self, ctx: &MapperContext<'_>, changes: RemoteChanges)
    -> Result<RemoteChanges>;
}
