//! Backends failing on chosen keys.
//!
//! Both wrap the shared in-memory backends, so everything that does not fail
//! still lands where a [`TestProject`](crate::TestProject) can see it.

use std::collections::HashSet;
use std::sync::Arc;

use projsync_core::{
    Error, LoadOutcome, LocalBackend, MapperContext, MemoryLocal, MemoryRemote, RemoteBackend,
    RemoteChanges, Result,
};
use projsync_model::{Manifest, ManifestRecord, Object, ObjectKey};

fn injected(keys: &HashSet<ObjectKey>, key: &ObjectKey) -> Result<()> {
    if keys.contains(key) {
        return Err(Error::backend(key.clone(), "injected failure"));
    }
    Ok(())
}

/// Local tree whose saves and deletes fail for chosen keys.
pub struct FailingLocal {
    inner: Arc<MemoryLocal>,
    fail_on: HashSet<ObjectKey>,
}

impl FailingLocal {
    pub fn new(inner: Arc<MemoryLocal>) -> Self {
        Self {
            inner,
            fail_on: HashSet::new(),
        }
    }

    /// Fail every write of `key`.
    pub fn fail_on(mut self, key: impl Into<ObjectKey>) -> Self {
        self.fail_on.insert(key.into());
        self
    }
}

impl LocalBackend for FailingLocal {
    fn load_all(&self, ctx: &MapperContext<'_>, manifest: &Manifest) -> LoadOutcome {
        self.inner.load_all(ctx, manifest)
    }

    fn save(
        &self,
        ctx: &MapperContext<'_>,
        record: &ManifestRecord,
        object: &Object,
    ) -> Result<()> {
        injected(&self.fail_on, &record.key)?;
        self.inner.save(ctx, record, object)
    }

    fn delete(&self, record: &ManifestRecord) -> Result<()> {
        injected(&self.fail_on, &record.key)?;
        self.inner.delete(record)
    }
}

/// Remote project whose writes fail for chosen keys.
pub struct FailingRemote {
    inner: Arc<MemoryRemote>,
    fail_on: HashSet<ObjectKey>,
    fail_load: bool,
}

impl FailingRemote {
    pub fn new(inner: Arc<MemoryRemote>) -> Self {
        Self {
            inner,
            fail_on: HashSet::new(),
            fail_load: false,
        }
    }

    /// Fail every write of `key`.
    pub fn fail_on(mut self, key: impl Into<ObjectKey>) -> Self {
        self.fail_on.insert(key.into());
        self
    }

    /// Report a load error next to the loaded states.
    pub fn fail_load(mut self) -> Self {
        self.fail_load = true;
        self
    }
}

impl RemoteBackend for FailingRemote {
    fn load_all(&self, ctx: &MapperContext<'_>) -> LoadOutcome {
        let mut outcome = self.inner.load_all(ctx);
        if self.fail_load {
            outcome.errors.push(Error::Load {
                message: "injected failure".to_string(),
            });
        }
        outcome
    }

    fn save(&self, object: &Object, change_description: &str) -> Result<Object> {
        injected(&self.fail_on, &object.key())?;
        self.inner.save(object, change_description)
    }

    fn delete(&self, key: &ObjectKey, change_description: &str) -> Result<()> {
        injected(&self.fail_on, key)?;
        self.inner.delete(key, change_description)
    }

    fn after_batch(
        &self,
        ctx: &MapperContext<'_>,
        changes: RemoteChanges,
    ) -> Result<RemoteChanges> {
        self.inner.after_batch(ctx, changes)
    }
}
