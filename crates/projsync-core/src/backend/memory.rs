//! In-memory backends
//!
//! Both backends keep their objects behind a mutex so a pool of workers can
//! write concurrently. They run the mapper hooks exactly like a file or HTTP
//! backend would, which makes them usable for dry runs, embedding and tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use projsync_model::{Manifest, ManifestRecord, Object, ObjectKey, ObjectState};

use super::{LoadOutcome, LocalBackend, RemoteBackend};
use crate::error::{Error, Result};
use crate::mapper::{
    FileBundle, LocalLoadRecipe, LocalSaveRecipe, MapperContext, MapperPipeline, RemoteChanges,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An object directory as written by [`MemoryLocal`]
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub object: Object,
    /// Extra files emitted by mappers
    pub files: FileBundle,
}

/// Local tree kept in memory, keyed by object path
#[derive(Debug, Default)]
pub struct MemoryLocal {
    entries: Mutex<BTreeMap<String, StoredObject>>,
    mappers: MapperPipeline,
}

impl MemoryLocal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mappers(mut self, mappers: MapperPipeline) -> Self {
        self.mappers = mappers;
        self
    }

    /// Place an object directly, bypassing the mapper hooks
    pub fn insert(&self, path: impl Into<String>, object: Object) {
        lock(&self.entries).insert(
            path.into(),
            StoredObject {
                object,
                files: FileBundle::new(),
            },
        );
    }

    /// Remove an object directly, as if its directory had been deleted by hand
    pub fn remove(&self, path: &str) -> Option<StoredObject> {
        lock(&self.entries).remove(path)
    }

    pub fn get(&self, path: &str) -> Option<StoredObject> {
        lock(&self.entries).get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        lock(&self.entries).contains_key(path)
    }

    /// Stored paths, sorted
    pub fn paths(&self) -> Vec<String> {
        lock(&self.entries).keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }
}

impl LocalBackend for MemoryLocal {
    fn load_all(&self, ctx: &MapperContext<'_>, manifest: &Manifest) -> LoadOutcome {
        let entries = lock(&self.entries);
        let mut outcome = LoadOutcome::default();

        for record in manifest.records() {
            let mut record = record.clone();
            let stored = entries
                .get(&record.path)
                .filter(|stored| stored.object.key() == record.key);

            let Some(stored) = stored else {
                debug!(key = %record.key.desc(), path = %record.path, "Object not found on disk");
                record.not_found = true;
                match ObjectState::new(record.key.clone()).with_manifest(record) {
                    Ok(state) => outcome.states.push(state),
                    Err(e) => outcome.errors.push(e),
                }
                continue;
            };

            record.not_found = false;
            let recipe = LocalLoadRecipe {
                record,
                object: stored.object.clone(),
                files: stored.files.clone(),
            };
            let state = self
                .mappers
                .after_local_load(ctx, recipe)
                .and_then(|recipe| {
                    ObjectState::from_local(recipe.object, recipe.record).map_err(Error::from)
                });
            match state {
                Ok(state) => outcome.states.push(state),
                Err(e) => outcome.errors.push(e),
            }
        }

        outcome
    }

    fn save(
        &self,
        ctx: &MapperContext<'_>,
        record: &ManifestRecord,
        object: &Object,
    ) -> Result<()> {
        let recipe = LocalSaveRecipe {
            record: record.clone(),
            object: object.clone(),
            files: FileBundle::new(),
        };
        let recipe = self.mappers.before_local_save(ctx, recipe)?;
        if recipe.object.key() != record.key {
            return Err(Error::backend(
                record.key.clone(),
                format!("mapper changed the key to {}", recipe.object.key()),
            ));
        }

        let mut entries = lock(&self.entries);
        // A renamed object leaves its old directory behind.
        entries.retain(|path, stored| path == &record.path || stored.object.key() != record.key);
        entries.insert(
            record.path.clone(),
            StoredObject {
                object: recipe.object,
                files: recipe.files,
            },
        );
        Ok(())
    }

    fn delete(&self, record: &ManifestRecord) -> Result<()> {
        let prefix = format!("{}/", record.path);
        lock(&self.entries).retain(|path, _| path != &record.path && !path.starts_with(&prefix));
        Ok(())
    }
}

/// One write received by [`MemoryRemote`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteWrite {
    pub key: ObjectKey,
    pub deleted: bool,
    pub change_description: String,
}

/// Remote project kept in memory
#[derive(Debug, Default)]
pub struct MemoryRemote {
    objects: Mutex<BTreeMap<ObjectKey, Object>>,
    writes: Mutex<Vec<RemoteWrite>>,
    mappers: MapperPipeline,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mappers(mut self, mappers: MapperPipeline) -> Self {
        self.mappers = mappers;
        self
    }

    /// Place an object directly, without recording a write
    pub fn insert(&self, object: Object) {
        lock(&self.objects).insert(object.key(), object);
    }

    pub fn get(&self, key: &ObjectKey) -> Option<Object> {
        lock(&self.objects).get(key).cloned()
    }

    pub fn contains(&self, key: &ObjectKey) -> bool {
        lock(&self.objects).contains_key(key)
    }

    pub fn keys(&self) -> Vec<ObjectKey> {
        lock(&self.objects).keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.objects).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.objects).is_empty()
    }

    /// Writes received so far, in arrival order
    pub fn writes(&self) -> Vec<RemoteWrite> {
        lock(&self.writes).clone()
    }

    fn record_write(&self, key: ObjectKey, deleted: bool, change_description: &str) {
        lock(&self.writes).push(RemoteWrite {
            key,
            deleted,
            change_description: change_description.to_string(),
        });
    }
}

impl RemoteBackend for MemoryRemote {
    fn load_all(&self, ctx: &MapperContext<'_>) -> LoadOutcome {
        let loaded: Vec<Object> = lock(&self.objects).values().cloned().collect();
        let mut outcome = LoadOutcome::default();

        match self
            .mappers
            .after_remote_operation(ctx, RemoteChanges::loaded(loaded))
        {
            Ok(changes) => {
                outcome.states = changes
                    .loaded
                    .into_iter()
                    .map(ObjectState::from_remote)
                    .collect();
                outcome.local_saves = changes.local_saves;
            }
            Err(e) => outcome.errors.push(e),
        }
        outcome
    }

    fn save(&self, object: &Object, change_description: &str) -> Result<Object> {
        let key = object.key();
        {
            let mut objects = lock(&self.objects);
            if let Some(parent) = key.parent()
                && !objects.contains_key(&parent)
            {
                return Err(Error::backend(key, format!("parent {parent} does not exist")));
            }
            objects.insert(key.clone(), object.clone());
        }
        self.record_write(key, false, change_description);
        Ok(object.clone())
    }

    fn delete(&self, key: &ObjectKey, change_description: &str) -> Result<()> {
        {
            let mut objects = lock(&self.objects);
            if !objects.contains_key(key) {
                return Err(Error::NotFound(key.clone()));
            }
            objects.retain(|k, _| k != key && !key.is_ancestor_of(k));
        }
        self.record_write(key.clone(), true, change_description);
        Ok(())
    }

    fn after_batch(
        &self,
        ctx: &MapperContext<'_>,
        changes: RemoteChanges,
    ) -> Result<RemoteChanges> {
        self.mappers.after_remote_operation(ctx, changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DefaultNaming;
    use projsync_model::{Branch, BranchKey, Config, ConfigKey, Registry};
    use tracing::Span;

    #[test]
    fn test_local_missing_object_is_not_found() {
        let local = MemoryLocal::new();
        let mut manifest = Manifest::new();
        manifest.set(ManifestRecord::new(BranchKey::new(1).into(), "main").persisted());

        let registry = Registry::new();
        let span = Span::none();
        let ctx = MapperContext::new(&registry, &DefaultNaming, &span);
        let outcome = local.load_all(&ctx, &manifest);

        assert!(outcome.is_ok());
        let state = &outcome.states[0];
        assert!(!state.has_local());
        assert!(state.manifest().unwrap().not_found);
    }

    #[test]
    fn test_local_delete_removes_subtree() {
        let local = MemoryLocal::new();
        let config_key = ConfigKey::new(1, "ex", "1");
        local.insert("main", Branch::new(1, "Main").into());
        local.insert("main/ex/cfg", Config::new(&config_key, "Cfg").into());
        local.insert("mainline", Branch::new(2, "Mainline").into());

        local
            .delete(&ManifestRecord::new(BranchKey::new(1).into(), "main"))
            .unwrap();

        assert_eq!(local.paths(), vec!["mainline".to_string()]);
    }

    #[test]
    fn test_remote_save_requires_parent() {
        let remote = MemoryRemote::new();
        let config: Object = Config::new(&ConfigKey::new(1, "ex", "1"), "Cfg").into();

        let result = remote.save(&config, "test");
        assert!(matches!(result, Err(Error::Backend { .. })));

        remote.insert(Branch::new(1, "Main").into());
        remote.save(&config, "test").unwrap();
        assert_eq!(remote.writes().len(), 1);
        assert_eq!(remote.writes()[0].change_description, "test");
    }

    #[test]
    fn test_remote_delete_cascades() {
        let remote = MemoryRemote::new();
        remote.insert(Branch::new(1, "Main").into());
        remote.insert(Config::new(&ConfigKey::new(1, "ex", "1"), "Cfg").into());

        remote.delete(&BranchKey::new(1).into(), "cleanup").unwrap();
        assert!(remote.is_empty());

        let again = remote.delete(&BranchKey::new(1).into(), "cleanup");
        assert!(matches!(again, Err(Error::NotFound(_))));
    }
}
