//! Mapper pipeline
//!
//! Mappers translate between the remote wire representation and the local
//! on-disk layout without the engine knowing about them. Each mapper opts into
//! any of three hooks:
//!
//! - [`LocalLoadHook`] runs after an object is read from disk and may enrich
//!   it from, or consume, the files of its bundle.
//! - [`LocalSaveHook`] runs before the generic writer and may emit extra files
//!   or strip fields that those files now carry.
//! - [`RemoteChangeHook`] runs after a batch of remote loads or writes and may
//!   filter loaded objects or request additional local saves.
//!
//! Hooks run in registration order. Each hook receives its input by value and
//! returns the new value; a failing hook aborts only the object or batch it
//! was processing.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{Span, debug};

use projsync_model::{ManifestRecord, Object, ObjectKey, Registry};

use crate::backend::NamingResolver;
use crate::error::{Error, Result};

/// Context passed explicitly to every hook call
#[derive(Clone, Copy)]
pub struct MapperContext<'a> {
    /// Read-only snapshot of the registry
    pub registry: &'a Registry,
    pub naming: &'a dyn NamingResolver,
    /// Span of the running sync
    pub span: &'a Span,
}

impl<'a> MapperContext<'a> {
    pub fn new(registry: &'a Registry, naming: &'a dyn NamingResolver, span: &'a Span) -> Self {
        Self {
            registry,
            naming,
            span,
        }
    }
}

/// One file of an object directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFile {
    /// Path relative to the object directory
    pub path: String,
    pub content: String,
}

impl RawFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Files of one object directory, keyed by relative path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileBundle {
    files: BTreeMap<String, RawFile>,
}

impl FileBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, replacing any file at the same path
    pub fn add(&mut self, file: RawFile) {
        self.files.insert(file.path.clone(), file);
    }

    pub fn with_file(mut self, file: RawFile) -> Self {
        self.add(file);
        self
    }

    pub fn get(&self, path: &str) -> Option<&RawFile> {
        self.files.get(path)
    }

    /// Remove and return a file, marking it as consumed
    pub fn take(&mut self, path: &str) -> Option<RawFile> {
        self.files.remove(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RawFile> {
        self.files.values()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// An object read from disk, with the files it was read from
#[derive(Debug, Clone, PartialEq)]
pub struct LocalLoadRecipe {
    pub record: ManifestRecord,
    pub object: Object,
    pub files: FileBundle,
}

/// An object about to be written to disk
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSaveRecipe {
    pub record: ManifestRecord,
    /// Copy of the object handed to the generic writer
    pub object: Object,
    /// Extra files written next to the object
    pub files: FileBundle,
}

/// Outcome of a batch of remote operations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteChanges {
    /// Objects returned by a remote load
    pub loaded: Vec<Object>,
    /// Objects written to the remote
    pub saved: Vec<Object>,
    /// Keys deleted from the remote
    pub deleted: Vec<ObjectKey>,
    /// Keys whose local representation must be saved again
    pub local_saves: Vec<ObjectKey>,
}

impl RemoteChanges {
    pub fn loaded(objects: Vec<Object>) -> Self {
        Self {
            loaded: objects,
            ..Self::default()
        }
    }

    /// Request a local save, ignoring duplicates
    pub fn request_local_save(&mut self, key: ObjectKey) {
        if !self.local_saves.contains(&key) {
            self.local_saves.push(key);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
            && self.saved.is_empty()
            && self.deleted.is_empty()
            && self.local_saves.is_empty()
    }
}

pub trait LocalLoadHook {
    fn after_local_load(
        &self,
        ctx: &MapperContext<'_>,
        recipe: LocalLoadRecipe,
    ) -> Result<LocalLoadRecipe>;
}

pub trait LocalSaveHook {
    fn before_local_save(
        &self,
        ctx: &MapperContext<'_>,
        recipe: LocalSaveRecipe,
    ) -> Result<LocalSaveRecipe>;
}

pub trait RemoteChangeHook {
    fn after_remote_operation(
        &self,
        ctx: &MapperContext<'_>,
        changes: RemoteChanges,
    ) -> Result<RemoteChanges>;
}

/// A translation rule taking part in local and remote operations
///
/// Implementors return `Some(self)` from the capability accessors of the
/// hooks they implement.
pub trait Mapper: Send + Sync {
    fn name(&self) -> &str;

    fn local_load(&self) -> Option<&dyn LocalLoadHook> {
        None
    }

    fn local_save(&self) -> Option<&dyn LocalSaveHook> {
        None
    }

    fn remote_change(&self) -> Option<&dyn RemoteChangeHook> {
        None
    }
}

/// Ordered registry of mappers
#[derive(Clone, Default)]
pub struct MapperPipeline {
    mappers: Vec<Arc<dyn Mapper>>,
}

impl MapperPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mapper; hooks run in registration order
    pub fn register(&mut self, mapper: impl Mapper + 'static) {
        self.mappers.push(Arc::new(mapper));
    }

    pub fn with(mut self, mapper: impl Mapper + 'static) -> Self {
        self.register(mapper);
        self
    }

    /// Append an already shared mapper
    pub fn register_shared(&mut self, mapper: Arc<dyn Mapper>) {
        self.mappers.push(mapper);
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.mappers.iter().map(|m| m.name()).collect()
    }

    pub fn after_local_load(
        &self,
        ctx: &MapperContext<'_>,
        mut recipe: LocalLoadRecipe,
    ) -> Result<LocalLoadRecipe> {
        for mapper in &self.mappers {
            if let Some(hook) = mapper.local_load() {
                debug!(parent: ctx.span, mapper = mapper.name(), key = %recipe.record.key.desc(), "after_local_load");
                recipe = hook
                    .after_local_load(ctx, recipe)
                    .map_err(|e| wrap(mapper.as_ref(), e))?;
            }
        }
        Ok(recipe)
    }

    pub fn before_local_save(
        &self,
        ctx: &MapperContext<'_>,
        mut recipe: LocalSaveRecipe,
    ) -> Result<LocalSaveRecipe> {
        for mapper in &self.mappers {
            if let Some(hook) = mapper.local_save() {
                debug!(parent: ctx.span, mapper = mapper.name(), key = %recipe.record.key.desc(), "before_local_save");
                recipe = hook
                    .before_local_save(ctx, recipe)
                    .map_err(|e| wrap(mapper.as_ref(), e))?;
            }
        }
        Ok(recipe)
    }

    pub fn after_remote_operation(
        &self,
        ctx: &MapperContext<'_>,
        mut changes: RemoteChanges,
    ) -> Result<RemoteChanges> {
        for mapper in &self.mappers {
            if let Some(hook) = mapper.remote_change() {
                debug!(parent: ctx.span, mapper = mapper.name(), "after_remote_operation");
                changes = hook
                    .after_remote_operation(ctx, changes)
                    .map_err(|e| wrap(mapper.as_ref(), e))?;
            }
        }
        Ok(changes)
    }
}

impl std::fmt::Debug for MapperPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapperPipeline")
            .field("mappers", &self.names())
            .finish()
    }
}

fn wrap(mapper: &dyn Mapper, error: Error) -> Error {
    Error::Mapper {
        mapper: mapper.name().to_string(),
        source: Box::new(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DefaultNaming;
    use projsync_model::{Branch, BranchKey};

    struct Rename(&'static str);

    impl Mapper for Rename {
        fn name(&self) -> &str {
            "rename"
        }

        fn local_save(&self) -> Option<&dyn LocalSaveHook> {
            Some(self)
        }
    }

    impl LocalSaveHook for Rename {
        fn before_local_save(
            &self,
            _ctx: &MapperContext<'_>,
            mut recipe: LocalSaveRecipe,
        ) -> Result<LocalSaveRecipe> {
            if let Object::Branch(branch) = &mut recipe.object {
                branch.name.push_str(self.0);
            }
            Ok(recipe)
        }
    }

    struct Reject;

    impl Mapper for Reject {
        fn name(&self) -> &str {
            "reject"
        }

        fn local_save(&self) -> Option<&dyn LocalSaveHook> {
            Some(self)
        }
    }

    impl LocalSaveHook for Reject {
        fn before_local_save(
            &self,
            _ctx: &MapperContext<'_>,
            _recipe: LocalSaveRecipe,
        ) -> Result<LocalSaveRecipe> {
            Err(Error::rejected("nope"))
        }
    }

    fn recipe() -> LocalSaveRecipe {
        LocalSaveRecipe {
            record: ManifestRecord::new(BranchKey::new(1).into(), "main"),
            object: Branch::new(1, "Main").into(),
            files: FileBundle::new(),
        }
    }

    #[test]
    fn test_hooks_run_in_registration_order() {
        let pipeline = MapperPipeline::new().with(Rename("-a")).with(Rename("-b"));
        let registry = Registry::new();
        let span = Span::none();
        let ctx = MapperContext::new(&registry, &DefaultNaming, &span);

        let out = pipeline.before_local_save(&ctx, recipe()).unwrap();
        assert_eq!(out.object.name(), "Main-a-b");
    }

    #[test]
    fn test_failing_hook_names_mapper() {
        let pipeline = MapperPipeline::new().with(Reject).with(Rename("-a"));
        let registry = Registry::new();
        let span = Span::none();
        let ctx = MapperContext::new(&registry, &DefaultNaming, &span);

        let err = pipeline.before_local_save(&ctx, recipe()).unwrap_err();
        assert_eq!(err.to_string(), "Mapper \"reject\" failed: nope");
    }

    #[test]
    fn test_file_bundle_take() {
        let mut files = FileBundle::new()
            .with_file(RawFile::new("meta.json", "{}"))
            .with_file(RawFile::new("description.md", "hi"));
        assert_eq!(files.take("description.md").unwrap().content, "hi");
        assert_eq!(files.paths().collect::<Vec<_>>(), vec!["meta.json"]);
    }
}
