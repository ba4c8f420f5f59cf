//! [`TestProject`] builder for sync scenarios.
//!
//! Seeds an in-memory local tree, an in-memory remote project and a manifest,
//! then hands out engines wired to them. The backends are shared, so a test
//! can run an engine and inspect both sides afterwards.

use std::sync::Arc;

use projsync_core::{
    LocalBackend, MapperPipeline, MemoryLocal, MemoryRemote, RemoteBackend, SyncConfig, SyncEngine,
};
use projsync_model::{
    Branch, Config, ConfigKey, ConfigRow, Manifest, ManifestRecord, Object, ObjectKey, Registry,
};

/// A default branch object.
pub fn default_branch(id: u64, name: &str) -> Object {
    Branch::default_branch(id, name).into()
}

/// A non-default branch object.
pub fn branch(id: u64, name: &str) -> Object {
    Branch::new(id, name).into()
}

/// A config object in `branch_id`.
pub fn config(branch_id: u64, component: &str, id: &str, name: &str) -> Object {
    Config::new(&ConfigKey::new(branch_id, component, id), name).into()
}

/// A config row object.
pub fn row(branch_id: u64, component: &str, config_id: &str, id: &str, name: &str) -> Object {
    ConfigRow::new(&ConfigKey::new(branch_id, component, config_id).row(id), name).into()
}

/// Both sides of a project plus its manifest.
///
/// # Example
///
/// ```rust,no_run
/// use projsync_core::SyncOptions;
/// use projsync_test_utils::{TestProject, config, default_branch};
///
/// let mut project = TestProject::new();
/// project
///     .both(default_branch(1, "Main"), "main")
///     .remote(config(1, "ex.generic", "1", "Cfg"));
///
/// let report = project.engine().pull(SyncOptions::default()).unwrap();
/// assert!(report.success());
/// ```
pub struct TestProject {
    pub local: Arc<MemoryLocal>,
    pub remote: Arc<MemoryRemote>,
    pub manifest: Manifest,
    pub config: SyncConfig,
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

impl TestProject {
    /// An empty project without mappers.
    pub fn new() -> Self {
        Self::with_mappers(MapperPipeline::new())
    }

    /// An empty project whose backends both run `mappers`.
    pub fn with_mappers(mappers: MapperPipeline) -> Self {
        Self {
            local: Arc::new(MemoryLocal::new().with_mappers(mappers.clone())),
            remote: Arc::new(MemoryRemote::new().with_mappers(mappers)),
            manifest: Manifest::new(),
            config: SyncConfig::default(),
        }
    }

    /// Add an object to the remote project only.
    pub fn remote(&mut self, object: Object) -> &mut Self {
        self.remote.insert(object);
        self
    }

    /// Add an object to the local tree and record it in the manifest.
    pub fn local(&mut self, object: Object, path: &str) -> &mut Self {
        self.manifest
            .set(ManifestRecord::new(object.key(), path).persisted());
        self.local.insert(path, object);
        self
    }

    /// Add the same object to both sides.
    pub fn both(&mut self, object: Object, path: &str) -> &mut Self {
        self.remote(object.clone()).local(object, path)
    }

    /// Record a path in the manifest without any object behind it.
    pub fn stale_record(&mut self, key: impl Into<ObjectKey>, path: &str) -> &mut Self {
        self.manifest
            .set(ManifestRecord::new(key.into(), path).persisted());
        self
    }

    /// An engine over the shared in-memory backends.
    pub fn engine(&self) -> SyncEngine {
        self.engine_with(self.local.clone(), self.remote.clone())
    }

    /// An engine over other backends, typically wrapping the shared ones.
    pub fn engine_with(
        &self,
        local: Arc<dyn LocalBackend>,
        remote: Arc<dyn RemoteBackend>,
    ) -> SyncEngine {
        SyncEngine::new(self.config.clone(), local, remote).with_manifest(self.manifest.clone())
    }

    /// Load both sides into a registry.
    ///
    /// # Panics
    /// Panics if either side fails to load.
    pub fn registry(&self) -> Registry {
        self.engine()
            .load()
            .unwrap_or_else(|e| panic!("TestProject::registry: load failed: {e}"))
    }
}
