//! [`RecordingMapper`] observing every hook call.

use std::sync::{Arc, Mutex};

use projsync_core::{
    LocalLoadHook, LocalLoadRecipe, LocalSaveHook, LocalSaveRecipe, Mapper, MapperContext, RawFile,
    RemoteChangeHook, RemoteChanges, Result,
};
use projsync_model::ObjectKey;

/// File added to every local save.
pub const RECORDED_FILE: &str = "recorded.txt";

/// Mapper implementing every hook and logging each call.
///
/// Clones share the call log, so a test keeps one clone and registers the
/// other.
#[derive(Clone, Default)]
pub struct RecordingMapper {
    calls: Arc<Mutex<Vec<String>>>,
    resave_saved: bool,
}

impl RecordingMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a local save of every object saved remotely.
    pub fn resaving(mut self) -> Self {
        self.resave_saved = true;
        self
    }

    /// Calls so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Mapper for RecordingMapper {
    fn name(&self) -> &str {
        "recording"
    }

    fn local_load(&self) -> Option<&dyn LocalLoadHook> {
        Some(self)
    }

    fn local_save(&self) -> Option<&dyn LocalSaveHook> {
        Some(self)
    }

    fn remote_change(&self) -> Option<&dyn RemoteChangeHook> {
        Some(self)
    }
}

impl LocalLoadHook for RecordingMapper {
    fn after_local_load(
        &self,
        _ctx: &MapperContext<'_>,
        recipe: LocalLoadRecipe,
    ) -> Result<LocalLoadRecipe> {
        self.record(format!("load {}", recipe.record.key.desc()));
        Ok(recipe)
    }
}

impl LocalSaveHook for RecordingMapper {
    fn before_local_save(
        &self,
        _ctx: &MapperContext<'_>,
        mut recipe: LocalSaveRecipe,
    ) -> Result<LocalSaveRecipe> {
        self.record(format!("save {}", recipe.record.key.desc()));
        recipe
            .files
            .add(RawFile::new(RECORDED_FILE, recipe.object.name()));
        Ok(recipe)
    }
}

impl RemoteChangeHook for RecordingMapper {
    fn after_remote_operation(
        &self,
        _ctx: &MapperContext<'_>,
        mut changes: RemoteChanges,
    ) -> Result<RemoteChanges> {
        self.record(format!(
            "remote loaded={} saved={} deleted={}",
            changes.loaded.len(),
            changes.saved.len(),
            changes.deleted.len()
        ));
        if self.resave_saved {
            let keys: Vec<ObjectKey> = changes.saved.iter().map(|o| o.key()).collect();
            for key in keys {
                changes.request_local_save(key);
            }
        }
        Ok(changes)
    }
}
