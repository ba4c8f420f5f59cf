//! Registry of all object states of a project
//!
//! The registry is the in-memory source of truth during a sync run. The diff
//! engine and the plan builder only read it; the executor is its single
//! writer and updates it after each successful backend call.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::key::ObjectKey;
use crate::object::Object;
use crate::state::{ManifestRecord, ObjectState};

/// Map of [`ObjectKey`] to [`ObjectState`]
#[derive(Debug, Clone, Default)]
pub struct Registry {
    states: BTreeMap<ObjectKey, ObjectState>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the states returned by the local and remote loads
    ///
    /// States observed by both loads are merged into one.
    pub fn from_loaded(
        local: impl IntoIterator<Item = ObjectState>,
        remote: impl IntoIterator<Item = ObjectState>,
    ) -> Result<Self> {
        let mut registry = Self::new();
        for state in local.into_iter().chain(remote) {
            registry.merge(state)?;
        }
        Ok(registry)
    }

    /// Insert a state, replacing any previous state of the same key
    pub fn insert(&mut self, state: ObjectState) -> Result<()> {
        state.validate()?;
        self.states.insert(state.key().clone(), state);
        Ok(())
    }

    /// Merge a state into the existing state of its key, or insert it
    pub fn merge(&mut self, state: ObjectState) -> Result<()> {
        state.validate()?;
        match self.states.get_mut(state.key()) {
            Some(existing) => existing.merge(state),
            None => {
                self.states.insert(state.key().clone(), state);
                Ok(())
            }
        }
    }

    pub fn get(&self, key: &ObjectKey) -> Option<&ObjectState> {
        self.states.get(key)
    }

    pub fn get_mut(&mut self, key: &ObjectKey) -> Option<&mut ObjectState> {
        self.states.get_mut(key)
    }

    pub fn contains(&self, key: &ObjectKey) -> bool {
        self.states.contains_key(key)
    }

    pub fn remove(&mut self, key: &ObjectKey) -> Option<ObjectState> {
        self.states.remove(key)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// All states, parents before children
    pub fn states(&self) -> impl Iterator<Item = &ObjectState> {
        self.states.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ObjectKey> {
        self.states.keys()
    }

    /// Direct children of a key
    pub fn children(&self, key: &ObjectKey) -> Vec<&ObjectState> {
        self.states
            .values()
            .filter(|s| s.key().parent().as_ref() == Some(key))
            .collect()
    }

    /// Whether every ancestor of `key` exists locally
    pub fn has_local_chain(&self, key: &ObjectKey) -> bool {
        key.ancestors()
            .iter()
            .all(|ancestor| self.get(ancestor).is_some_and(ObjectState::has_local))
    }

    /// Whether every ancestor of `key` exists remotely
    pub fn has_remote_chain(&self, key: &ObjectKey) -> bool {
        key.ancestors()
            .iter()
            .all(|ancestor| self.get(ancestor).is_some_and(ObjectState::has_remote))
    }

    /// Manifest path of the parent of `key`
    pub fn parent_path(&self, key: &ObjectKey) -> Option<&str> {
        key.parent()
            .and_then(|parent| self.get(&parent))
            .and_then(ObjectState::path)
    }

    /// Replace the remote view after a successful remote save
    pub fn apply_remote(&mut self, object: Object) -> Result<()> {
        let key = object.key();
        match self.states.get_mut(&key) {
            Some(state) => state.set_remote(Some(object)),
            None => self.insert(ObjectState::from_remote(object)),
        }
    }

    /// Replace the local view and manifest record after a successful local save
    pub fn apply_local(&mut self, object: Object, record: ManifestRecord) -> Result<()> {
        let key = object.key();
        match self.states.get_mut(&key) {
            Some(state) => {
                state.set_manifest(Some(record))?;
                state.set_local(Some(object))
            }
            None => self.insert(ObjectState::from_local(object, record)?),
        }
    }

    /// Drop the remote view after a remote delete
    ///
    /// The state is removed once no view is left.
    pub fn forget_remote(&mut self, key: &ObjectKey) -> Result<()> {
        let state = self
            .states
            .get_mut(key)
            .ok_or_else(|| Error::NotFound(key.clone()))?;
        state.set_remote(None)?;
        self.prune(key);
        Ok(())
    }

    /// Drop the local view and manifest record after a local delete
    ///
    /// The state is removed once no view is left.
    pub fn forget_local(&mut self, key: &ObjectKey) -> Result<()> {
        let state = self
            .states
            .get_mut(key)
            .ok_or_else(|| Error::NotFound(key.clone()))?;
        state.set_local(None)?;
        state.set_manifest(None)?;
        self.prune(key);
        Ok(())
    }

    fn prune(&mut self, key: &ObjectKey) {
        if self.states.get(key).is_some_and(ObjectState::is_empty) {
            self.states.remove(key);
        }
    }
}
