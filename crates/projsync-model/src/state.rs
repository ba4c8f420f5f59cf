//! Object state: the remote, local and manifest views of one key

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::key::ObjectKey;
use crate::object::Object;

/// Manifest entry of one object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    /// Path of the object directory relative to the project root
    pub path: String,
    /// Whether the object has been written to disk
    #[serde(default)]
    pub persisted: bool,
    /// Whether the last local load failed to find the object on disk
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub not_found: bool,
    pub key: ObjectKey,
}

impl ManifestRecord {
    pub fn new(key: ObjectKey, path: impl Into<String>) -> Self {
        Self {
            key,
            path: path.into(),
            persisted: false,
            not_found: false,
        }
    }

    pub fn persisted(mut self) -> Self {
        self.persisted = true;
        self
    }
}

/// Up to three views of the same key
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectState {
    key: ObjectKey,
    remote: Option<Object>,
    local: Option<Object>,
    manifest: Option<ManifestRecord>,
}

impl ObjectState {
    /// Create a state without any view
    ///
    /// The state must receive at least one view before it is inserted into a
    /// registry.
    pub fn new(key: ObjectKey) -> Self {
        Self {
            key,
            remote: None,
            local: None,
            manifest: None,
        }
    }

    /// Create a state from a remote object
    pub fn from_remote(object: Object) -> Self {
        Self {
            key: object.key(),
            remote: Some(object),
            local: None,
            manifest: None,
        }
    }

    /// Create a state from a local object and its manifest record
    pub fn from_local(object: Object, record: ManifestRecord) -> Result<Self> {
        let mut state = Self::new(object.key());
        state.set_manifest(Some(record))?;
        state.set_local(Some(object))?;
        Ok(state)
    }

    pub fn key(&self) -> &ObjectKey {
        &self.key
    }

    pub fn remote(&self) -> Option<&Object> {
        self.remote.as_ref()
    }

    pub fn local(&self) -> Option<&Object> {
        self.local.as_ref()
    }

    pub fn manifest(&self) -> Option<&ManifestRecord> {
        self.manifest.as_ref()
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub fn has_local(&self) -> bool {
        self.local.is_some()
    }

    /// Path from the manifest record, if any
    pub fn path(&self) -> Option<&str> {
        self.manifest.as_ref().map(|m| m.path.as_str())
    }

    /// Whether no view is present
    pub fn is_empty(&self) -> bool {
        self.remote.is_none() && self.local.is_none() && self.manifest.is_none()
    }

    /// Whichever object is present, remote first
    pub fn any_object(&self) -> Option<&Object> {
        self.remote.as_ref().or(self.local.as_ref())
    }

    pub fn set_remote(&mut self, object: Option<Object>) -> Result<()> {
        self.check_key(object.as_ref())?;
        self.remote = object;
        Ok(())
    }

    pub fn set_local(&mut self, object: Option<Object>) -> Result<()> {
        self.check_key(object.as_ref())?;
        self.local = object;
        Ok(())
    }

    pub fn set_manifest(&mut self, record: Option<ManifestRecord>) -> Result<()> {
        if let Some(record) = &record
            && record.key != self.key
        {
            return Err(Error::KeyMismatch {
                expected: self.key.clone(),
                actual: record.key.clone(),
            });
        }
        self.manifest = record;
        Ok(())
    }

    pub fn with_remote(mut self, object: Object) -> Result<Self> {
        self.set_remote(Some(object))?;
        Ok(self)
    }

    pub fn with_local(mut self, object: Object) -> Result<Self> {
        self.set_local(Some(object))?;
        Ok(self)
    }

    pub fn with_manifest(mut self, record: ManifestRecord) -> Result<Self> {
        self.set_manifest(Some(record))?;
        Ok(self)
    }

    /// Merge the views present in `other` into this state
    pub fn merge(&mut self, other: ObjectState) -> Result<()> {
        if other.key != self.key {
            return Err(Error::KeyMismatch {
                expected: self.key.clone(),
                actual: other.key,
            });
        }
        if other.remote.is_some() {
            self.remote = other.remote;
        }
        if other.local.is_some() {
            self.local = other.local;
        }
        if other.manifest.is_some() {
            self.manifest = other.manifest;
        }
        Ok(())
    }

    /// Check the state invariants
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::EmptyState {
                key: self.key.clone(),
            });
        }
        if let (Some(remote), Some(local)) = (&self.remote, &self.local)
            && remote.kind() != local.kind()
        {
            return Err(Error::KindMismatch {
                key: self.key.clone(),
                remote: remote.kind(),
                local: local.kind(),
            });
        }
        Ok(())
    }

    fn check_key(&self, object: Option<&Object>) -> Result<()> {
        match object {
            Some(object) if object.key() != self.key => Err(Error::KeyMismatch {
                expected: self.key.clone(),
                actual: object.key(),
            }),
            _ => Ok(()),
        }
    }
}
