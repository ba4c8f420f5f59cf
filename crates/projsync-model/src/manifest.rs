//! Manifest: persisted record store of local object paths
//!
//! The manifest maps every locally tracked [`ObjectKey`] to its
//! [`ManifestRecord`]. It is persisted as TOML next to the project and is
//! read with a shared lock and written atomically under an exclusive lock.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Read;
use std::path::Path;

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::key::ObjectKey;
use crate::state::ManifestRecord;

const MANIFEST_VERSION: &str = "1.0";

/// On-disk shape of the manifest
#[derive(Debug, Serialize, Deserialize)]
struct ManifestFile {
    version: String,
    #[serde(default)]
    records: Vec<ManifestRecord>,
}

/// Record store keyed by object key
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    version: String,
    records: BTreeMap<ObjectKey, ManifestRecord>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}

impl Manifest {
    pub fn new() -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            records: BTreeMap::new(),
        }
    }

    /// Parse a manifest from TOML content
    pub fn parse(content: &str) -> Result<Self> {
        let file: ManifestFile = toml::from_str(content)?;
        Ok(Self {
            version: file.version,
            records: file
                .records
                .into_iter()
                .map(|r| (r.key.clone(), r))
                .collect(),
        })
    }

    /// Serialize the manifest to TOML, records sorted by key
    pub fn to_toml(&self) -> Result<String> {
        let file = ManifestFile {
            version: self.version.clone(),
            records: self.records.values().cloned().collect(),
        };
        Ok(toml::to_string_pretty(&file)?)
    }

    /// Load a manifest from a TOML file with shared lock
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        file.lock_shared()?;

        let mut content = String::new();
        (&file).read_to_string(&mut content)?;
        Self::parse(&content)
    }

    /// Load the manifest, or create an empty one if the file doesn't exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::new())
        }
    }

    /// Save the manifest atomically with exclusive lock
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }

        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        lock_file.lock_exclusive()?;

        let temp_path = path.with_extension("toml.tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn get(&self, key: &ObjectKey) -> Option<&ManifestRecord> {
        self.records.get(key)
    }

    pub fn set(&mut self, record: ManifestRecord) {
        self.records.insert(record.key.clone(), record);
    }

    pub fn remove(&mut self, key: &ObjectKey) -> Option<ManifestRecord> {
        self.records.remove(key)
    }

    /// Record of the direct parent of `key`
    pub fn parent_record(&self, key: &ObjectKey) -> Option<&ManifestRecord> {
        key.parent().and_then(|parent| self.records.get(&parent))
    }

    /// All records, parents before children
    pub fn records(&self) -> impl Iterator<Item = &ManifestRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether the object is recorded as written to disk
    pub fn is_persisted(&self, key: &ObjectKey) -> bool {
        self.records.get(key).is_some_and(|r| r.persisted)
    }

    /// Flag a record whose object was missing during the local load
    pub fn mark_not_found(&mut self, key: &ObjectKey) {
        if let Some(record) = self.records.get_mut(key) {
            record.not_found = true;
        }
    }
}
