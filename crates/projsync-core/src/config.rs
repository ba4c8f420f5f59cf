//! Sync configuration parsed from TOML
//!
//! ```toml
//! [executor]
//! local_workers = 8
//! remote_workers = 4
//! change_description = "Updated from CI"
//!
//! [diff]
//! context_lines = 2
//!
//! [plan]
//! allow_remote_delete = false
//! ```
//!
//! Every section and key is optional.

use std::path::Path;

use serde::{Deserialize, Serialize};

use projsync_diff::{DEFAULT_CONTEXT_LINES, DiffOptions};

use crate::error::{Error, Result};

fn default_local_workers() -> usize {
    8
}

fn default_remote_workers() -> usize {
    4
}

fn default_context_lines() -> usize {
    DEFAULT_CONTEXT_LINES
}

/// Worker pool sizes and remote change metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorSection {
    /// Concurrent local writes per level
    #[serde(default = "default_local_workers")]
    pub local_workers: usize,
    /// Concurrent remote API calls per level
    #[serde(default = "default_remote_workers")]
    pub remote_workers: usize,
    /// Description attached to every remote write; a description naming the
    /// run is generated when unset
    #[serde(default)]
    pub change_description: Option<String>,
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            local_workers: default_local_workers(),
            remote_workers: default_remote_workers(),
            change_description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSection {
    /// Unchanged lines kept around each change in text diffs
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
}

impl Default for DiffSection {
    fn default() -> Self {
        Self {
            context_lines: default_context_lines(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSection {
    /// Execute remote deletions planned by push
    #[serde(default)]
    pub allow_remote_delete: bool,
}

/// Sync configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub executor: ExecutorSection,
    #[serde(default)]
    pub diff: DiffSection,
    #[serde(default)]
    pub plan: PlanSection,
}

impl SyncConfig {
    /// Parse and validate a configuration from TOML content
    pub fn parse(content: &str) -> Result<Self> {
        let config: SyncConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigNotFound`] if the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load a configuration file, or the defaults if it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(Error::ConfigNotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.executor.local_workers == 0 {
            return Err(Error::InvalidConfig {
                message: "executor.local_workers must be at least 1".to_string(),
            });
        }
        if self.executor.remote_workers == 0 {
            return Err(Error::InvalidConfig {
                message: "executor.remote_workers must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn diff_options(&self) -> DiffOptions {
        DiffOptions {
            context_lines: self.diff.context_lines,
        }
    }
}

/// Per-run options, usually mapped from command line flags
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Build and render the plan without executing it
    pub dry_run: bool,
    /// Execute remote deletions, overriding `plan.allow_remote_delete`, and
    /// continue past load and comparison errors
    pub force: bool,
}

impl SyncOptions {
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            force: false,
        }
    }

    pub fn force() -> Self {
        Self {
            dry_run: false,
            force: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_is_default() {
        assert_eq!(SyncConfig::parse("").unwrap(), SyncConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = SyncConfig::parse(
            r#"
[executor]
remote_workers = 2
change_description = "nightly"

[plan]
allow_remote_delete = true
"#,
        )
        .unwrap();

        assert_eq!(config.executor.local_workers, 8);
        assert_eq!(config.executor.remote_workers, 2);
        assert_eq!(config.executor.change_description.as_deref(), Some("nightly"));
        assert_eq!(config.diff.context_lines, DEFAULT_CONTEXT_LINES);
        assert!(config.plan.allow_remote_delete);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let result = SyncConfig::parse("[executor]\nlocal_workers = 0\n");
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }
}
