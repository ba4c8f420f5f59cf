//! Mapping of keys to local paths

use projsync_model::{Object, ObjectKey};

/// Resolves the local path of an object that has no manifest record yet
pub trait NamingResolver: Send + Sync {
    /// Path of the object directory, relative to the project root
    ///
    /// `parent_path` is the path of the parent object, `None` for branches.
    fn path_for(&self, key: &ObjectKey, object: &Object, parent_path: Option<&str>) -> String;
}

/// Minimal naming: `main` for the default branch, `<id>-<name>` for other
/// branches, `<component>/<name>` for configs and `rows/<name>` for rows
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNaming;

impl NamingResolver for DefaultNaming {
    fn path_for(&self, key: &ObjectKey, object: &Object, parent_path: Option<&str>) -> String {
        let own = match key {
            ObjectKey::Branch(_) if object.is_default_branch() => "main".to_string(),
            ObjectKey::Branch(k) => format!("{}-{}", k.id, slug(object.name())),
            ObjectKey::Config(k) => format!("{}/{}", k.component_id, slug(object.name())),
            ObjectKey::ConfigRow(_) => format!("rows/{}", slug(object.name())),
        };
        match parent_path {
            Some(parent) if !parent.is_empty() => format!("{parent}/{own}"),
            _ => own,
        }
    }
}

/// Lowercase alphanumerics joined by single dashes
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        "unnamed".to_string()
    } else {
        out
    }
}
