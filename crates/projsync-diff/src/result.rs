//! Diff result types

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use projsync_model::{ObjectKey, ObjectKind};

use crate::error::Error;

/// Classification of one object state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultState {
    Equal,
    NotEqual,
    OnlyInRemote,
    OnlyInLocal,
}

impl ResultState {
    /// Fixed mark used in diff reports
    pub fn mark(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "CH",
            Self::OnlyInRemote => "-",
            Self::OnlyInLocal => "+",
        }
    }
}

impl fmt::Display for ResultState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "equal"),
            Self::NotEqual => write!(f, "not equal"),
            Self::OnlyInRemote => write!(f, "only in remote"),
            Self::OnlyInLocal => write!(f, "only in local"),
        }
    }
}

/// One changed field with its rendered diff and the structural paths touched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedField {
    diff: String,
    paths: BTreeSet<String>,
}

impl ChangedField {
    pub fn diff(&self) -> &str {
        &self.diff
    }

    pub fn set_diff(&mut self, diff: impl Into<String>) -> &mut Self {
        self.diff = diff.into();
        self
    }

    pub fn add_path(&mut self, path: impl Into<String>) -> &mut Self {
        self.paths.insert(path.into());
        self
    }

    pub fn has_path(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }
}

/// Changed fields of one object, keyed by public field name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedFields(BTreeMap<String, ChangedField>);

impl ChangedFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the entry for a field
    pub fn add(&mut self, name: impl Into<String>) -> &mut ChangedField {
        self.0.entry(name.into()).or_default()
    }

    pub fn get(&self, name: &str) -> Option<&ChangedField> {
        self.0.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<ChangedField> {
        self.0.remove(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Field names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ChangedField)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl fmt::Display for ChangedFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join(", "))
    }
}

/// Diff result of one object state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffResult {
    pub key: ObjectKey,
    /// Manifest path, or the key when the object has no local record
    pub path: String,
    pub state: ResultState,
    pub changed_fields: ChangedFields,
}

impl DiffResult {
    pub fn kind(&self) -> ObjectKind {
        self.key.kind()
    }
}

/// Diff results of a whole project
#[derive(Debug, Default)]
pub struct Results {
    /// True iff every result is [`ResultState::Equal`] and no error occurred
    pub equal: bool,
    pub results: Vec<DiffResult>,
    /// Comparison errors, collected per object
    pub errors: Vec<Error>,
}

impl Results {
    pub fn get(&self, key: &ObjectKey) -> Option<&DiffResult> {
        self.results.iter().find(|r| &r.key == key)
    }

    /// Results that are not equal
    pub fn changed(&self) -> impl Iterator<Item = &DiffResult> {
        self.results.iter().filter(|r| r.state != ResultState::Equal)
    }

    pub fn count(&self, state: ResultState) -> usize {
        self.results.iter().filter(|r| r.state == state).count()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Render the report
    ///
    /// Equal objects are omitted. With `details`, each changed field is
    /// followed by its diff text.
    pub fn format(&self, details: bool) -> String {
        render(self.changed(), details)
    }

    /// Render the report including equal objects, marked `=`
    pub fn format_all(&self, details: bool) -> String {
        render(self.results.iter(), details)
    }
}

fn render<'a>(results: impl Iterator<Item = &'a DiffResult>, details: bool) -> String {
    let mut sorted: Vec<&DiffResult> = results.collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.key.cmp(&b.key)));

    let mut out = Vec::new();
    for result in sorted {
        let line = format!(
            "{:<2} {} {}",
            result.state.mark(),
            result.kind().abbr(),
            result.path
        );
        if result.state != ResultState::NotEqual {
            out.push(line);
            continue;
        }
        if !details {
            out.push(format!("{line} | changed: {}", result.changed_fields));
            continue;
        }
        out.push(line);
        for (name, field) in result.changed_fields.iter() {
            out.push(format!("  {name}:"));
            out.extend(field.diff().lines().map(|l| format!("    {l}")));
        }
    }

    if out.is_empty() {
        "No difference.".to_string()
    } else {
        out.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use projsync_model::BranchKey;

    fn result(id: u64, path: &str, state: ResultState) -> DiffResult {
        DiffResult {
            key: BranchKey::new(id).into(),
            path: path.to_string(),
            state,
            changed_fields: ChangedFields::new(),
        }
    }

    #[test]
    fn test_marks() {
        assert_eq!(ResultState::OnlyInRemote.mark(), "-");
        assert_eq!(ResultState::OnlyInLocal.mark(), "+");
        assert_eq!(ResultState::NotEqual.mark(), "CH");
        assert_eq!(ResultState::Equal.mark(), "=");
    }

    #[test]
    fn test_changed_fields_paths() {
        let mut fields = ChangedFields::new();
        fields.add("relations").add_path("in_api").set_diff("x");
        fields.add("relations").add_path("in_manifest");

        let relations = fields.get("relations").unwrap();
        assert_eq!(fields.len(), 1);
        assert!(relations.has_path("in_api"));
        assert!(relations.has_path("in_manifest"));
        assert_eq!(relations.diff(), "x");
    }

    #[test]
    fn test_format_sorted_by_path() {
        let mut changed = result(3, "c-branch", ResultState::NotEqual);
        changed.changed_fields.add("name").set_diff("- a\n+ b");
        let results = Results {
            equal: false,
            results: vec![
                changed,
                result(1, "a-branch", ResultState::OnlyInRemote),
                result(2, "b-branch", ResultState::Equal),
            ],
            errors: Vec::new(),
        };

        assert_eq!(
            results.format(false),
            "-  B a-branch\nCH B c-branch | changed: name"
        );
        assert_eq!(
            results.format(true),
            "-  B a-branch\nCH B c-branch\n  name:\n    - a\n    + b"
        );
    }

    #[test]
    fn test_format_all_lists_equal_objects() {
        let results = Results {
            equal: false,
            results: vec![
                result(2, "b-branch", ResultState::Equal),
                result(1, "a-branch", ResultState::OnlyInLocal),
            ],
            errors: Vec::new(),
        };

        assert_eq!(results.format(false), "+  B a-branch");
        assert_eq!(results.format_all(false), "+  B a-branch\n=  B b-branch");
    }

    #[test]
    fn test_format_all_of_empty_project() {
        assert_eq!(Results::default().format_all(true), "No difference.");
    }
}
