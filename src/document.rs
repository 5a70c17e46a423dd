//! Document model
//!
//! `StateDocument` is the typed, trusted form: only `generate` and a
//! successful `validate` produce one. `RawDocument` is whatever well-formed
//! JSON was read back from storage and has not been checked yet.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{EntryKind, SchemaVersion};

/// Canonical snapshot of a filesystem location or a hand-authored job spec
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateDocument {
    pub version: SchemaVersion,
    pub state: StateMetadata,
    pub entries: Vec<Entry>,
}

/// Top-level state metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateMetadata {
    /// Scanned root, exactly as the caller named it
    pub root: String,
    pub entry_count: u64,
}

/// One file or directory below the root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Entry {
    /// `/`-separated path relative to the root
    pub path: String,
    pub kind: EntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EntryMetadata>,
}

/// Per-file metadata; directories carry none
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntryMetadata {
    pub size: u64,
    pub executable: bool,
}

impl Entry {
    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Directory,
            metadata: None,
        }
    }

    pub fn file(path: impl Into<String>, size: u64, executable: bool) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::File,
            metadata: Some(EntryMetadata { size, executable }),
        }
    }
}

impl StateDocument {
    /// Wrap scanned entries; `entry_count` always matches `entries`
    pub fn new(version: SchemaVersion, root: impl Into<String>, entries: Vec<Entry>) -> Self {
        Self {
            version,
            state: StateMetadata {
                root: root.into(),
                entry_count: entries.len() as u64,
            },
            entries,
        }
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.path.as_str())
    }

    pub fn find(&self, path: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn files(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| e.kind == EntryKind::File)
    }
}

/// Well-formed JSON loaded from storage, not yet checked against a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawDocument(Value);

impl RawDocument {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// The `version` tag as written, if it is a string
    pub fn declared_version(&self) -> Option<&str> {
        self.0.get("version").and_then(Value::as_str)
    }
}

impl From<Value> for RawDocument {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<&StateDocument> for RawDocument {
    fn from(document: &StateDocument) -> Self {
        // Plain structs, string keys and integers: serialization cannot fail.
        Self(serde_json::to_value(document).unwrap_or(Value::Null))
    }
}

impl PartialEq<Value> for RawDocument {
    fn eq(&self, other: &Value) -> bool {
        &self.0 == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> StateDocument {
        StateDocument::new(
            SchemaVersion::JobV1,
            "/srv/project",
            vec![
                Entry::file("a.txt", 3, false),
                Entry::directory("b"),
                Entry::file("b/c.sh", 10, true),
            ],
        )
    }

    #[test]
    fn test_entry_count_tracks_entries() {
        assert_eq!(sample().state.entry_count, 3);
    }

    #[test]
    fn test_serialized_shape() {
        let raw = RawDocument::from(&sample());
        assert_eq!(
            raw,
            json!({
                "version": "job_v1",
                "state": {"root": "/srv/project", "entry_count": 3},
                "entries": [
                    {"path": "a.txt", "kind": "file", "metadata": {"size": 3, "executable": false}},
                    {"path": "b", "kind": "directory"},
                    {"path": "b/c.sh", "kind": "file", "metadata": {"size": 10, "executable": true}}
                ]
            })
        );
    }

    #[test]
    fn test_declared_version() {
        assert_eq!(RawDocument::from(&sample()).declared_version(), Some("job_v1"));
        assert_eq!(RawDocument::new(json!({"version": 1})).declared_version(), None);
        assert_eq!(RawDocument::new(json!([])).declared_version(), None);
    }

    #[test]
    fn test_lookup_helpers() {
        let doc = sample();
        assert_eq!(doc.paths().collect::<Vec<_>>(), vec!["a.txt", "b", "b/c.sh"]);
        assert_eq!(doc.find("b").map(|e| e.kind), Some(EntryKind::Directory));
        assert!(doc.find("missing").is_none());
        assert_eq!(doc.files().count(), 2);
    }
}
