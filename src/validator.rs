//! Schema validation
//!
//! Validation is pure: the embedded schemas are compiled once when the
//! validator is built, and `validate` only reads the document it is given.
//!
//! A document passes in four stages, stopping at the first stage that fails:
//!
//! 1. **Version**: `version` is present, a string, and a known tag
//! 2. **Schema**: the JSON Schema for that version accepts the document
//! 3. **Decoding**: counts are exact unsigned integers and the document
//!    deserializes into a [`StateDocument`]
//! 4. **Structure**: rules JSON Schema cannot express (unique relative
//!    entry paths, a consistent entry count, no metadata on directories)

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use strum::IntoEnumIterator;
use tracing::{debug, Span};

use crate::config::EngineConfig;
use crate::document::{RawDocument, StateDocument};
use crate::error::{Result, SchemaDiagnostic, ValidationError};
use crate::schema::{render, JobSchema};
use crate::types::{EntryKind, SchemaVersion};

/// Label used in errors when the document does not declare a usable version
const UNDECLARED: &str = "undeclared";

/// Checks an unvalidated document and yields its trusted, typed form.
pub trait DocumentValidator {
    fn validate(&self, document: &RawDocument) -> std::result::Result<StateDocument, ValidationError>;
}

/// Validator backed by the embedded job schemas
#[derive(Debug)]
pub struct SchemaValidator {
    schemas: HashMap<SchemaVersion, JobSchema>,
    span: Span,
}

impl SchemaValidator {
    /// Compile every known schema version
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let schemas = SchemaVersion::iter()
            .map(|version| JobSchema::load(version).map(|schema| (version, schema)))
            .collect::<Result<HashMap<_, _>>>()?;

        Ok(Self {
            schemas,
            span: tracing::debug_span!("validator", default_version = %config.schema_version),
        })
    }

    /// Validate `document` against the schema of the version it declares
    pub fn validate(
        &self,
        document: &RawDocument,
    ) -> std::result::Result<StateDocument, ValidationError> {
        let _enter = self.span.enter();
        let value = document.as_value();

        let version = declared_version(value)?;
        let schema = self.schemas.get(&version).ok_or_else(|| {
            ValidationError::new(
                version.as_str(),
                SchemaDiagnostic::new("/version", "a compiled schema", version.as_str()),
            )
        })?;

        if let Some(err) = ValidationError::from_diagnostics(version.as_str(), schema.check(value)) {
            debug!("Document rejected by {} schema: {}", version, err);
            return Err(err);
        }

        if let Some(err) =
            ValidationError::from_diagnostics(version.as_str(), count_diagnostics(value))
        {
            debug!("Document has counts outside the unsigned range: {}", err);
            return Err(err);
        }

        let typed: StateDocument = serde_json::from_value(value.clone()).map_err(|e| {
            ValidationError::new(
                version.as_str(),
                SchemaDiagnostic::new("/", "a job document", e.to_string()),
            )
        })?;

        if let Some(err) =
            ValidationError::from_diagnostics(version.as_str(), structural_diagnostics(&typed))
        {
            debug!("Document failed structural checks: {}", err);
            return Err(err);
        }

        debug!(
            "Document valid against {} ({} entries)",
            version,
            typed.entries.len()
        );
        Ok(typed)
    }
}

impl DocumentValidator for SchemaValidator {
    fn validate(&self, document: &RawDocument) -> std::result::Result<StateDocument, ValidationError> {
        SchemaValidator::validate(self, document)
    }
}

impl<T: DocumentValidator + ?Sized> DocumentValidator for Arc<T> {
    fn validate(&self, document: &RawDocument) -> std::result::Result<StateDocument, ValidationError> {
        (**self).validate(document)
    }
}

fn declared_version(value: &Value) -> std::result::Result<SchemaVersion, ValidationError> {
    let Some(object) = value.as_object() else {
        return Err(ValidationError::new(
            UNDECLARED,
            SchemaDiagnostic::new("/", "an object", render(value)),
        ));
    };

    match object.get("version") {
        None => Err(ValidationError::new(
            UNDECLARED,
            SchemaDiagnostic::new("/version", "required property", "missing"),
        )),
        Some(Value::String(tag)) => tag.parse::<SchemaVersion>().map_err(|_| {
            ValidationError::new(
                UNDECLARED,
                SchemaDiagnostic::new(
                    "/version",
                    format!("one of {}", SchemaVersion::known()),
                    render(&Value::String(tag.clone())),
                ),
            )
        }),
        Some(other) => Err(ValidationError::new(
            UNDECLARED,
            SchemaDiagnostic::new("/version", "a schema version string", render(other)),
        )),
    }
}

/// Counts the schema accepts as `integer` but that do not fit a `u64` (`1.0`, `1e20`)
fn count_diagnostics(value: &Value) -> Vec<SchemaDiagnostic> {
    let mut counts = vec![(
        "/state/entry_count".to_string(),
        value.pointer("/state/entry_count"),
    )];
    if let Some(entries) = value.get("entries").and_then(Value::as_array) {
        counts.extend(entries.iter().enumerate().map(|(index, entry)| {
            (
                format!("/entries/{index}/metadata/size"),
                entry.pointer("/metadata/size"),
            )
        }));
    }

    counts
        .into_iter()
        .filter_map(|(pointer, found)| {
            let found = found?;
            let exact = found.as_number().map_or(true, |n| n.is_u64());
            (!exact).then(|| {
                SchemaDiagnostic::new(pointer, "an unsigned 64-bit integer", render(found))
            })
        })
        .collect()
}

fn structural_diagnostics(document: &StateDocument) -> Vec<SchemaDiagnostic> {
    let mut diagnostics = Vec::new();
    let mut seen: HashMap<&str, usize> = HashMap::new();

    for (index, entry) in document.entries.iter().enumerate() {
        let pointer = format!("/entries/{index}/path");

        if let Some(component) = entry
            .path
            .split('/')
            .find(|c| c.is_empty() || *c == "." || *c == "..")
        {
            diagnostics.push(
                SchemaDiagnostic::new(
                    pointer.clone(),
                    "a normalized relative path",
                    render(&Value::String(entry.path.clone())),
                )
                .with_message(format!(
                    "entry path contains a disallowed component {component:?}"
                )),
            );
        }

        if let Some(first) = seen.insert(entry.path.as_str(), index) {
            diagnostics.push(
                SchemaDiagnostic::new(
                    pointer,
                    "a unique path",
                    format!("duplicate of /entries/{first}/path"),
                )
                .with_message(format!("entry path {:?} appears more than once", entry.path)),
            );
        }

        if entry.kind == EntryKind::Directory && entry.metadata.is_some() {
            diagnostics.push(SchemaDiagnostic::new(
                format!("/entries/{index}/metadata"),
                "no metadata on a directory",
                "metadata object",
            ));
        }
    }

    let actual = document.entries.len() as u64;
    if document.state.entry_count != actual {
        diagnostics.push(SchemaDiagnostic::new(
            "/state/entry_count",
            actual.to_string(),
            document.state.entry_count.to_string(),
        ));
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Entry;
    use serde_json::json;

    fn validator() -> SchemaValidator {
        SchemaValidator::new(&EngineConfig::default()).unwrap()
    }

    fn raw(value: Value) -> RawDocument {
        RawDocument::new(value)
    }

    fn sample() -> StateDocument {
        StateDocument::new(
            SchemaVersion::JobV1,
            "/srv/app",
            vec![
                Entry::file("a.txt", 5, false),
                Entry::directory("b"),
                Entry::file("b/c.txt", 0, false),
            ],
        )
    }

    #[test]
    fn test_typed_document_round_trips_through_validation() {
        let doc = sample();
        let validated = validator().validate(&RawDocument::from(&doc)).unwrap();
        assert_eq!(validated, doc);
    }

    #[test]
    fn test_empty_document_is_valid() {
        let doc = StateDocument::new(SchemaVersion::JobV1, "/empty", Vec::new());
        assert!(validator().validate(&RawDocument::from(&doc)).is_ok());
    }

    #[test]
    fn test_non_object_rejected_at_root() {
        let err = validator().validate(&raw(json!(["job_v1"]))).unwrap_err();
        assert_eq!(err.path(), "/");
        assert_eq!(err.version, UNDECLARED);
    }

    #[test]
    fn test_missing_version_named() {
        let err = validator().validate(&raw(json!({"one": "two"}))).unwrap_err();
        assert_eq!(err.path(), "/version");
        assert_eq!(err.diagnostics()[0].actual, "missing");
    }

    #[test]
    fn test_unknown_version_lists_known() {
        let err = validator()
            .validate(&raw(json!({"version": "job_v9", "state": {}, "entries": []})))
            .unwrap_err();
        assert_eq!(err.path(), "/version");
        assert!(err.diagnostics()[0].expected.contains("job_v1"));
    }

    #[test]
    fn test_numeric_version_rejected() {
        let err = validator().validate(&raw(json!({"version": 1}))).unwrap_err();
        assert_eq!(err.path(), "/version");
        assert_eq!(err.diagnostics()[0].actual, "1");
    }

    #[test]
    fn test_missing_entries_named() {
        let mut value = RawDocument::from(&sample()).into_value();
        value.as_object_mut().unwrap().remove("entries");

        let err = validator().validate(&raw(value)).unwrap_err();
        assert!(err.mentions("/entries"));
        assert_eq!(err.version, "job_v1");
    }

    #[test]
    fn test_duplicate_paths_rejected() {
        let doc = StateDocument::new(
            SchemaVersion::JobV1,
            "/srv",
            vec![Entry::directory("b"), Entry::file("b", 1, false)],
        );
        let err = validator().validate(&RawDocument::from(&doc)).unwrap_err();
        assert_eq!(err.path(), "/entries/1/path");
        assert!(err.diagnostics()[0].actual.contains("/entries/0/path"));
    }

    #[test]
    fn test_parent_traversal_rejected() {
        let doc = StateDocument::new(
            SchemaVersion::JobV1,
            "/srv",
            vec![Entry::file("a/../../etc/passwd", 1, false)],
        );
        let err = validator().validate(&RawDocument::from(&doc)).unwrap_err();
        assert_eq!(err.path(), "/entries/0/path");
    }

    #[test]
    fn test_trailing_slash_rejected() {
        let doc = StateDocument::new(SchemaVersion::JobV1, "/srv", vec![Entry::directory("b/")]);
        assert!(validator().validate(&RawDocument::from(&doc)).is_err());
    }

    #[test]
    fn test_entry_count_mismatch_rejected() {
        let mut doc = sample();
        doc.state.entry_count = 7;
        let err = validator().validate(&RawDocument::from(&doc)).unwrap_err();
        assert_eq!(err.path(), "/state/entry_count");
        assert_eq!(err.diagnostics()[0].expected, "3");
        assert_eq!(err.diagnostics()[0].actual, "7");
    }

    #[test]
    fn test_float_counts_name_their_field() {
        let mut value = RawDocument::from(&sample()).into_value();
        value["entries"][0]["metadata"]["size"] = json!(1.0);
        value["state"]["entry_count"] = json!(1e20);

        let err = validator().validate(&raw(value)).unwrap_err();
        assert_eq!(err.path(), "/state/entry_count");
        assert!(err.mentions("/entries/0/metadata/size"));
        assert!(!err.mentions("/"));
        assert_eq!(err.diagnostics()[1].actual, "1.0");
    }

    #[test]
    fn test_directory_metadata_rejected() {
        let mut doc = sample();
        doc.entries[1].metadata = Some(crate::document::EntryMetadata {
            size: 0,
            executable: false,
        });
        let err = validator().validate(&RawDocument::from(&doc)).unwrap_err();
        assert_eq!(err.path(), "/entries/1/metadata");
    }

    #[test]
    fn test_file_without_metadata_accepted() {
        let value = json!({
            "version": "job_v1",
            "state": {"root": "hand-written", "entry_count": 1},
            "entries": [{"path": "playbook.yml", "kind": "file"}]
        });
        let doc = validator().validate(&raw(value)).unwrap();
        assert!(doc.entries[0].metadata.is_none());
    }

    #[test]
    fn test_validation_is_repeatable() {
        let v = validator();
        let input = raw(json!({"version": "job_v1"}));
        assert_eq!(v.validate(&input).unwrap_err(), v.validate(&input).unwrap_err());
    }
}
