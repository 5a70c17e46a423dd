//! Embedded job schemas
//!
//! Each `SchemaVersion` maps to a JSON Schema (draft 7) compiled into the
//! binary with `include_str!`, so validation never depends on where the crate
//! was installed.

use std::fmt;

use jsonschema::error::{TypeKind, ValidationErrorKind};
use jsonschema::{Draft, JSONSchema};
use serde_json::Value;

use crate::error::{Result, SchemaDiagnostic, SpecError};
use crate::types::SchemaVersion;

const JOB_V1: &str = include_str!("../schemas/job_v1.json");

/// Raw schema text for `version`
pub fn source(version: SchemaVersion) -> &'static str {
    match version {
        SchemaVersion::JobV1 => JOB_V1,
    }
}

/// A compiled schema for one version
pub struct JobSchema {
    version: SchemaVersion,
    definition: Value,
    compiled: JSONSchema,
}

impl fmt::Debug for JobSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobSchema")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl JobSchema {
    /// Parse and compile the embedded schema for `version`
    pub fn load(version: SchemaVersion) -> Result<Self> {
        let definition: Value =
            serde_json::from_str(source(version)).map_err(|e| SpecError::Schema {
                version,
                reason: e.to_string(),
            })?;

        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&definition)
            .map_err(|e| SpecError::Schema {
                version,
                reason: e.to_string(),
            })?;

        Ok(Self {
            version,
            definition,
            compiled,
        })
    }

    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    pub fn definition(&self) -> &Value {
        &self.definition
    }

    /// Every schema violation in `instance`, in the order the compiler reports them
    pub fn check(&self, instance: &Value) -> Vec<SchemaDiagnostic> {
        match self.compiled.validate(instance) {
            Ok(()) => Vec::new(),
            Err(errors) => errors.map(|error| diagnose(&error)).collect(),
        }
    }
}

/// Turn a compiler error into a located expected/actual diagnostic.
///
/// Missing and unexpected properties are reported at the property's own
/// pointer, not at the enclosing object, so callers can name the field.
fn diagnose(error: &jsonschema::ValidationError<'_>) -> SchemaDiagnostic {
    let base = error.instance_path.to_string();
    let message = error.to_string();

    match &error.kind {
        ValidationErrorKind::Required { property } => {
            let name = property
                .as_str()
                .map(str::to_owned)
                .unwrap_or_else(|| property.to_string());
            SchemaDiagnostic::new(child_pointer(&base, &name), "required property", "missing")
                .with_message(message)
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => {
            let name = unexpected.first().cloned().unwrap_or_default();
            SchemaDiagnostic::new(
                child_pointer(&base, &name),
                "no properties outside the schema",
                format!("unexpected property `{name}`"),
            )
            .with_message(message)
        }
        ValidationErrorKind::Type {
            kind: TypeKind::Single(expected),
        } => SchemaDiagnostic::new(
            root_pointer(&base),
            format!("a value of type {expected}"),
            render(&error.instance),
        )
        .with_message(message),
        ValidationErrorKind::Enum { options } => SchemaDiagnostic::new(
            root_pointer(&base),
            format!("one of {options}"),
            render(&error.instance),
        )
        .with_message(message),
        _ => SchemaDiagnostic::new(root_pointer(&base), keyword(error), render(&error.instance))
            .with_message(message),
    }
}

fn root_pointer(base: &str) -> String {
    if base.is_empty() {
        "/".to_string()
    } else {
        base.to_string()
    }
}

fn child_pointer(base: &str, name: &str) -> String {
    // RFC 6901 escaping
    let escaped = name.replace('~', "~0").replace('/', "~1");
    format!("{base}/{escaped}")
}

fn keyword(error: &jsonschema::ValidationError<'_>) -> String {
    let schema_path = error.schema_path.to_string();
    let keyword = schema_path.rsplit('/').next().unwrap_or_default();
    format!("a value satisfying `{keyword}`")
}

/// Compact rendering of an offending value, clipped for long payloads
pub(crate) fn render(value: &Value) -> String {
    const LIMIT: usize = 80;
    let text = value.to_string();
    if text.chars().count() > LIMIT {
        let clipped: String = text.chars().take(LIMIT).collect();
        format!("{clipped}...")
    } else {
        text
    }
}
