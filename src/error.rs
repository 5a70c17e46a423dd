//! Error handling for the job specification engine
//!
//! Every engine operation fails fast with a [`SpecError`]. The four runtime
//! kinds map one-to-one onto the causes callers need to tell apart: the path
//! is missing, the text is not JSON, the document breaks its schema, or the
//! filesystem refused a read or write.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::types::SchemaVersion;

/// Main error type for the engine
#[derive(Error, Debug)]
pub enum SpecError {
    /// Referenced path does not exist
    #[error("Not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Persisted text is not well-formed JSON
    #[error("Parse error in {} at line {line}, column {column}: {reason}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        column: usize,
        reason: String,
    },

    /// Document does not conform to its schema
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Read or write failed (permissions, disk, missing parent directory)
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An embedded schema resource could not be loaded
    #[error("Schema {version} could not be loaded: {reason}")]
    Schema {
        version: SchemaVersion,
        reason: String,
    },
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, SpecError>;

impl SpecError {
    /// Create an IO error for `path`
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Classify an IO failure, splitting "does not exist" from everything else
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::io(path, source)
        }
    }

    /// Create a parse error from a serde_json failure
    pub fn parse(path: &Path, err: &serde_json::Error) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            line: err.line(),
            column: err.column(),
            reason: err.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// One schema mismatch located inside a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaDiagnostic {
    /// JSON pointer to the offending value.
    ///
    /// The document root is written `/`, not the RFC 6901 empty string, so a
    /// root-level failure still shows a path in messages.
    pub path: String,
    /// What the schema requires at `path`
    pub expected: String,
    /// What the document holds at `path`
    pub actual: String,
    /// Human-readable description of the mismatch
    pub message: String,
}

impl SchemaDiagnostic {
    pub fn new(
        path: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        let expected = expected.into();
        let actual = actual.into();
        Self {
            path: path.into(),
            message: format!("expected {expected}, found {actual}"),
            expected,
            actual,
        }
    }

    /// Replace the generated message with a more specific one
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl fmt::Display for SchemaDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// A document failed validation against `version`.
///
/// Always carries at least one diagnostic; the first one is the primary
/// failure reported by [`ValidationError::path`].
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("Validation error ({version}): {}", self.summary())]
pub struct ValidationError {
    pub version: String,
    diagnostics: Vec<SchemaDiagnostic>,
}

impl ValidationError {
    pub fn new(version: impl Into<String>, first: SchemaDiagnostic) -> Self {
        Self {
            version: version.into(),
            diagnostics: vec![first],
        }
    }

    /// Build from a list of diagnostics; `None` when the list is empty.
    pub fn from_diagnostics(
        version: impl Into<String>,
        diagnostics: Vec<SchemaDiagnostic>,
    ) -> Option<Self> {
        if diagnostics.is_empty() {
            return None;
        }
        Some(Self {
            version: version.into(),
            diagnostics,
        })
    }

    /// JSON pointer of the primary failure
    pub fn path(&self) -> &str {
        &self.diagnostics[0].path
    }

    pub fn diagnostics(&self) -> &[SchemaDiagnostic] {
        &self.diagnostics
    }

    /// True when any diagnostic points at `path`
    pub fn mentions(&self, path: &str) -> bool {
        self.diagnostics.iter().any(|d| d.path == path)
    }

    fn summary(&self) -> String {
        let first = &self.diagnostics[0];
        match self.diagnostics.len() {
            1 => first.to_string(),
            n => format!("{} (and {} more)", first, n - 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let err = SpecError::from_io(
            Path::new("/missing/spec.json"),
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Not found: /missing/spec.json");
    }

    #[test]
    fn test_permission_denied_is_io() {
        let err = SpecError::from_io(
            Path::new("/root/spec.json"),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, SpecError::Io { .. }));
    }

    #[test]
    fn test_parse_error_carries_position() {
        let json_err = serde_json::from_str::<serde_json::Value>("{\n  \"a\": }").unwrap_err();
        let err = SpecError::parse(Path::new("spec.json"), &json_err);
        match err {
            SpecError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validation_error_display() {
        let mut err = ValidationError::new(
            "job_v1",
            SchemaDiagnostic::new("/state/root", "required property", "missing"),
        );
        assert_eq!(
            err.to_string(),
            "Validation error (job_v1): /state/root: expected required property, found missing"
        );

        err.diagnostics
            .push(SchemaDiagnostic::new("/entries", "array", "null"));
        assert!(err.to_string().ends_with("(and 1 more)"));
        assert_eq!(err.path(), "/state/root");
        assert!(err.mentions("/entries"));
    }

    #[test]
    fn test_custom_message() {
        let diag = SchemaDiagnostic::new("/entries/0/path", "relative path", "\"/etc\"")
            .with_message("entry path must be relative");
        assert_eq!(diag.to_string(), "/entries/0/path: entry path must be relative");
        assert_eq!(diag.expected, "relative path");
    }

    #[test]
    fn test_empty_diagnostics_rejected() {
        assert!(ValidationError::from_diagnostics("job_v1", Vec::new()).is_none());
    }

    #[test]
    fn test_validation_converts_into_spec_error() {
        let err: SpecError =
            ValidationError::new("job_v1", SchemaDiagnostic::new("/", "object", "array")).into();
        assert!(err.is_validation());
    }
}
