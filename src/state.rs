//! State manager
//!
//! Builds documents from scans and moves them between memory and disk.
//!
//! # Canonical text
//!
//! `dehydrate` writes pretty JSON with two-space indentation, object keys
//! sorted at every level, and a trailing newline, so the same document always
//! produces the same bytes.
//!
//! # Atomic writes
//!
//! The text goes to a temporary file in the destination's directory, is
//! flushed and synced, and is then renamed over the destination. Readers see
//! either the old file or the complete new one.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info, Span};

use crate::config::EngineConfig;
use crate::document::{RawDocument, StateDocument};
use crate::error::{Result, SpecError};
use crate::scanner::FileSystem;
use crate::types::SchemaVersion;
use crate::validator::SchemaValidator;

/// Generates, dehydrates and rehydrates state documents
#[derive(Debug, Clone)]
pub struct StateManager {
    config: EngineConfig,
    validator: Arc<SchemaValidator>,
    span: Span,
}

impl StateManager {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Ok(Self::with_validator(config, Arc::new(SchemaValidator::new(config)?)))
    }

    /// Reuse schemas that are already compiled
    pub fn with_validator(config: &EngineConfig, validator: Arc<SchemaValidator>) -> Self {
        Self {
            config: config.clone(),
            validator,
            span: tracing::debug_span!("state_manager", version = %config.schema_version),
        }
    }

    pub fn validator(&self) -> &Arc<SchemaValidator> {
        &self.validator
    }

    pub fn schema_version(&self) -> SchemaVersion {
        self.config.schema_version
    }

    /// Snapshot `filesystem` as a document tagged with the configured version.
    ///
    /// The document is run through the validator before it is returned; a
    /// generated document that fails its own schema surfaces as a
    /// `Validation` error instead of leaving the engine.
    pub fn generate(&self, filesystem: &FileSystem) -> Result<StateDocument> {
        let _enter = self.span.enter();
        debug!("Generating state from {}", filesystem.root().display());

        let entries = filesystem.scan(&self.config.scan)?;
        let document = StateDocument::new(
            self.config.schema_version,
            filesystem.root().display().to_string(),
            entries,
        );

        let checked = self.validator.validate(&RawDocument::from(&document))?;
        debug!("State generated with {} entries", checked.entries.len());
        Ok(checked)
    }

    /// Write `document` to `destination` atomically and hand it back.
    pub fn dehydrate<D: Serialize>(&self, document: D, destination: &Path) -> Result<D> {
        let _enter = self.span.enter();
        let text = to_canonical_string(&document).map_err(|e| {
            SpecError::io(destination, io::Error::new(io::ErrorKind::InvalidData, e))
        })?;

        let parent = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut staged =
            stage_in(parent, destination).map_err(|e| SpecError::io(destination, e))?;
        write_synced(&mut staged, &text).map_err(|e| SpecError::io(destination, e))?;
        staged
            .persist(destination)
            .map_err(|e| SpecError::io(destination, e.error))?;

        info!("State written to {} ({} bytes)", destination.display(), text.len());
        Ok(document)
    }

    /// Read and parse the document at `source` without validating it.
    pub fn rehydrate(&self, source: &Path) -> Result<RawDocument> {
        let _enter = self.span.enter();
        debug!("Reading state from {}", source.display());

        let bytes = fs::read(source).map_err(|e| SpecError::from_io(source, e))?;
        let value: Value =
            serde_json::from_slice(&bytes).map_err(|e| SpecError::parse(source, &e))?;

        Ok(RawDocument::new(value))
    }
}

/// Temporary file next to `destination` carrying the mode the final file should have.
///
/// An existing destination keeps its permissions; a new one gets 0666 less the umask,
/// as a plain create would.
fn stage_in(parent: &Path, destination: &Path) -> io::Result<NamedTempFile> {
    let existing = fs::metadata(destination).ok().map(|m| m.permissions());
    let staged = new_staged(parent)?;
    if let Some(permissions) = existing {
        staged.as_file().set_permissions(permissions)?;
    }
    Ok(staged)
}

#[cfg(unix)]
fn new_staged(parent: &Path) -> io::Result<NamedTempFile> {
    use std::os::unix::fs::PermissionsExt;
    tempfile::Builder::new()
        .permissions(fs::Permissions::from_mode(0o666))
        .tempfile_in(parent)
}

#[cfg(not(unix))]
fn new_staged(parent: &Path) -> io::Result<NamedTempFile> {
    NamedTempFile::new_in(parent)
}

fn write_synced(staged: &mut NamedTempFile, text: &str) -> io::Result<()> {
    staged.write_all(text.as_bytes())?;
    staged.flush()?;
    staged.as_file().sync_all()
}

/// The exact text `dehydrate` writes for `document`
pub fn to_canonical_string<D: Serialize + ?Sized>(
    document: &D,
) -> std::result::Result<String, serde_json::Error> {
    let value = sort_keys(serde_json::to_value(document)?);
    let mut text = serde_json::to_string_pretty(&value)?;
    text.push('\n');
    Ok(text)
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut fields: Vec<_> = map.into_iter().collect();
            fields.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(fields.into_iter().map(|(k, v)| (k, sort_keys(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
