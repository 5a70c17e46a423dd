//! Job spec extraction
//!
//! The single place a provisioning engine gets a document from. A
//! [`SpecFileRecord`] can only be built here, and only after validation has
//! passed, so holding one is proof the content conforms to its schema.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, Span};

use crate::config::EngineConfig;
use crate::document::StateDocument;
use crate::error::Result;
use crate::state::StateManager;
use crate::validator::{DocumentValidator, SchemaValidator};

/// A validated document and the location it was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecFileRecord {
    content: StateDocument,
    location: PathBuf,
}

impl SpecFileRecord {
    pub(crate) fn new(content: StateDocument, location: PathBuf) -> Self {
        Self { content, location }
    }

    pub fn content(&self) -> &StateDocument {
        &self.content
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn into_parts(self) -> (StateDocument, PathBuf) {
        (self.content, self.location)
    }
}

/// Reads job spec files and hands out validated records
#[derive(Debug)]
pub struct JobSpecExtractor<V = Arc<SchemaValidator>> {
    state_manager: StateManager,
    validator: V,
    span: Span,
}

impl JobSpecExtractor<Arc<SchemaValidator>> {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Ok(Self::from_state_manager(StateManager::new(config)?))
    }

    /// Validate with the schemas `state_manager` already compiled
    pub fn from_state_manager(state_manager: StateManager) -> Self {
        let validator = Arc::clone(state_manager.validator());
        Self {
            state_manager,
            validator,
            span: tracing::debug_span!("extractor"),
        }
    }
}

impl<V: DocumentValidator> JobSpecExtractor<V> {
    /// Use a custom validator in place of the embedded schemas
    pub fn with_validator(config: &EngineConfig, validator: V) -> Result<Self> {
        Ok(Self {
            state_manager: StateManager::new(config)?,
            validator,
            span: tracing::debug_span!("extractor"),
        })
    }

    pub fn validator(&self) -> &V {
        &self.validator
    }

    /// Read the spec at `location` and validate it.
    ///
    /// Rehydration errors (`NotFound`, `Parse`, `Io`) are returned as-is and
    /// stop the call before validation. A schema failure is returned as
    /// `Validation`. Nothing is cached; every call re-reads the file.
    pub fn get_job_spec_data(&self, location: impl AsRef<Path>) -> Result<SpecFileRecord> {
        let _enter = self.span.enter();
        let location = location.as_ref();
        debug!("Reading job spec from {}", location.display());

        let raw = self.state_manager.rehydrate(location)?;
        let content = self.validator.validate(&raw)?;

        info!(
            "Job spec {} validated ({}, {} entries)",
            location.display(),
            content.version,
            content.entries.len()
        );
        Ok(SpecFileRecord::new(content, location.to_path_buf()))
    }
}
