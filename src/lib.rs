//! jobspec library
//!
//! Captures the state of a directory as a canonical, schema-validated job
//! specification and round-trips it to and from disk so a provisioning
//! engine can consume it.
//!
//! The public surface is five operations:
//!
//! - [`StateManager::generate`]: scan a directory into a [`StateDocument`]
//! - [`StateManager::dehydrate`]: write a document atomically
//! - [`StateManager::rehydrate`]: read a document back, unvalidated
//! - [`SchemaValidator::validate`]: check a document against its schema
//! - [`JobSpecExtractor::get_job_spec_data`]: read + validate, yielding a
//!   [`SpecFileRecord`]

pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod extractor;
pub mod fetch;
pub mod jobs;
pub mod provision;
pub mod scanner;
pub mod schema;
pub mod state;
pub mod types;
pub mod validator;

pub use config::{EngineConfig, ScanPolicy};
pub use document::{Entry, EntryMetadata, RawDocument, StateDocument, StateMetadata};
pub use error::{Result, SchemaDiagnostic, SpecError, ValidationError};
pub use extractor::{JobSpecExtractor, SpecFileRecord};
pub use fetch::{GitFetcher, RepositoryFetcher};
pub use jobs::Jobs;
pub use provision::{DryRunProvisioner, Provisioner};
pub use scanner::FileSystem;
pub use state::StateManager;
pub use types::{EntryKind, SchemaVersion, SymlinkPolicy, UnreadablePolicy};
pub use validator::{DocumentValidator, SchemaValidator};
