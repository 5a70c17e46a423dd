//! Type-safe tags and policies shared across the engine
//!
//! These enums replace stringly-typed values in documents and configuration;
//! strum provides the `Display`/`FromStr` pair and serde the wire spelling.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Versioned job schema a document declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum SchemaVersion {
    #[default]
    #[serde(rename = "job_v1")]
    #[strum(serialize = "job_v1")]
    JobV1,
}

impl SchemaVersion {
    /// Wire spelling of the tag
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JobV1 => "job_v1",
        }
    }

    /// Comma-separated list of every known tag, for diagnostics
    pub fn known() -> String {
        Self::iter()
            .map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Kind of a scanned filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// What the scanner does with symbolic links
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SymlinkPolicy {
    /// Leave links out of the document
    #[default]
    Skip,
    /// Resolve links and record the target's kind under the link's path
    Follow,
}

/// What the scanner does with children it cannot read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UnreadablePolicy {
    /// Log a warning and keep scanning
    #[default]
    Skip,
    /// Fail the whole scan
    Abort,
}
