//! Engine configuration
//!
//! One explicit `EngineConfig` value is built by the caller (from defaults, a
//! JSON file, or CLI flags) and handed to every component at construction.
//! Nothing in the engine reads ambient global settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::{SchemaVersion, SymlinkPolicy, UnreadablePolicy};

/// How the scanner treats links and unreadable children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanPolicy {
    pub symlinks: SymlinkPolicy,
    pub unreadable: UnreadablePolicy,
}

/// Configuration shared by the scanner, state manager, validator and extractor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Schema tag stamped onto generated documents
    pub schema_version: SchemaVersion,

    /// Scanner behaviour
    pub scan: ScanPolicy,

    /// Directory where repositories are checked out before scanning
    pub workspace: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            schema_version: SchemaVersion::default(),
            scan: ScanPolicy::default(),
            workspace: std::env::temp_dir().join("jobspec"),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scan_policy(mut self, scan: ScanPolicy) -> Self {
        self.scan = scan;
        self
    }

    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = workspace.into();
        self
    }

    /// Load configuration from a JSON file; missing keys take their defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();
        assert_eq!(config.schema_version, SchemaVersion::JobV1);
        assert_eq!(config.scan.symlinks, SymlinkPolicy::Skip);
        assert_eq!(config.scan.unreadable, UnreadablePolicy::Skip);
        assert!(config.workspace.ends_with("jobspec"));
    }

    #[test]
    fn test_save_and_load_json_config() {
        let config = EngineConfig::new()
            .with_scan_policy(ScanPolicy {
                symlinks: SymlinkPolicy::Follow,
                unreadable: UnreadablePolicy::Abort,
            })
            .with_workspace("/srv/jobs");

        let temp_file = NamedTempFile::new().unwrap();
        config.save_to_file(temp_file.path()).unwrap();

        let loaded = EngineConfig::load_from_file(temp_file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(br#"{"scan": {"symlinks": "follow"}}"#)
            .unwrap();
        temp_file.flush().unwrap();

        let loaded = EngineConfig::load_from_file(temp_file.path()).unwrap();
        assert_eq!(loaded.scan.symlinks, SymlinkPolicy::Follow);
        assert_eq!(loaded.scan.unreadable, UnreadablePolicy::Skip);
        assert_eq!(loaded.schema_version, SchemaVersion::JobV1);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(br#"{"schema": "job_v1"}"#).unwrap();
        temp_file.flush().unwrap();

        assert!(EngineConfig::load_from_file(temp_file.path()).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result = EngineConfig::load_from_file("/nonexistent/jobspec.json");
        assert!(result.is_err());
    }
}
