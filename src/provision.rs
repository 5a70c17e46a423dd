//! Provisioning hand-off
//!
//! A provisioning engine receives a [`SpecFileRecord`] and nothing else. What
//! it does with the entries is outside this crate; `DryRunProvisioner` only
//! reports what a real engine would be given.

use anyhow::Result;
use std::fmt;
use std::path::PathBuf;
use tracing::info;

use crate::extractor::SpecFileRecord;
use crate::types::{EntryKind, SchemaVersion};

/// Consumer of validated job specs
pub trait Provisioner {
    /// Check that the job described by `record` can run
    fn precheck(&self, record: &SpecFileRecord) -> Result<()>;

    /// Run the job described by `record`
    fn provision(&self, record: &SpecFileRecord) -> Result<()>;
}

/// Counts describing a record, for logs and terminal output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSummary {
    pub location: PathBuf,
    pub version: SchemaVersion,
    pub root: String,
    pub files: usize,
    pub directories: usize,
    pub total_bytes: u64,
}

impl RecordSummary {
    pub fn of(record: &SpecFileRecord) -> Self {
        let content = record.content();
        let files = content.files().count();
        let total_bytes = content
            .files()
            .filter_map(|e| e.metadata.map(|m| m.size))
            .sum();
        let directories = content
            .entries
            .iter()
            .filter(|e| e.kind == EntryKind::Directory)
            .count();

        Self {
            location: record.location().to_path_buf(),
            version: content.version,
            root: content.state.root.clone(),
            files,
            directories,
            total_bytes,
        }
    }
}

impl fmt::Display for RecordSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): root {}, {} files, {} directories, {} bytes",
            self.location.display(),
            self.version,
            self.root,
            self.files,
            self.directories,
            self.total_bytes
        )
    }
}

/// Logs what would be provisioned and changes nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunProvisioner;

impl Provisioner for DryRunProvisioner {
    fn precheck(&self, record: &SpecFileRecord) -> Result<()> {
        info!("[DRY RUN] precheck {}", RecordSummary::of(record));
        Ok(())
    }

    fn provision(&self, record: &SpecFileRecord) -> Result<()> {
        let summary = RecordSummary::of(record);
        info!("[DRY RUN] provision {}", summary);
        for entry in &record.content().entries {
            info!("[DRY RUN]   {} {}", entry.kind, entry.path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Entry, StateDocument};

    fn record() -> SpecFileRecord {
        SpecFileRecord::new(
            StateDocument::new(
                SchemaVersion::JobV1,
                "/srv/profile",
                vec![
                    Entry::file("a.yml", 10, false),
                    Entry::directory("roles"),
                    Entry::file("roles/main.yml", 32, false),
                ],
            ),
            PathBuf::from("/w/profile.spec.json"),
        )
    }

    #[test]
    fn test_summary_counts() {
        let summary = RecordSummary::of(&record());
        assert_eq!(summary.files, 2);
        assert_eq!(summary.directories, 1);
        assert_eq!(summary.total_bytes, 42);
        assert_eq!(
            summary.to_string(),
            "/w/profile.spec.json (job_v1): root /srv/profile, 2 files, 1 directories, 42 bytes"
        );
    }

    #[test]
    fn test_dry_run_accepts_record() {
        let record = record();
        assert!(DryRunProvisioner.precheck(&record).is_ok());
        assert!(DryRunProvisioner.provision(&record).is_ok());
    }
}
