//! Job orchestration
//!
//! Chains the collaborators around the engine:
//!
//! - local spec: extract → provisioner
//! - repository: fetch → generate → dehydrate → extract → provisioner
//!
//! The repository path still goes through the extractor, so every record a
//! provisioner sees was read back from disk and validated.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::EngineConfig;
use crate::extractor::{JobSpecExtractor, SpecFileRecord};
use crate::fetch::{repository_name, GitFetcher, RepositoryFetcher};
use crate::provision::{DryRunProvisioner, Provisioner};
use crate::scanner::FileSystem;
use crate::state::StateManager;

/// Entry point used by the CLI
#[derive(Debug)]
pub struct Jobs<F = GitFetcher, P = DryRunProvisioner> {
    workspace: PathBuf,
    state_manager: StateManager,
    extractor: JobSpecExtractor,
    fetcher: F,
    provisioner: P,
}

impl Jobs {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Self::with_collaborators(config, GitFetcher::new(), DryRunProvisioner)
    }
}

impl<F: RepositoryFetcher, P: Provisioner> Jobs<F, P> {
    pub fn with_collaborators(config: &EngineConfig, fetcher: F, provisioner: P) -> Result<Self> {
        let state_manager = StateManager::new(config)?;
        Ok(Self {
            workspace: config.workspace.clone(),
            extractor: JobSpecExtractor::from_state_manager(state_manager.clone()),
            state_manager,
            fetcher,
            provisioner,
        })
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Validated record for a spec file on the local filesystem
    pub fn spec_from_file(&self, spec_file: &Path) -> Result<SpecFileRecord> {
        let record = self.extractor.get_job_spec_data(spec_file)?;
        Ok(record)
    }

    /// Check out `url`, snapshot it, and return the validated record.
    ///
    /// The checkout lands in `<workspace>/<name>` (replacing any previous
    /// checkout) and the spec in `<workspace>/<name>.spec.json`.
    pub fn spec_from_repository(&self, url: &str, branch: Option<&str>) -> Result<SpecFileRecord> {
        let name = repository_name(url);
        let checkout = self.workspace.join(&name);
        let spec_file = self.workspace.join(format!("{name}.spec.json"));

        fs::create_dir_all(&self.workspace).with_context(|| {
            format!("Failed to create workspace {}", self.workspace.display())
        })?;
        if checkout.exists() {
            info!("Replacing previous checkout at {}", checkout.display());
            fs::remove_dir_all(&checkout)
                .with_context(|| format!("Failed to clear {}", checkout.display()))?;
        }

        self.fetcher
            .fetch(url, branch, &checkout)
            .with_context(|| format!("Failed to fetch {url}"))?;

        let document = self.state_manager.generate(&FileSystem::new(&checkout))?;
        self.state_manager.dehydrate(document, &spec_file)?;

        self.spec_from_file(&spec_file)
    }

    pub fn precheck(&self, record: &SpecFileRecord) -> Result<()> {
        self.provisioner.precheck(record)
    }

    pub fn provision(&self, record: &SpecFileRecord) -> Result<()> {
        self.provisioner.provision(record)
    }
}
