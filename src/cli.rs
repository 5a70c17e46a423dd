use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::EngineConfig;
use crate::types::{SymlinkPolicy, UnreadablePolicy};

/// jobspec - snapshot directories as validated job specifications
#[derive(Parser)]
#[command(name = "jobspec")]
#[command(about = "Capture a directory as a schema-validated job spec and hand it to provisioning")]
#[command(version)]
pub struct Cli {
    /// Engine configuration file (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Follow symbolic links while scanning instead of skipping them
    #[arg(long, global = true)]
    pub follow_symlinks: bool,

    /// Fail the scan on the first unreadable entry instead of skipping it
    #[arg(long, global = true)]
    pub abort_on_unreadable: bool,

    /// Directory where repositories are checked out
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Snapshot a directory as a job spec
    Generate {
        /// Directory to scan
        root: PathBuf,
        /// Write the spec here instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print a spec file as stored, without validating it
    Show {
        /// Path to the spec file
        spec: PathBuf,
    },
    /// Validate a spec file against its schema
    Validate {
        /// Path to the spec file
        spec: PathBuf,
    },
    /// Validate a job and run the provisioner's precheck
    Precheck {
        #[command(subcommand)]
        source: SourceCommands,
    },
    /// Validate a job and hand it to the provisioner
    Apply {
        #[command(subcommand)]
        source: SourceCommands,
    },
}

/// Where a job comes from
#[derive(Subcommand)]
pub enum SourceCommands {
    /// A spec file on the local filesystem
    Spec {
        /// Path to the spec file
        spec: PathBuf,
    },
    /// A remote git repository, snapshotted after cloning
    Github {
        /// Repository URL
        url: String,
        /// Branch to check out (defaults to the remote's default branch)
        #[arg(short, long)]
        branch: Option<String>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }

    /// Configuration file (or defaults) with command-line overrides applied
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load_from_file(path)?,
            None => EngineConfig::default(),
        };

        if self.follow_symlinks {
            config.scan.symlinks = SymlinkPolicy::Follow;
        }
        if self.abort_on_unreadable {
            config.scan.unreadable = UnreadablePolicy::Abort;
        }
        if let Some(workspace) = &self.workspace {
            config.workspace = workspace.clone();
        }

        Ok(config)
    }
}
