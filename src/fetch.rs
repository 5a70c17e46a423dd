//! Remote repository fetching
//!
//! The engine has no network awareness. Before a remote spec can be scanned,
//! a `RepositoryFetcher` materializes it as a local directory. Failures are
//! reported once; retrying is the caller's decision.

use anyhow::{bail, Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, error, info};

/// Materializes a repository at `destination`
pub trait RepositoryFetcher {
    fn fetch(&self, url: &str, branch: Option<&str>, destination: &Path) -> Result<()>;
}

/// Shallow `git clone` through the system git binary
#[derive(Debug, Clone)]
pub struct GitFetcher {
    program: PathBuf,
}

impl Default for GitFetcher {
    fn default() -> Self {
        Self {
            program: PathBuf::from("git"),
        }
    }
}

impl GitFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different git executable
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments passed to git for one clone
    pub fn clone_args(url: &str, branch: Option<&str>, destination: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["clone".into(), "--depth".into(), "1".into()];
        if let Some(branch) = branch {
            args.push("--branch".into());
            args.push(branch.into());
        }
        args.push(url.into());
        args.push(destination.as_os_str().to_owned());
        args
    }
}

impl RepositoryFetcher for GitFetcher {
    fn fetch(&self, url: &str, branch: Option<&str>, destination: &Path) -> Result<()> {
        let args = Self::clone_args(url, branch, destination);
        info!(
            "Cloning {} (branch: {}) into {}",
            url,
            branch.unwrap_or("default"),
            destination.display()
        );
        debug!("Running {} {:?}", self.program.display(), args);

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("Failed to spawn {}", self.program.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("Clone of {} failed. Exit code: {:?}", url, output.status.code());
            bail!("git clone of {} failed: {}", url, stderr.trim());
        }

        Ok(())
    }
}

/// Directory-safe name for a repository URL (`https://host/org/app.git` → `app`)
pub fn repository_name(url: &str) -> String {
    let last = url
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .unwrap_or_default();
    let last = last.strip_suffix(".git").unwrap_or(last);

    let name: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();

    if name.is_empty() || name.chars().all(|c| c == '.') {
        "repository".to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_args_default_branch() {
        let args = GitFetcher::clone_args("https://example.com/a.git", None, Path::new("/w/a"));
        assert_eq!(
            args,
            vec!["clone", "--depth", "1", "https://example.com/a.git", "/w/a"]
        );
    }

    #[test]
    fn test_clone_args_with_branch() {
        let args = GitFetcher::clone_args(
            "https://example.com/a.git",
            Some("develop"),
            Path::new("/w/a"),
        );
        assert_eq!(
            args,
            vec![
                "clone",
                "--depth",
                "1",
                "--branch",
                "develop",
                "https://example.com/a.git",
                "/w/a"
            ]
        );
    }

    #[test]
    fn test_repository_name() {
        assert_eq!(repository_name("https://github.com/org/mac-profile.git"), "mac-profile");
        assert_eq!(repository_name("https://github.com/org/mac-profile/"), "mac-profile");
        assert_eq!(repository_name("git@github.com:org/dotfiles.git"), "dotfiles");
        assert_eq!(repository_name("git@host:solo.git"), "solo");
        assert_eq!(repository_name("https://x/y/we ird"), "we-ird");
        assert_eq!(repository_name(""), "repository");
        assert_eq!(repository_name("https://x/.."), "repository");
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_clone_is_error() {
        let fetcher = GitFetcher::with_program("false");
        let result = fetcher.fetch("https://example.com/a.git", None, Path::new("/tmp/none"));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_program_is_error() {
        let fetcher = GitFetcher::with_program("/nonexistent/git");
        let err = fetcher
            .fetch("https://example.com/a.git", None, Path::new("/tmp/none"))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to spawn"));
    }
}
