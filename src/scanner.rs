//! Filesystem scanner
//!
//! Walks a root directory and returns every entry below it, sorted by the
//! `/`-joined relative path string. Sorting the collected paths (rather than
//! relying on walk order) is what makes `b` < `b.txt` < `b/c.txt` hold, and
//! what makes generated documents byte-reproducible on an unchanged tree.
//!
//! The scanner only reads. File contents are never opened.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::ScanPolicy;
use crate::document::Entry;
use crate::error::{Result, SpecError};
use crate::types::{SymlinkPolicy, UnreadablePolicy};

/// A local directory the engine can snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystem {
    root: PathBuf,
}

impl FileSystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Enumerate everything below the root in lexicographic path order
    ///
    /// # Errors
    ///
    /// - `NotFound` when the root does not exist
    /// - `Io` when the root is not a readable directory, or when a child is
    ///   unreadable and `policy.unreadable` is `Abort`
    pub fn scan(&self, policy: &ScanPolicy) -> Result<Vec<Entry>> {
        let root_meta = fs::metadata(&self.root).map_err(|e| SpecError::from_io(&self.root, e))?;
        if !root_meta.is_dir() {
            return Err(SpecError::io(
                &self.root,
                io::Error::new(io::ErrorKind::NotADirectory, "scan root is not a directory"),
            ));
        }

        debug!(
            "Scanning {} (symlinks={}, unreadable={})",
            self.root.display(),
            policy.symlinks,
            policy.unreadable
        );

        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .follow_links(policy.symlinks == SymlinkPolicy::Follow);

        let mut entries = Vec::new();
        for item in walker {
            let dirent = match item {
                Ok(dirent) => dirent,
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    on_unreadable(policy, path, io::Error::from(err))?;
                    continue;
                }
            };

            let file_type = dirent.file_type();
            if file_type.is_symlink() {
                // Only reachable when links are not followed
                debug!("Skipping symlink {}", dirent.path().display());
                continue;
            }

            let Some(relative) = relative_key(&self.root, dirent.path()) else {
                on_unreadable(
                    policy,
                    dirent.path().to_path_buf(),
                    io::Error::new(io::ErrorKind::InvalidData, "path is not valid UTF-8"),
                )?;
                continue;
            };

            if file_type.is_dir() {
                entries.push(Entry::directory(relative));
            } else if file_type.is_file() {
                let metadata = match dirent.metadata() {
                    Ok(metadata) => metadata,
                    Err(err) => {
                        on_unreadable(policy, dirent.path().to_path_buf(), io::Error::from(err))?;
                        continue;
                    }
                };
                entries.push(Entry::file(relative, metadata.len(), is_executable(&metadata)));
            } else {
                debug!("Skipping special file {}", dirent.path().display());
            }
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        debug!("Scan of {} found {} entries", self.root.display(), entries.len());
        Ok(entries)
    }
}

fn on_unreadable(policy: &ScanPolicy, path: PathBuf, source: io::Error) -> Result<()> {
    match policy.unreadable {
        UnreadablePolicy::Skip => {
            warn!("Skipping unreadable entry {}: {}", path.display(), source);
            Ok(())
        }
        UnreadablePolicy::Abort => Err(SpecError::io(path, source)),
    }
}

/// `/`-joined path of `path` below `root`; `None` for non-UTF-8 names
fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

#[cfg(unix)]
fn is_executable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &fs::Metadata) -> bool {
    false
}
