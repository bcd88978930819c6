//! Filesystem resolution inside the vault root.
//!
//! The root is canonicalized once at startup. Each request path is joined,
//! canonicalized, and required to land on a regular file that is a
//! descendant of the root. Canonicalization follows symlinks, so a link
//! pointing outside the vault fails the containment check even though the
//! link itself lives inside.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::AccessError;
use crate::validate::VaultRelPath;

/// The canonicalized vault root directory.
#[derive(Debug, Clone)]
pub struct VaultRoot {
    root: PathBuf,
}

/// A file that passed resolution: its canonical path and size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub path: PathBuf,
    pub size: u64,
}

impl VaultRoot {
    /// Open and canonicalize the vault root. Fails if the directory does
    /// not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let root = fs::canonicalize(path.as_ref())?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("vault root is not a directory: {}", root.display()),
            ));
        }
        Ok(Self { root })
    }

    /// The canonical root path.
    pub fn as_path(&self) -> &Path {
        &self.root
    }

    /// Resolve a validated relative path to a regular file inside the root.
    ///
    /// Every failure collapses to [`AccessError::NotFound`]: whether the
    /// path is absent, a directory, or escapes the root is not observable
    /// by clients.
    pub fn resolve(&self, rel: &VaultRelPath) -> Result<ResolvedFile, AccessError> {
        let joined = self.root.join(rel.as_str());

        let canonical = match fs::canonicalize(&joined) {
            Ok(path) => path,
            Err(err) => {
                tracing::debug!(path = %joined.display(), %err, "canonicalize failed");
                return Err(AccessError::NotFound);
            }
        };

        // Component-wise containment: /data/vault-other is not a
        // descendant of /data/vault.
        if !canonical.starts_with(&self.root) {
            tracing::warn!(
                requested = %rel,
                resolved = %canonical.display(),
                root = %self.root.display(),
                "resolved path escapes vault root"
            );
            return Err(AccessError::NotFound);
        }

        let metadata = fs::metadata(&canonical).map_err(AccessError::Io)?;
        if !metadata.is_file() {
            tracing::debug!(path = %canonical.display(), "not a regular file");
            return Err(AccessError::NotFound);
        }

        Ok(ResolvedFile {
            path: canonical,
            size: metadata.len(),
        })
    }
}
