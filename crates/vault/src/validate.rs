//! Relative path validation.
//!
//! Accepts exactly the grammar `folder/file` where both segments are
//! non-empty runs of `[A-Za-z0-9._-]`. Everything downstream of this module
//! takes a [`VaultRelPath`], so resolution and authorization can only ever
//! see a path that already passed the grammar.

use std::fmt;

use crate::error::AccessError;

/// A validated vault-relative path: one folder segment, one slash, one
/// file segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VaultRelPath {
    inner: String,
    split: usize,
}

impl VaultRelPath {
    /// Validate a sanitized path against the two-segment grammar.
    ///
    /// Anything else, including nested paths like `a/b/c`, fails with
    /// [`AccessError::InvalidFilename`].
    pub fn parse(path: &str) -> Result<Self, AccessError> {
        let Some(split) = path.find('/') else {
            return Err(AccessError::InvalidFilename);
        };

        let folder = &path[..split];
        let file = &path[split + 1..];

        if folder.is_empty() || file.is_empty() || file.contains('/') {
            return Err(AccessError::InvalidFilename);
        }

        if !folder.bytes().all(is_segment_byte) || !file.bytes().all(is_segment_byte) {
            return Err(AccessError::InvalidFilename);
        }

        Ok(Self {
            inner: path.to_string(),
            split,
        })
    }

    /// The full relative path, e.g. `group-1/report.pdf`.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// The top-level folder segment, e.g. `group-1`.
    pub fn folder(&self) -> &str {
        &self.inner[..self.split]
    }

    /// The file segment, e.g. `report.pdf`.
    pub fn file_name(&self) -> &str {
        &self.inner[self.split + 1..]
    }
}

impl fmt::Display for VaultRelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

fn is_segment_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-')
}
