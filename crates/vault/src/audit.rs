//! Access audit log with size-based rotation.
//!
//! One line per request decision, appended to `access.log` in the audit
//! directory. When the file grows past `max_size` it is rotated to
//! `access.log.<timestamp>` and the oldest rotated files are pruned so at
//! most `max_files` rotated files remain. The whole check-rotate-append
//! sequence runs under one mutex, so concurrent requests never interleave
//! partial lines and never race a rotation.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

const LOG_FILE_NAME: &str = "access.log";

/// Append-only audit sink, shared across request handlers.
#[derive(Debug)]
pub struct AuditLog {
    dir: PathBuf,
    max_size: u64,
    max_files: usize,
    lock: Mutex<()>,
}

impl AuditLog {
    /// Open (creating the directory if needed) an audit log in `dir`.
    pub fn open<P: AsRef<Path>>(dir: P, max_size: u64, max_files: usize) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            max_size,
            max_files: max_files.max(1),
            lock: Mutex::new(()),
        })
    }

    /// Path of the active log file.
    pub fn current_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE_NAME)
    }

    /// Append one line, rotating first if the active file is over the size
    /// limit. The trailing newline is added here; embedded newlines in
    /// `line` are the caller's bug.
    pub fn append(&self, line: &str) -> io::Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let path = self.current_path();
        if let Ok(metadata) = fs::metadata(&path) {
            if metadata.len() > self.max_size {
                self.rotate(&path)?;
            }
        }

        let mut entry = String::with_capacity(line.len() + 1);
        entry.push_str(line);
        entry.push('\n');

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        // One write_all per line; with the mutex held, lines stay whole.
        file.write_all(entry.as_bytes())
    }

    /// Rename the active file aside and prune the oldest rotated files.
    /// Caller holds the lock.
    fn rotate(&self, path: &Path) -> io::Result<()> {
        let mut rotated = self.rotated_files()?;
        rotated.sort();

        // Timestamped names sort lexicographically, oldest first.
        while rotated.len() >= self.max_files {
            let oldest = rotated.remove(0);
            tracing::debug!(file = %oldest.display(), "pruning rotated audit log");
            fs::remove_file(&oldest)?;
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let target = self.dir.join(format!(
            "{}.{:010}-{:09}",
            LOG_FILE_NAME,
            now.as_secs(),
            now.subsec_nanos()
        ));
        tracing::debug!(file = %target.display(), "rotating audit log");
        fs::rename(path, target)
    }

    fn rotated_files(&self) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(&format!("{LOG_FILE_NAME}.")) {
                files.push(entry.path());
            }
        }
        Ok(files)
    }
}
