//! File change notifications and content hashing.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// md5 digest of a file's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash(pub [u8; 16]);

impl ContentHash {
    pub fn of(bytes: &[u8]) -> Self {
        Self(md5::compute(bytes).into())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Hash the current contents of `path`.
pub fn hash_file(path: &Path) -> io::Result<ContentHash> {
    std::fs::read(path).map(|bytes| ContentHash::of(&bytes))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed change to a content file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
    pub timestamp: SystemTime,
    /// Content hash at observation time. Always `None` for deletions, and
    /// `None` when the file could not be read.
    pub hash: Option<ContentHash>,
}

impl FileChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
            timestamp: SystemTime::now(),
            hash: None,
        }
    }

    /// Build an event for `path`, hashing the file unless it was deleted.
    pub fn observe(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        let mut event = Self::new(path, kind);
        if kind != ChangeKind::Deleted {
            event.hash = hash_file(&event.path).ok();
        }
        event
    }

    pub fn with_hash(mut self, hash: ContentHash) -> Self {
        self.hash = Some(hash);
        self
    }

    pub fn is_deletion(&self) -> bool {
        self.kind == ChangeKind::Deleted
    }
}
