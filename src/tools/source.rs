//! Source text access for suppression parsing.
//!
//! The suppression resolver needs raw file content to find marker comments.
//! Hosts supply a `SourceProvider`; the in-memory variant backs tests and
//! hosts that already hold sources elsewhere.

use dashmap::DashMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Supplies (cached) source text by path.
///
/// Implementations must be `Send + Sync`; the resolver is consulted from
/// rayon's parallel per-file analysis.
pub trait SourceProvider: Send + Sync {
    /// Read or return cached file content. `None` when the file is unreadable.
    fn content(&self, path: &Path) -> Option<Arc<String>>;
}

/// Filesystem-backed provider with a concurrent content cache.
#[derive(Default)]
pub struct FsSource {
    cache: DashMap<PathBuf, Arc<String>>,
}

impl FsSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SourceProvider for FsSource {
    fn content(&self, path: &Path) -> Option<Arc<String>> {
        if let Some(hit) = self.cache.get(path) {
            return Some(Arc::clone(&hit));
        }
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let arc = Arc::new(text);
                self.cache.insert(path.to_path_buf(), Arc::clone(&arc));
                Some(arc)
            }
            Err(e) => {
                tracing::debug!("failed to read {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// In-memory provider built from `(path, content)` pairs.
#[derive(Default)]
pub struct MemorySource {
    files: HashMap<PathBuf, Arc<String>>,
}

impl MemorySource {
    pub fn new(entries: Vec<(&str, &str)>) -> Self {
        let mut files = HashMap::with_capacity(entries.len());
        for (path, body) in entries {
            files.insert(PathBuf::from(path), Arc::new(body.to_string()));
        }
        Self { files }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl SourceProvider for MemorySource {
    fn content(&self, path: &Path) -> Option<Arc<String>> {
        self.files.get(path).cloned()
    }
}
