//! The source-loading collaborator.
//!
//! Every read of source text and every timestamp query made by the engine
//! goes through a [`SourceProvider`]. The workspace ships a filesystem
//! provider for the CLI and an in-memory provider for editors and tests.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::UNIX_EPOCH;

/// Access to the text and modification stamps of ordinary (non-system) sources.
pub trait SourceProvider: Send + Sync {
    /// Returns `true` if a source exists at `uri`.
    fn exists(&self, uri: &str) -> bool;

    /// Returns the modification stamp of `uri`, or `None` if it does not exist.
    fn last_modified(&self, uri: &str) -> Option<u64>;

    /// Reads the full text of `uri`.
    fn contents(&self, uri: &str) -> io::Result<String>;
}

/// Reads sources from the local filesystem; URIs are paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSourceProvider;

impl SourceProvider for FileSourceProvider {
    fn exists(&self, uri: &str) -> bool {
        std::path::Path::new(uri).is_file()
    }

    fn last_modified(&self, uri: &str) -> Option<u64> {
        let modified = std::fs::metadata(uri).ok()?.modified().ok()?;
        let millis = modified.duration_since(UNIX_EPOCH).ok()?.as_millis();
        u64::try_from(millis).ok()
    }

    fn contents(&self, uri: &str) -> io::Result<String> {
        std::fs::read_to_string(uri)
    }
}

/// An in-memory source store with a logical clock.
///
/// Every [`set_content`](Self::set_content) advances the clock, so a rewritten
/// source always gets a fresh, strictly larger modification stamp.
#[derive(Debug)]
pub struct MemorySourceProvider {
    files: RwLock<HashMap<String, (String, u64)>>,
    clock: AtomicU64,
}

impl MemorySourceProvider {
    /// Creates an empty provider.
    pub fn new() -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
            clock: AtomicU64::new(0),
        }
    }

    /// Creates or replaces the source at `uri`, returning its new stamp.
    pub fn set_content(&self, uri: &str, content: impl Into<String>) -> u64 {
        let stamp = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        self.files
            .write()
            .insert(uri.to_string(), (content.into(), stamp));
        stamp
    }

    /// Advances the stamp of `uri` without changing its text.
    pub fn touch(&self, uri: &str) -> Option<u64> {
        let stamp = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        let mut files = self.files.write();
        let entry = files.get_mut(uri)?;
        entry.1 = stamp;
        Some(stamp)
    }

    /// Deletes the source at `uri`. Returns `true` if it existed.
    pub fn remove(&self, uri: &str) -> bool {
        self.files.write().remove(uri).is_some()
    }
}

impl Default for MemorySourceProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceProvider for MemorySourceProvider {
    fn exists(&self, uri: &str) -> bool {
        self.files.read().contains_key(uri)
    }

    fn last_modified(&self, uri: &str) -> Option<u64> {
        self.files.read().get(uri).map(|(_, stamp)| *stamp)
    }

    fn contents(&self, uri: &str) -> io::Result<String> {
        self.files
            .read()
            .get(uri)
            .map(|(text, _)| text.clone())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no source at {uri}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_stamps_increase() {
        let p = MemorySourceProvider::new();
        let a = p.set_content("/p/a.st", "library a;");
        let b = p.set_content("/p/a.st", "library a; var x;");
        assert!(b > a);
        assert_eq!(p.last_modified("/p/a.st"), Some(b));
        assert_eq!(p.contents("/p/a.st").unwrap(), "library a; var x;");
    }

    #[test]
    fn memory_touch_and_remove() {
        let p = MemorySourceProvider::new();
        let first = p.set_content("/p/a.st", "");
        let touched = p.touch("/p/a.st").unwrap();
        assert!(touched > first);
        assert!(p.touch("/p/missing.st").is_none());
        assert!(p.remove("/p/a.st"));
        assert!(!p.exists("/p/a.st"));
        assert!(p.contents("/p/a.st").is_err());
    }

    #[test]
    fn file_provider_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.st");
        std::fs::write(&path, "library app;").unwrap();
        let uri = path.to_str().unwrap();
        let p = FileSourceProvider;
        assert!(p.exists(uri));
        assert!(p.last_modified(uri).is_some());
        assert_eq!(p.contents(uri).unwrap(), "library app;");
        assert!(!p.exists(dir.path().join("nope.st").to_str().unwrap()));
    }
}
