//! In-memory artifact provider that records every access.
//!
//! Used by editor sessions that should not touch the disk and by tests that
//! assert which artifacts an incremental compile rewrote.

use std::collections::HashMap;

use parking_lot::Mutex;
use strand_source::Source;

use crate::artifact::ArtifactProvider;
use crate::error::CacheError;

/// Identifies one artifact: (library URI, part name, extension).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct ArtifactKey {
    /// URI of the owning library.
    pub library: String,
    /// Part name within the library.
    pub part: String,
    /// Artifact extension.
    pub ext: String,
}

impl ArtifactKey {
    fn new(source: &Source, part: &str, ext: &str) -> Self {
        Self {
            library: source.uri().to_string(),
            part: part.to_string(),
            ext: ext.to_string(),
        }
    }
}

#[derive(Default)]
struct MemoryState {
    artifacts: HashMap<ArtifactKey, Vec<u8>>,
    writes: Vec<ArtifactKey>,
}

/// Artifact provider backed by a map.
#[derive(Default)]
pub struct MemoryArtifactStore {
    state: Mutex<MemoryState>,
}

impl MemoryArtifactStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys written since the last [`clear_write_log`](Self::clear_write_log), in order.
    pub fn writes(&self) -> Vec<ArtifactKey> {
        self.state.lock().writes.clone()
    }

    /// Number of writes with the given extension since the log was cleared.
    pub fn write_count(&self, ext: &str) -> usize {
        self.state
            .lock()
            .writes
            .iter()
            .filter(|k| k.ext == ext)
            .count()
    }

    /// Returns `true` if the artifact was written since the log was cleared.
    pub fn did_write(&self, library_uri: &str, part: &str, ext: &str) -> bool {
        self.state
            .lock()
            .writes
            .iter()
            .any(|k| k.library == library_uri && k.part == part && k.ext == ext)
    }

    /// Forgets the write log. Stored artifacts are kept.
    pub fn clear_write_log(&self) {
        self.state.lock().writes.clear();
    }

    /// Removes every stored artifact of one library.
    pub fn remove_library(&self, library_uri: &str) {
        self.state
            .lock()
            .artifacts
            .retain(|k, _| k.library != library_uri);
    }
}

impl ArtifactProvider for MemoryArtifactStore {
    fn read(&self, source: &Source, part: &str, ext: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .artifacts
            .get(&ArtifactKey::new(source, part, ext))
            .cloned()
    }

    fn write(
        &self,
        source: &Source,
        part: &str,
        ext: &str,
        data: &[u8],
    ) -> Result<(), CacheError> {
        let key = ArtifactKey::new(source, part, ext);
        let mut state = self.state.lock();
        state.artifacts.insert(key.clone(), data.to_vec());
        state.writes.push(key);
        Ok(())
    }
}
