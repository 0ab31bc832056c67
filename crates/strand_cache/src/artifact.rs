//! Persisted side-files keyed by library source, part name and extension.
//!
//! The analysis core never touches the file system for artifacts directly;
//! it goes through an [`ArtifactProvider`]. [`DiskArtifactStore`] keeps each
//! artifact at `<root>/<library key>/<part key>.<ext>` behind a binary header
//! with magic bytes, format version and a payload checksum.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strand_common::ContentHash;
use strand_source::Source;

use crate::error::CacheError;

/// Magic bytes identifying a Strand artifact.
const ARTIFACT_MAGIC: [u8; 4] = *b"STRD";

/// Current artifact format version. Increment on breaking changes to
/// the header or payload format.
const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Reader/writer for persisted artifacts.
///
/// `source` is the library the artifact belongs to and `part` names the unit
/// within it (or the library itself for library-wide records).
pub trait ArtifactProvider: Send + Sync {
    /// Returns the artifact payload, or `None` if it is absent or unreadable.
    fn read(&self, source: &Source, part: &str, ext: &str) -> Option<Vec<u8>>;

    /// Replaces the artifact payload.
    fn write(&self, source: &Source, part: &str, ext: &str, data: &[u8])
        -> Result<(), CacheError>;
}

/// Header prepended to every artifact on disk for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactHeader {
    /// Magic bytes: must be `b"STRD"`.
    pub magic: [u8; 4],

    /// Artifact format version.
    pub format_version: u32,

    /// Content hash of the payload data.
    pub checksum: ContentHash,
}

/// Wraps a payload in a validated header.
///
/// Layout: 4-byte header length (little-endian), bincode header, payload.
pub fn encode_artifact(data: &[u8]) -> Result<Vec<u8>, CacheError> {
    let header = ArtifactHeader {
        magic: ARTIFACT_MAGIC,
        format_version: ARTIFACT_FORMAT_VERSION,
        checksum: ContentHash::from_bytes(data),
    };
    let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())?;

    let header_len = header_bytes.len() as u32;
    let mut output = Vec::with_capacity(4 + header_bytes.len() + data.len());
    output.extend_from_slice(&header_len.to_le_bytes());
    output.extend_from_slice(&header_bytes);
    output.extend_from_slice(data);
    Ok(output)
}

/// Validates the header and returns the payload.
///
/// Returns `None` on truncation, wrong magic, version mismatch or checksum
/// mismatch. Corruption is a cache miss.
pub fn decode_artifact(raw: &[u8]) -> Option<Vec<u8>> {
    if raw.len() < 4 {
        return None;
    }
    let header_len = u32::from_le_bytes(raw[..4].try_into().ok()?) as usize;
    if raw.len() < 4 + header_len {
        return None;
    }
    let header: ArtifactHeader =
        bincode::serde::decode_from_slice(&raw[4..4 + header_len], bincode::config::standard())
            .ok()?
            .0;
    if header.magic != ARTIFACT_MAGIC || header.format_version != ARTIFACT_FORMAT_VERSION {
        return None;
    }
    let payload = &raw[4 + header_len..];
    if ContentHash::from_bytes(payload) != header.checksum {
        return None;
    }
    Some(payload.to_vec())
}

/// Turns a URI or relative path into a single file-name-safe component.
pub fn artifact_key(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Artifact store rooted at an output directory.
pub struct DiskArtifactStore {
    root: PathBuf,
}

impl DiskArtifactStore {
    /// Creates a store rooted at `root`. Directories are created on first write.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Returns the file path for an artifact.
    pub fn artifact_path(&self, source: &Source, part: &str, ext: &str) -> PathBuf {
        self.root
            .join(artifact_key(source.uri()))
            .join(format!("{}.{ext}", artifact_key(part)))
    }
}

impl ArtifactProvider for DiskArtifactStore {
    fn read(&self, source: &Source, part: &str, ext: &str) -> Option<Vec<u8>> {
        let raw = std::fs::read(self.artifact_path(source, part, ext)).ok()?;
        decode_artifact(&raw)
    }

    /// Writes to a sibling temporary file and renames it into place, so a
    /// crash mid-write leaves the previous artifact intact.
    fn write(
        &self,
        source: &Source,
        part: &str,
        ext: &str,
        data: &[u8],
    ) -> Result<(), CacheError> {
        let path = self.artifact_path(source, part, ext);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(CacheError::write(dir))?;
        }
        let output = encode_artifact(data)?;
        let tmp = path.with_extension(format!("{ext}.tmp"));
        std::fs::write(&tmp, &output).map_err(CacheError::write(&tmp))?;
        std::fs::rename(&tmp, &path).map_err(CacheError::write(&path))?;
        tracing::trace!(source = %source, part, ext, "artifact written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use strand_source::{MemorySourceProvider, SourceFactory, SystemLibraries};

    fn make_store() -> (tempfile::TempDir, DiskArtifactStore, Source) {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskArtifactStore::new(dir.path());
        let factory = SourceFactory::new(
            Arc::new(MemorySourceProvider::new()),
            SystemLibraries::embedded(),
        );
        (dir, store, factory.for_uri("web/app.st"))
    }

    #[test]
    fn write_and_read_roundtrip() {
        let (_dir, store, lib) = make_store();
        store.write(&lib, "app.st", "timestamp", b"stamp").unwrap();
        assert_eq!(store.read(&lib, "app.st", "timestamp").unwrap(), b"stamp");
    }

    #[test]
    fn overwrite_replaces() {
        let (_dir, store, lib) = make_store();
        store.write(&lib, "app.st", "deps", b"one").unwrap();
        store.write(&lib, "app.st", "deps", b"two").unwrap();
        assert_eq!(store.read(&lib, "app.st", "deps").unwrap(), b"two");
        let tmp = store.artifact_path(&lib, "app.st", "deps").with_extension("deps.tmp");
        assert!(!tmp.exists());
    }

    #[test]
    fn read_missing_returns_none() {
        let (_dir, store, lib) = make_store();
        assert!(store.read(&lib, "absent.st", "deps").is_none());
    }

    #[test]
    fn read_corrupt_data_returns_none() {
        let (_dir, store, lib) = make_store();
        let path = store.artifact_path(&lib, "app.st", "deps");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"garbage data").unwrap();
        assert!(store.read(&lib, "app.st", "deps").is_none());
    }

    #[test]
    fn tampered_payload_fails_checksum() {
        let mut raw = encode_artifact(b"payload").unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        assert!(decode_artifact(&raw).is_none());
    }

    #[test]
    fn wrong_version_returns_none() {
        let header = ArtifactHeader {
            magic: ARTIFACT_MAGIC,
            format_version: 999,
            checksum: ContentHash::from_bytes(b"data"),
        };
        let header_bytes =
            bincode::serde::encode_to_vec(&header, bincode::config::standard()).unwrap();
        let mut raw = (header_bytes.len() as u32).to_le_bytes().to_vec();
        raw.extend_from_slice(&header_bytes);
        raw.extend_from_slice(b"data");
        assert!(decode_artifact(&raw).is_none());
    }

    #[test]
    fn truncated_header_returns_none() {
        assert!(decode_artifact(b"AB").is_none());
        assert!(decode_artifact(&[200, 0, 0, 0, 1]).is_none());
    }

    #[test]
    fn keys_are_single_components() {
        assert_eq!(artifact_key("std:core/x.st"), "std_core_x.st");
        assert_eq!(artifact_key("web/app.st"), "web_app.st");
    }
}
