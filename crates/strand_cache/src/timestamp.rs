//! Last-analyzed timestamp artifacts and the check log.
//!
//! A timestamp artifact holds the last-modified stamp a unit had when it was
//! last analyzed cleanly. A unit is out of date when the artifact is
//! missing, unreadable, or holds a different stamp.

use strand_source::Source;

use crate::artifact::ArtifactProvider;
use crate::error::CacheError;

/// Extension of the last-analyzed timestamp artifact.
pub const TIMESTAMP_EXT: &str = "timestamp";

/// Extension of the human-readable check log.
pub const LOG_EXT: &str = "log";

/// Reads the recorded stamp of `unit` in `library`.
pub fn read_timestamp(provider: &dyn ArtifactProvider, library: &Source, unit: &str) -> Option<u64> {
    let bytes = provider.read(library, unit, TIMESTAMP_EXT)?;
    let raw: [u8; 8] = bytes.as_slice().try_into().ok()?;
    Some(u64::from_le_bytes(raw))
}

/// Records `last_modified` as the stamp of `unit` in `library`.
pub fn write_timestamp(
    provider: &dyn ArtifactProvider,
    library: &Source,
    unit: &str,
    last_modified: u64,
) -> Result<(), CacheError> {
    provider.write(library, unit, TIMESTAMP_EXT, &last_modified.to_le_bytes())
}

/// Returns `true` if `unit` must be analyzed again given its current stamp.
pub fn is_out_of_date(
    provider: &dyn ArtifactProvider,
    library: &Source,
    unit: &str,
    current: Option<u64>,
) -> bool {
    match (read_timestamp(provider, library, unit), current) {
        (Some(recorded), Some(current)) => recorded != current,
        _ => true,
    }
}

/// Writes the check log of `library`.
pub fn write_check_log(
    provider: &dyn ArtifactProvider,
    library: &Source,
    text: &str,
) -> Result<(), CacheError> {
    provider.write(library, library.short_name(), LOG_EXT, text.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryArtifactStore;
    use std::sync::Arc;
    use strand_source::{MemorySourceProvider, SourceFactory, SystemLibraries};

    fn lib() -> Source {
        SourceFactory::new(
            Arc::new(MemorySourceProvider::new()),
            SystemLibraries::embedded(),
        )
        .for_uri("lib/app.st")
    }

    #[test]
    fn missing_is_out_of_date() {
        let store = MemoryArtifactStore::new();
        assert!(is_out_of_date(&store, &lib(), "a.st", Some(1)));
    }

    #[test]
    fn matching_stamp_is_fresh() {
        let store = MemoryArtifactStore::new();
        let lib = lib();
        write_timestamp(&store, &lib, "a.st", 42).unwrap();
        assert_eq!(read_timestamp(&store, &lib, "a.st"), Some(42));
        assert!(!is_out_of_date(&store, &lib, "a.st", Some(42)));
        assert!(is_out_of_date(&store, &lib, "a.st", Some(43)));
        assert!(is_out_of_date(&store, &lib, "a.st", None));
    }

    #[test]
    fn malformed_stamp_is_out_of_date() {
        let store = MemoryArtifactStore::new();
        let lib = lib();
        store.write(&lib, "a.st", TIMESTAMP_EXT, b"xyz").unwrap();
        assert!(read_timestamp(&store, &lib, "a.st").is_none());
        assert!(is_out_of_date(&store, &lib, "a.st", Some(1)));
    }

    #[test]
    fn check_log_keyed_by_library_name() {
        let store = MemoryArtifactStore::new();
        write_check_log(&store, &lib(), "Checked app.st and found:\n  No problems.\n").unwrap();
        assert!(store.did_write("lib/app.st", "app.st", LOG_EXT));
    }
}
