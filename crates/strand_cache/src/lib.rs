//! Persisted analysis artifacts for incremental compiles.
//!
//! This crate provides the artifact provider collaborator (on disk with a
//! validated binary header, or in memory with an access log), the
//! per-library dependency records that drive symbol-diff re-analysis, and the
//! last-analyzed timestamp markers that decide which units are stale.

#![warn(missing_docs)]

pub mod artifact;
pub mod deps;
pub mod error;
pub mod memory;
pub mod timestamp;

pub use artifact::{ArtifactProvider, DiskArtifactStore};
pub use deps::{Dependency, LibraryDeps, SourceDeps, DEPS_EXT};
pub use error::CacheError;
pub use memory::{ArtifactKey, MemoryArtifactStore};
pub use timestamp::{
    is_out_of_date, read_timestamp, write_check_log, write_timestamp, LOG_EXT, TIMESTAMP_EXT,
};
