//! Per-library dependency records.
//!
//! A [`LibraryDeps`] remembers, for every unit of a library, the top-level
//! names it declared, the names it referenced, its unqualified "holes", and
//! the units it structurally depended on. The next compile compares against
//! it to decide which diet-parsed units must be re-parsed in full.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use strand_source::Source;

use crate::artifact::ArtifactProvider;
use crate::error::CacheError;

/// Extension of the persisted dependency record.
pub const DEPS_EXT: &str = "deps";

/// A unit this unit depends on, with the stamp it had when recorded.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Dependency {
    /// URI of the library owning the unit.
    pub library_uri: String,
    /// Unit name within that library.
    pub unit_name: String,
    /// Last-modified stamp observed at analysis time.
    pub last_modified: u64,
}

/// The record of one unit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDeps {
    /// Top-level names the unit declares.
    pub top_symbols: BTreeSet<String>,
    /// Every name the unit's analysis was sensitive to.
    pub all_symbols: BTreeSet<String>,
    /// Unqualified references not bound to a local or parameter.
    pub holes: BTreeSet<String>,
    /// Units whose content the analysis read.
    pub dependencies: Vec<Dependency>,
    /// Re-parse whenever any top-level name in the round changes.
    pub recompile_on_any_top_level_change: bool,
}

impl SourceDeps {
    /// Returns `true` if this unit's analysis could change because the
    /// existence of one of `changed` changed.
    pub fn is_affected_by(&self, changed: &BTreeSet<String>) -> bool {
        if changed.is_empty() {
            return false;
        }
        self.recompile_on_any_top_level_change
            || !self.all_symbols.is_disjoint(changed)
            || !self.holes.is_disjoint(changed)
    }
}

/// Dependency records of every unit in one library, keyed by unit name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryDeps {
    sources: BTreeMap<String, SourceDeps>,
}

impl LibraryDeps {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// The prior record of a unit; `None` means "no history".
    pub fn get_source(&self, unit_name: &str) -> Option<&SourceDeps> {
        self.sources.get(unit_name)
    }

    /// Replaces the record of a unit.
    pub fn put_source(&mut self, unit_name: impl Into<String>, deps: SourceDeps) {
        self.sources.insert(unit_name.into(), deps);
    }

    /// Drops the record of a unit, returning it.
    pub fn remove_source(&mut self, unit_name: &str) -> Option<SourceDeps> {
        self.sources.remove(unit_name)
    }

    /// Unit names with a record, in sorted order.
    pub fn unit_names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// Iterates over every record.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SourceDeps)> {
        self.sources.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns `true` if no unit has a record.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Loads the persisted record of `library`.
    ///
    /// Returns `None` when no record exists or it cannot be decoded.
    pub fn load(provider: &dyn ArtifactProvider, library: &Source) -> Option<Self> {
        let bytes = provider.read(library, library.short_name(), DEPS_EXT)?;
        bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
            .ok()
            .map(|(deps, _)| deps)
    }

    /// Persists the record of `library`.
    pub fn save(&self, provider: &dyn ArtifactProvider, library: &Source) -> Result<(), CacheError> {
        let bytes = bincode::serde::encode_to_vec(self, bincode::config::standard())?;
        provider.write(library, library.short_name(), DEPS_EXT, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryArtifactStore;
    use std::sync::Arc;
    use strand_source::{MemorySourceProvider, SourceFactory, SystemLibraries};

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn sample() -> LibraryDeps {
        let mut deps = LibraryDeps::new();
        deps.put_source(
            "b.st",
            SourceDeps {
                top_symbols: names(&["foo"]),
                all_symbols: names(&["foo", "print"]),
                holes: names(&["hole"]),
                dependencies: vec![Dependency {
                    library_uri: "app.st".into(),
                    unit_name: "a.st".into(),
                    last_modified: 7,
                }],
                recompile_on_any_top_level_change: true,
            },
        );
        deps
    }

    #[test]
    fn affected_by_holes_and_references() {
        let b = sample().get_source("b.st").unwrap().clone();
        let plain = SourceDeps {
            recompile_on_any_top_level_change: false,
            ..b.clone()
        };
        assert!(plain.is_affected_by(&names(&["hole"])));
        assert!(plain.is_affected_by(&names(&["print"])));
        assert!(!plain.is_affected_by(&names(&["other"])));
        assert!(b.is_affected_by(&names(&["other"])));
        assert!(!b.is_affected_by(&BTreeSet::new()));
    }

    #[test]
    fn persist_and_reload() {
        let factory = SourceFactory::new(
            Arc::new(MemorySourceProvider::new()),
            SystemLibraries::embedded(),
        );
        let lib = factory.for_uri("app.st");
        let store = MemoryArtifactStore::new();
        assert!(LibraryDeps::load(&store, &lib).is_none());

        let deps = sample();
        deps.save(&store, &lib).unwrap();
        assert!(store.did_write("app.st", "app.st", DEPS_EXT));
        assert_eq!(LibraryDeps::load(&store, &lib), Some(deps));
    }

    #[test]
    fn undecodable_record_is_absent() {
        let factory = SourceFactory::new(
            Arc::new(MemorySourceProvider::new()),
            SystemLibraries::embedded(),
        );
        let lib = factory.for_uri("app.st");
        let store = MemoryArtifactStore::new();
        store.write(&lib, "app.st", DEPS_EXT, &[0xFF; 3]).unwrap();
        assert!(LibraryDeps::load(&store, &lib).is_none());
    }

    #[test]
    fn json_roundtrip() {
        let deps = sample();
        let json = serde_json::to_string(&deps).unwrap();
        let back: LibraryDeps = serde_json::from_str(&json).unwrap();
        assert_eq!(deps, back);
    }

    #[test]
    fn remove_and_iterate() {
        let mut deps = sample();
        deps.put_source("a.st", SourceDeps::default());
        assert_eq!(deps.unit_names().collect::<Vec<_>>(), vec!["a.st", "b.st"]);
        assert!(deps.remove_source("b.st").is_some());
        assert_eq!(deps.iter().count(), 1);
        assert!(!deps.is_empty());
    }
}
