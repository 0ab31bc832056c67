//! Recording the results of a compile.
//!
//! Every fully parsed and resolved unit gets a fresh dependency record. Its
//! timestamp artifact is written only when no diagnostic was reported in
//! its file, so a unit with problems is analyzed and reported again next
//! time. Timestamps follow the library's dependency record: if the record
//! cannot be saved, no unit of that library is stamped. System libraries
//! are never persisted.

use std::collections::HashSet;

use strand_cache::{write_timestamp, Dependency, SourceDeps};
use strand_resolver::{collect_symbols, ResolvedUnit};
use strand_source::Source;

use crate::errors;
use crate::graph::LibraryId;
use crate::session::Session;

impl Session<'_> {
    /// Updates the dependency records of every library, writes timestamp
    /// artifacts and closes the bracket of every full unit.
    pub(crate) fn compile_libraries(&mut self) {
        for id in self.graph.ids().collect::<Vec<_>>() {
            if self.graph.node(id).preresolved.is_some() {
                continue;
            }
            let resolution = self.graph.node_mut(id).resolution.take();
            let library = self.graph.node(id).source.clone();
            let persist = self.persist && !library.is_system();
            let full: Vec<(String, Source)> = self
                .graph
                .node(id)
                .units
                .iter()
                .filter(|u| !u.is_diet())
                .map(|u| (u.name.clone(), u.source.clone()))
                .collect();

            let mut changed = false;
            let mut clean: Vec<(String, Source)> = Vec::new();
            for (name, source) in full {
                let resolved = resolution.as_ref().and_then(|r| r.unit(&source));
                if let Some(resolved) = resolved {
                    let record = self.source_deps(resolved);
                    self.graph.node_mut(id).deps.put_source(name.as_str(), record);
                    changed = true;
                    if persist && !self.is_dirty(source.file()) {
                        clean.push((name, source.clone()));
                    }
                }
                self.close_unit(id, &source, resolved);
            }

            let node = self.graph.node_mut(id);
            let current: HashSet<&str> = node.units.iter().map(|u| u.name.as_str()).collect();
            let removed: Vec<String> = node
                .deps
                .unit_names()
                .filter(|name| !current.contains(name))
                .map(str::to_string)
                .collect();
            for name in &removed {
                node.deps.remove_source(name);
            }
            changed |= !removed.is_empty();
            node.resolution = resolution;

            if persist && changed {
                let saved = self.graph.node(id).deps.save(self.artifacts, &library);
                if let Err(err) = saved {
                    let what = format!("dependency record of '{library}'");
                    self.report(errors::error_artifact_write(&what, &err.to_string()));
                    continue;
                }
            }
            for (name, source) in clean {
                self.write_timestamp(&library, &name, &source);
            }
        }
    }

    fn source_deps(&self, resolved: &ResolvedUnit) -> SourceDeps {
        let symbols = collect_symbols(&resolved.unit, self.interner);
        SourceDeps {
            top_symbols: symbols.top,
            all_symbols: symbols.all,
            holes: symbols.holes,
            dependencies: resolved
                .dependencies
                .iter()
                .map(|dep| Dependency {
                    library_uri: dep.library.uri().to_string(),
                    unit_name: dep.unit_name.clone(),
                    last_modified: self.factory.last_modified(&dep.unit).unwrap_or(0),
                })
                .collect(),
            recompile_on_any_top_level_change: resolved.has_unresolved,
        }
    }

    fn write_timestamp(&mut self, library: &Source, name: &str, source: &Source) {
        let Some(stamp) = self.factory.last_modified(source) else {
            return;
        };
        if let Err(err) = write_timestamp(self.artifacts, library, name, stamp) {
            let what = format!("timestamp of '{source}'");
            self.report(errors::error_artifact_write(&what, &err.to_string()));
        }
    }
}
