//! Incremental parse scheduling.
//!
//! Every unit of every loaded library is parsed either fully or diet. A unit
//! is parsed fully when incremental mode is off, when it belongs to a system
//! library, or when its timestamp artifact is stale. After this first pass
//! the top-level names whose existence changed in user libraries are
//! collected, and diet units whose recorded symbols meet that set are parsed
//! fully too. System libraries never contribute to that set; their names are
//! fixed for the lifetime of an installation. The expansion runs once: names
//! changed by a promoted unit are not diffed again in the same compile.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use strand_cache::{is_out_of_date, LibraryDeps};
use strand_diagnostics::DiagnosticSink;
use strand_resolver::collect_symbols;
use strand_source::{Source, Span};
use strand_syntax::{parse_unit, CompilationUnit, ParseMode};

use crate::errors;
use crate::graph::{DirectiveTarget, LibraryId, ParsedUnit, UnitPath};
use crate::session::Session;

impl Session<'_> {
    /// Parses every unit of every library, fully where needed.
    pub(crate) fn parse_out_of_date_files(&mut self) {
        let mut diff: BTreeSet<String> = BTreeSet::new();
        let ids: Vec<LibraryId> = self.graph.ids().collect();
        for &id in &ids {
            if self.graph.node(id).preresolved.is_some() {
                continue;
            }
            self.load_deps(id);
            let system = self.graph.node(id).source.is_system();
            let mut seen: HashSet<Source> = HashSet::new();
            let paths = self.graph.node(id).paths.clone();
            for path in &paths {
                let DirectiveTarget::Source(source) = &path.target else {
                    continue;
                };
                if !seen.insert(source.clone()) || !self.exists(source) {
                    continue;
                }
                if self.needs_full_parse(id, path, source) {
                    if self.parse_full(id, path, source) && !system {
                        let library = self.graph.node(id);
                        let new_top = library
                            .unit(&path.name)
                            .map(|u| self.top_symbols(&u.unit))
                            .unwrap_or_default();
                        match library.deps.get_source(&path.name) {
                            Some(old) => diff.extend(
                                old.top_symbols.symmetric_difference(&new_top).cloned(),
                            ),
                            None => diff.extend(new_top),
                        }
                    }
                } else {
                    self.parse_diet(id, path, source);
                }
            }
            if system {
                continue;
            }
            let node = self.graph.node(id);
            let current: HashSet<&str> = node.units.iter().map(|u| u.name.as_str()).collect();
            for (name, record) in node.deps.iter() {
                if !current.contains(name) {
                    tracing::debug!(library = %node.source, unit = name, "unit removed from library");
                    diff.extend(record.top_symbols.iter().cloned());
                }
            }
        }

        if diff.is_empty() {
            return;
        }
        self.files_changed = true;
        tracing::debug!(changed = ?diff, "top-level symbols changed");
        for &id in &ids {
            let node = self.graph.node(id);
            let affected: Vec<(UnitPath, Source)> = node
                .units
                .iter()
                .filter(|u| u.is_diet())
                .filter(|u| {
                    node.deps
                        .get_source(&u.name)
                        .is_some_and(|record| record.is_affected_by(&diff))
                })
                .filter_map(|u| {
                    let path = node.paths.iter().find(|p| p.name == u.name)?;
                    Some((path.clone(), u.source.clone()))
                })
                .collect();
            for (path, source) in affected {
                tracing::debug!(unit = %source, "unit affected by symbol changes");
                self.parse_full(id, &path, &source);
            }
        }
    }

    /// Fully parses diet units that depend on a unit changed since their
    /// last analysis.
    pub(crate) fn add_out_of_date_deps(&mut self) {
        if !self.incremental {
            return;
        }
        for id in self.graph.ids().collect::<Vec<_>>() {
            let node = self.graph.node(id);
            let stale: Vec<(UnitPath, Source)> = node
                .units
                .iter()
                .filter(|u| u.is_diet() && self.has_stale_dependency(id, &u.name))
                .filter_map(|u| {
                    let path = node.paths.iter().find(|p| p.name == u.name)?;
                    Some((path.clone(), u.source.clone()))
                })
                .collect();
            if !stale.is_empty() {
                self.files_changed = true;
            }
            for (path, source) in stale {
                tracing::debug!(unit = %source, "dependency of unit changed");
                self.parse_full(id, &path, &source);
            }
        }
    }

    fn has_stale_dependency(&self, id: LibraryId, unit_name: &str) -> bool {
        let Some(record) = self.graph.node(id).deps.get_source(unit_name) else {
            return true;
        };
        record.dependencies.iter().any(|dep| {
            let Some(library) = self.graph.lookup_uri(&dep.library_uri) else {
                return true;
            };
            let Some(source) = self
                .graph
                .node(library)
                .paths
                .iter()
                .find(|p| p.name == dep.unit_name)
                .and_then(|p| p.target.source())
            else {
                return true;
            };
            self.factory.last_modified(source) != Some(dep.last_modified)
        })
    }

    fn load_deps(&mut self, id: LibraryId) {
        let source = self.graph.node(id).source.clone();
        let deps = if source.is_system() || !self.persist {
            LibraryDeps::new()
        } else {
            LibraryDeps::load(self.artifacts, &source).unwrap_or_default()
        };
        self.graph.node_mut(id).deps = deps;
    }

    fn needs_full_parse(&self, id: LibraryId, path: &UnitPath, source: &Source) -> bool {
        let library = &self.graph.node(id).source;
        !self.incremental
            || library.is_system()
            || is_out_of_date(
                self.artifacts,
                library,
                &path.name,
                self.factory.last_modified(source),
            )
    }

    fn top_symbols(&self, unit: &CompilationUnit) -> BTreeSet<String> {
        collect_symbols(unit, self.interner).top
    }

    /// Parses a unit fully, replacing any diet version, and opens its
    /// bracket. A user unit parsed this way counts as a changed file.
    /// Returns `false` if the unit was dropped.
    fn parse_full(&mut self, id: LibraryId, path: &UnitPath, source: &Source) -> bool {
        self.open_unit(id, source);
        let unit = match self.parsed.get(source) {
            Some(unit) => {
                if path.is_self {
                    self.report_missing_targets(id);
                }
                Arc::clone(unit)
            }
            None => {
                let at = if path.is_self {
                    Span::file_start(source.file())
                } else {
                    path.span
                };
                let text = match self.factory.contents(source) {
                    Ok(text) => text,
                    Err(err) => {
                        self.report(errors::error_unreadable_source(
                            source.uri(),
                            &err.to_string(),
                            at,
                        ));
                        self.drop_unit(id, path, source);
                        return false;
                    }
                };
                let local = DiagnosticSink::new();
                let unit = parse_unit(&text, source.file(), ParseMode::Full, self.interner, &local);
                let had_errors = local.has_errors();
                for diagnostic in local.take_all() {
                    self.report(diagnostic);
                }
                if path.is_self {
                    self.report_missing_targets(id);
                }
                if had_errors && !self.options.resolve_despite_parse_errors {
                    tracing::debug!(unit = %source, "unit dropped for parse errors");
                    self.drop_unit(id, path, source);
                    return false;
                }
                Arc::new(unit)
            }
        };
        if !self.graph.node(id).source.is_system() {
            self.files_changed = true;
        }
        self.graph.node_mut(id).put_unit(ParsedUnit {
            name: path.name.clone(),
            source: source.clone(),
            unit,
        });
        true
    }

    fn drop_unit(&mut self, id: LibraryId, path: &UnitPath, source: &Source) {
        self.graph.node_mut(id).remove_unit(&path.name);
        self.close_unit(id, source, None);
    }

    /// Parses a unit's declarations only. Problems are not reported; the
    /// unit was analyzed cleanly last time and has not changed since.
    fn parse_diet(&mut self, id: LibraryId, path: &UnitPath, source: &Source) {
        let unit = if let Some(unit) = self.parsed.get(source) {
            Arc::clone(unit)
        } else if path.is_self {
            Arc::clone(&self.graph.node(id).scan)
        } else {
            match self.factory.contents(source) {
                Ok(text) => {
                    let scratch = DiagnosticSink::new();
                    Arc::new(parse_unit(
                        &text,
                        source.file(),
                        ParseMode::Diet,
                        self.interner,
                        &scratch,
                    ))
                }
                Err(_) => {
                    self.parse_full(id, path, source);
                    return;
                }
            }
        };
        self.bracket_diet(id, source, &unit);
        self.graph.node_mut(id).put_unit(ParsedUnit {
            name: path.name.clone(),
            source: source.clone(),
            unit,
        });
    }

    /// Reports every import, export and part of a library whose target does
    /// not exist. Native extensions are never reported.
    fn report_missing_targets(&mut self, id: LibraryId) {
        let node = self.graph.node(id);
        let missing: Vec<(String, Span)> = node
            .imports
            .iter()
            .chain(node.exports.iter())
            .filter(|edge| !edge.implicit)
            .map(|edge| (&edge.target, &edge.text, edge.span))
            .chain(
                node.paths
                    .iter()
                    .filter(|p| !p.is_self)
                    .map(|p| (&p.target, &p.name, p.span)),
            )
            .filter(|(target, _, _)| match target {
                DirectiveTarget::Native => false,
                DirectiveTarget::Unresolved => true,
                DirectiveTarget::Source(source) => !self.exists(source),
            })
            .map(|(_, text, span)| (text.clone(), span))
            .collect();
        for (text, span) in missing {
            self.report(errors::error_missing_source(&text, span));
        }
    }
}
