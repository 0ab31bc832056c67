//! The computations behind every context operation.
//!
//! An [`Engine`] borrows the locked [`ContextState`] for the length of one
//! public call. Every artifact is fetched with the same idiom: record the
//! access in the ledger, return the cached value when it is valid, compute
//! and store it otherwise.

use std::collections::BTreeMap;
use std::sync::Arc;

use strand_common::{InternalError, Interner};
use strand_diagnostics::{Diagnostic, DiagnosticSink};
use strand_resolver::{CancellationToken, LibraryElement, LibraryResolver, ResolveOutput, ResolvedUnit};
use strand_source::{LineInfo, Source, SourceFactory, UriResolution};
use strand_syntax::ast::Directive;
use strand_syntax::{parse_unit, scan_html, CompilationUnit, HtmlUnit, ParseMode};

use crate::context::{ChangeNotice, ChangeSet, TaskOutcome};
use crate::entry::{
    is_unit_source, EntryKind, HtmlSlot, LibrarySlot, PublicNamespace, ResolvedHtml, SourceEntry,
    UnitEntry,
};
use crate::errors::ContextError;
use crate::host::ContextHost;
use crate::html::{referenced_libraries, resolve_html};
use crate::ledger::RecentlyUsed;
use crate::state::CacheState;

/// Everything the context lock guards.
#[derive(Debug, Default)]
pub(crate) struct ContextState {
    pub(crate) entries: BTreeMap<Source, SourceEntry>,
    pub(crate) recently_used: RecentlyUsed,
    pub(crate) notices: BTreeMap<Source, ChangeNotice>,
}

/// Sources already visited by a traversal, one bit per file.
#[derive(Default)]
struct Visited(Vec<u64>);

impl Visited {
    /// Marks `source`. Returns `false` if it was marked before.
    fn insert(&mut self, source: &Source) -> bool {
        let raw = source.file().index();
        let (word, bit) = (raw / 64, 1u64 << (raw % 64));
        if word >= self.0.len() {
            self.0.resize(word + 1, 0);
        }
        let fresh = self.0[word] & bit == 0;
        self.0[word] |= bit;
        fresh
    }
}

/// Sources of the units a library includes, the library first, as written
/// in its `part` directives. Missing and duplicate parts are left out.
pub(crate) fn part_sources(factory: &SourceFactory, library: &Source, unit: &CompilationUnit) -> Vec<Source> {
    let mut parts = vec![library.clone()];
    for directive in &unit.directives {
        if let Directive::Part(d) = directive {
            if let Some(source) = existing_target(factory, library, &d.uri.value) {
                if !parts.contains(&source) {
                    parts.push(source);
                }
            }
        }
    }
    parts
}

/// The source a directive URI names, if it exists.
pub(crate) fn existing_target(factory: &SourceFactory, base: &Source, uri: &str) -> Option<Source> {
    match factory.resolve_uri(Some(base), uri) {
        UriResolution::Source(source) if factory.exists(&source) => Some(source),
        _ => None,
    }
}

/// One public call's view of the context.
pub(crate) struct Engine<'a> {
    pub(crate) factory: &'a SourceFactory,
    pub(crate) interner: &'a Arc<Interner>,
    pub(crate) cancel: Option<&'a CancellationToken>,
    pub(crate) state: &'a mut ContextState,
}

impl<'a> Engine<'a> {
    // --- entries and the ledger ---

    /// The entry of `source`, created empty on first use. `None` for
    /// sources the context does not analyze.
    pub(crate) fn get_or_create(&mut self, source: &Source) -> Option<&mut SourceEntry> {
        if !self.state.entries.contains_key(source) {
            let entry = SourceEntry::for_source(source)?;
            self.state.entries.insert(source.clone(), entry);
        }
        self.state.entries.get_mut(source)
    }

    pub(crate) fn entry(&self, source: &Source) -> Option<&SourceEntry> {
        self.state.entries.get(source)
    }

    pub(crate) fn unit_entry(&self, source: &Source) -> Option<&UnitEntry> {
        self.state.entries.get(source).and_then(SourceEntry::as_unit)
    }

    fn unit_entry_mut(&mut self, source: &Source) -> Option<&mut UnitEntry> {
        self.get_or_create(source).and_then(SourceEntry::as_unit_mut)
    }

    fn accessed(&mut self, source: &Source) {
        if let Some(evicted) = self.state.recently_used.accessed(source) {
            self.flush(&evicted);
        }
    }

    fn flush(&mut self, source: &Source) {
        if let Some(entry) = self.state.entries.get_mut(source) {
            entry.flush();
            tracing::trace!(%source, "flushed cached trees");
        }
    }

    fn disable_removal(&mut self) {
        self.state.recently_used.disable_removal();
    }

    fn enable_removal(&mut self) {
        for source in self.state.recently_used.enable_removal() {
            self.flush(&source);
        }
    }

    // --- parsing ---

    pub(crate) fn parse_compilation_unit(&mut self, source: &Source) -> Result<Arc<CompilationUnit>, ContextError> {
        self.accessed(source);
        if let Some(unit) = self.unit_entry(source).and_then(|e| e.parsed_unit.value().cloned()) {
            return Ok(unit);
        }
        self.parse_unit_now(source)
    }

    fn parse_unit_now(&mut self, source: &Source) -> Result<Arc<CompilationUnit>, ContextError> {
        if self.unit_entry_mut(source).is_none() {
            return Err(ContextError::NotAUnit(source.uri().to_string()));
        }
        let text = match self.factory.contents(source) {
            Ok(text) => text,
            Err(err) => {
                if let Some(entry) = self.unit_entry_mut(source) {
                    entry.set_parse_failed();
                }
                return Err(ContextError::Unreadable {
                    uri: source.uri().to_string(),
                    source: err,
                });
            }
        };
        let sink = DiagnosticSink::new();
        let unit = Arc::new(parse_unit(&text, source.file(), ParseMode::Full, self.interner, &sink));
        let errors = sink.take_all();
        tracing::trace!(%source, errors = errors.len(), "unit parsed");
        let line_info = LineInfo::from_text(&text);
        if let Some(entry) = self.unit_entry_mut(source) {
            entry.set_parse_results(Arc::clone(&unit), line_info, errors);
        }
        self.parse_notice(source);
        Ok(unit)
    }

    fn kind_or_error(&mut self, source: &Source) -> Result<EntryKind, ContextError> {
        if source.is_html() {
            return Ok(EntryKind::Html);
        }
        if !is_unit_source(source) {
            return Ok(EntryKind::Unknown);
        }
        if let Some(entry) = self.unit_entry(source) {
            if entry.kind.state() == CacheState::Valid {
                return Ok(entry.kind());
            }
        }
        self.parse_unit_now(source)?;
        Ok(self.kind_of(source))
    }

    pub(crate) fn compute_kind_of(&mut self, source: &Source) -> EntryKind {
        self.kind_or_error(source).unwrap_or(EntryKind::Unknown)
    }

    /// The kind as far as it is known, without computing anything.
    pub(crate) fn kind_of(&self, source: &Source) -> EntryKind {
        if source.is_html() {
            return EntryKind::Html;
        }
        self.entry(source).map_or(EntryKind::Unknown, SourceEntry::kind)
    }

    pub(crate) fn compute_line_info(&mut self, source: &Source) -> Result<Arc<LineInfo>, ContextError> {
        self.accessed(source);
        if let Some(info) = self.entry(source).and_then(SourceEntry::line_info) {
            return Ok(info);
        }
        if source.is_html() {
            self.parse_html_unit(source)?;
        } else {
            self.parse_unit_now(source)?;
        }
        self.entry(source)
            .and_then(SourceEntry::line_info)
            .ok_or_else(|| InternalError::new(format!("no line information recorded for {source}")).into())
    }

    // --- resolution ---

    pub(crate) fn compute_library_element(&mut self, source: &Source) -> Result<Arc<LibraryElement>, ContextError> {
        self.accessed(source);
        if let Some(element) = self.unit_entry(source).and_then(|e| e.element.value().cloned()) {
            return Ok(element);
        }
        match self.kind_or_error(source)? {
            EntryKind::Library => {}
            EntryKind::Part => return Err(ContextError::NotALibrary(source.uri().to_string())),
            EntryKind::Html | EntryKind::Unknown => {
                return Err(ContextError::NotAUnit(source.uri().to_string()))
            }
        }
        self.resolve_library(source)?;
        self.unit_entry(source)
            .and_then(|e| e.element.value().cloned())
            .ok_or_else(|| InternalError::new(format!("no element recorded for {source}")).into())
    }

    /// Resolves the cycle of `library` and every library it needs that has
    /// no valid element yet.
    fn resolve_library(&mut self, library: &Source) -> Result<(), ContextError> {
        let mut resolver = LibraryResolver::new(Arc::clone(self.interner), self.factory.core_source());
        self.disable_removal();
        let result = {
            let mut host = ContextHost::new(self);
            resolver.resolve(library, &mut host)
        };
        self.enable_removal();
        let output = result?;
        tracing::debug!(
            %library,
            libraries = output.libraries.len(),
            cycle = output.cycle.len(),
            "libraries resolved"
        );
        self.record(output);
        if let Some(entry) = self.unit_entry_mut(library) {
            if entry.element.state() != CacheState::Valid {
                entry.element.set_state(CacheState::Error);
            }
        }
        Ok(())
    }

    fn record(&mut self, output: ResolveOutput) {
        let mut recorded = Vec::with_capacity(output.libraries.len());
        for library in output.libraries {
            let element = library.element;
            let library_source = element.source.clone();
            let mut parts = Vec::with_capacity(library.units.len());
            for unit in library.units {
                let unit = Arc::new(unit);
                let source = unit.source.clone();
                if let Some(entry) = self.unit_entry_mut(&source) {
                    entry.set_resolution(&library_source, Arc::clone(&unit));
                }
                self.resolution_notice(&source, unit);
                parts.push(source);
            }
            if let Some(entry) = self.unit_entry_mut(&library_source) {
                entry.is_launchable.set_value(element.is_launchable());
                entry.public_namespace.set_value(Arc::new(element.namespace.clone()));
                entry.included_parts.set_value(parts);
                entry.element.set_value(element);
            }
            recorded.push(library_source);
        }
        for library in recorded {
            let client = self.reaches_browser(&library);
            if let Some(entry) = self.unit_entry_mut(&library) {
                entry.is_client.set_value(client);
            }
        }
    }

    /// Returns `true` if `library` reaches the browser library through
    /// imports and exports of resolved libraries.
    fn reaches_browser(&self, library: &Source) -> bool {
        let browser = self.factory.for_uri("std:html");
        let mut visited = Visited::default();
        let mut stack = vec![library.clone()];
        while let Some(next) = stack.pop() {
            if next == browser {
                return true;
            }
            if !visited.insert(&next) {
                continue;
            }
            if let Some(element) = self.unit_entry(&next).and_then(|e| e.element.value()) {
                stack.extend(element.referenced_libraries());
            }
        }
        false
    }

    pub(crate) fn resolve_compilation_unit(
        &mut self,
        source: &Source,
        library: &Source,
    ) -> Result<Arc<ResolvedUnit>, ContextError> {
        self.accessed(source);
        if let Some(unit) = self.unit_entry(source).and_then(|e| e.resolved_unit(library)) {
            return Ok(unit);
        }
        self.disable_removal();
        let result = self.resolve_unit_now(source, library);
        self.enable_removal();
        result
    }

    fn resolve_unit_now(&mut self, source: &Source, library: &Source) -> Result<Arc<ResolvedUnit>, ContextError> {
        self.compute_library_element(library)?;
        let included = self
            .unit_entry(library)
            .and_then(|e| e.included_parts.value())
            .is_some_and(|parts| parts.contains(source));
        if !included {
            return Err(ContextError::NotInLibrary {
                unit: source.uri().to_string(),
                library: library.uri().to_string(),
            });
        }
        if let Some(unit) = self.unit_entry(source).and_then(|e| e.resolved_unit(library)) {
            return Ok(unit);
        }
        // The element outlived the flushed tree; resolve the library again.
        tracing::trace!(%source, %library, "re-resolving flushed unit");
        if let Some(entry) = self.unit_entry_mut(library) {
            entry.element.invalidate();
        }
        self.compute_library_element(library)?;
        self.unit_entry(source)
            .and_then(|e| e.resolved_unit(library))
            .ok_or_else(|| InternalError::new(format!("no resolution of {source} recorded for {library}")).into())
    }

    pub(crate) fn get_public_namespace(&mut self, source: &Source) -> Result<Arc<PublicNamespace>, ContextError> {
        if let Some(namespace) = self.unit_entry(source).and_then(|e| e.public_namespace.value().cloned()) {
            return Ok(namespace);
        }
        let element = self.compute_library_element(source)?;
        let namespace = Arc::new(element.namespace.clone());
        if let Some(entry) = self.unit_entry_mut(source) {
            entry.public_namespace.set_value(Arc::clone(&namespace));
        }
        Ok(namespace)
    }

    pub(crate) fn compute_errors(&mut self, source: &Source) -> Result<Vec<Diagnostic>, ContextError> {
        if source.is_html() {
            return Ok(self.resolve_html_unit(source)?.diagnostics.clone());
        }
        self.accessed(source);
        let parsed = self
            .unit_entry(source)
            .is_some_and(|e| e.parse_errors.state() == CacheState::Valid);
        if !parsed {
            self.parse_unit_now(source)?;
        }
        for library in self.compute_libraries_containing(source) {
            let stale = self
                .unit_entry(source)
                .map_or(true, |e| e.library_state(LibrarySlot::ResolutionErrors, &library).needs_computing());
            if stale {
                self.resolve_compilation_unit(source, &library)?;
            }
        }
        Ok(self.unit_entry(source).map(UnitEntry::all_errors).unwrap_or_default())
    }

    // --- library membership ---

    /// Libraries known to include `source`, itself first if it is one.
    pub(crate) fn libraries_containing(&self, source: &Source) -> Vec<Source> {
        let mut libraries = Vec::new();
        if self.kind_of(source) == EntryKind::Library {
            libraries.push(source.clone());
        }
        for (library, entry) in &self.state.entries {
            if library == source {
                continue;
            }
            let Some(unit) = entry.as_unit().filter(|u| u.kind() == EntryKind::Library) else {
                continue;
            };
            let includes = match unit.included_parts.value() {
                Some(parts) => parts.contains(source),
                None => unit
                    .any_parsed_unit()
                    .is_some_and(|tree| part_sources(self.factory, library, &tree).contains(source)),
            };
            if includes {
                libraries.push(library.clone());
            }
        }
        libraries
    }

    /// Like [`libraries_containing`](Self::libraries_containing), after
    /// computing the kind of every known source first.
    fn compute_libraries_containing(&mut self, source: &Source) -> Vec<Source> {
        let unknown: Vec<Source> = self
            .state
            .entries
            .iter()
            .filter(|(_, e)| e.as_unit().is_some_and(|u| u.kind.state().needs_computing()))
            .map(|(s, _)| s.clone())
            .collect();
        for other in unknown {
            self.compute_kind_of(&other);
        }
        self.libraries_containing(source)
    }

    pub(crate) fn html_files_referencing(&self, source: &Source) -> Vec<Source> {
        let mut targets = self.libraries_containing(source);
        if !targets.contains(source) {
            targets.push(source.clone());
        }
        self.state
            .entries
            .iter()
            .filter_map(|(html, entry)| {
                let referenced = entry.as_html()?.referenced_libraries.value()?;
                referenced.iter().any(|l| targets.contains(l)).then(|| html.clone())
            })
            .collect()
    }

    // --- HTML ---

    pub(crate) fn parse_html_unit(&mut self, source: &Source) -> Result<Arc<HtmlUnit>, ContextError> {
        self.accessed(source);
        let Some(entry) = self.get_or_create(source).and_then(SourceEntry::as_html_mut) else {
            return Err(ContextError::NotHtml(source.uri().to_string()));
        };
        if let Some(unit) = entry.parsed_unit.value() {
            return Ok(Arc::clone(unit));
        }
        let text = match self.factory.contents(source) {
            Ok(text) => text,
            Err(err) => {
                if let Some(entry) = self.get_or_create(source).and_then(SourceEntry::as_html_mut) {
                    for slot in [
                        HtmlSlot::LineInfo,
                        HtmlSlot::ParsedUnit,
                        HtmlSlot::ReferencedLibraries,
                        HtmlSlot::ResolvedUnit,
                    ] {
                        entry.set_state(slot, CacheState::Error);
                    }
                }
                return Err(ContextError::Unreadable {
                    uri: source.uri().to_string(),
                    source: err,
                });
            }
        };
        let unit = Arc::new(scan_html(&text, source.file()));
        let libraries = referenced_libraries(self.factory, source, &unit);
        if let Some(entry) = self.get_or_create(source).and_then(SourceEntry::as_html_mut) {
            entry.line_info.set_value(Arc::new(LineInfo::from_text(&text)));
            entry.parsed_unit.set_value(Arc::clone(&unit));
            entry.referenced_libraries.set_value(libraries);
        }
        Ok(unit)
    }

    pub(crate) fn resolve_html_unit(&mut self, source: &Source) -> Result<Arc<ResolvedHtml>, ContextError> {
        self.accessed(source);
        if let Some(resolved) = self
            .entry(source)
            .and_then(SourceEntry::as_html)
            .and_then(|e| e.resolved_unit.value().cloned())
        {
            return Ok(resolved);
        }
        let unit = self.parse_html_unit(source)?;
        let resolved = Arc::new(resolve_html(self.factory, source, &unit));
        if let Some(entry) = self.get_or_create(source).and_then(SourceEntry::as_html_mut) {
            entry.resolved_unit.set_value(Arc::clone(&resolved));
        }
        let notice = self.notice_mut(source);
        notice.errors = resolved.diagnostics.clone();
        notice.html = Some(Arc::clone(&resolved));
        Ok(resolved)
    }

    // --- notices ---

    fn notice_mut(&mut self, source: &Source) -> &mut ChangeNotice {
        let line_info = self.entry(source).and_then(SourceEntry::line_info);
        let notice = self
            .state
            .notices
            .entry(source.clone())
            .or_insert_with(|| ChangeNotice::new(source.clone()));
        if line_info.is_some() {
            notice.line_info = line_info;
        }
        notice
    }

    fn parse_notice(&mut self, source: &Source) {
        let (errors, parsed) = match self.unit_entry(source) {
            Some(entry) => (entry.all_errors(), entry.parsed_unit.value().cloned()),
            None => return,
        };
        let notice = self.notice_mut(source);
        notice.errors = errors;
        notice.parsed_unit = parsed;
    }

    fn resolution_notice(&mut self, source: &Source, unit: Arc<ResolvedUnit>) {
        let errors = self.unit_entry(source).map(UnitEntry::all_errors).unwrap_or_default();
        let notice = self.notice_mut(source);
        notice.errors = errors;
        notice.resolved_unit = Some(unit);
    }

    fn take_notices(&mut self) -> Vec<ChangeNotice> {
        std::mem::take(&mut self.state.notices).into_values().collect()
    }

    // --- changes ---

    pub(crate) fn apply_changes(&mut self, changes: &ChangeSet) {
        let mut unit_added = false;
        for source in &changes.added {
            if self.get_or_create(source).is_some() && is_unit_source(source) {
                unit_added = true;
            }
        }
        for source in &changes.changed {
            self.source_changed(source);
        }
        for source in &changes.removed {
            self.source_removed(source);
        }
        if unit_added {
            // A new unit can satisfy any missing import; redo all resolution.
            for entry in self.state.entries.values_mut() {
                match entry {
                    SourceEntry::Unit(unit) => unit.invalidate_resolution(),
                    SourceEntry::Html(html) => {
                        html.set_state(HtmlSlot::ReferencedLibraries, CacheState::Invalid);
                        html.set_state(HtmlSlot::ResolvedUnit, CacheState::Invalid);
                    }
                }
            }
        }
        tracing::debug!(
            added = changes.added.len(),
            changed = changes.changed.len(),
            removed = changes.removed.len(),
            "changes applied"
        );
    }

    fn source_changed(&mut self, source: &Source) {
        match self.state.entries.get_mut(source) {
            None => {
                self.get_or_create(source);
                return;
            }
            Some(SourceEntry::Html(html)) => {
                html.invalidate_all();
                return;
            }
            Some(SourceEntry::Unit(_)) => {}
        }
        self.invalidate_dependents(source);
        if let Some(entry) = self.state.entries.get_mut(source).and_then(SourceEntry::as_unit_mut) {
            entry.invalidate_contents();
        }
    }

    fn source_removed(&mut self, source: &Source) {
        if matches!(self.state.entries.get(source), Some(SourceEntry::Unit(_))) {
            self.invalidate_dependents(source);
        }
        self.state.entries.remove(source);
        self.state.recently_used.remove(source);
        self.state.notices.remove(source);
    }

    /// Invalidates the resolution of every library including `source`, of
    /// their units, and of every library importing or exporting one of them,
    /// transitively.
    fn invalidate_dependents(&mut self, source: &Source) {
        let mut work = self.libraries_containing(source);
        if !work.contains(source) {
            work.push(source.clone());
        }
        let mut visited = Visited::default();
        while let Some(library) = work.pop() {
            if !visited.insert(&library) {
                continue;
            }
            let parts = self
                .unit_entry(&library)
                .and_then(|e| e.included_parts.value().cloned())
                .unwrap_or_default();
            for part in parts.iter().chain(std::iter::once(&library)) {
                if let Some(entry) = self.state.entries.get_mut(part).and_then(SourceEntry::as_unit_mut) {
                    entry.invalidate_resolution();
                }
            }
            for (other, entry) in &self.state.entries {
                let imports = entry
                    .as_unit()
                    .and_then(|u| u.element.value())
                    .is_some_and(|e| e.referenced_libraries().contains(&library));
                if imports {
                    work.push(other.clone());
                }
            }
        }
    }

    // --- background work ---

    /// Performs the most urgent piece of pending work, if any.
    pub(crate) fn perform_task(&mut self) -> Result<TaskOutcome, ContextError> {
        let worked = if let Some(source) = self.find(|e| e.parsed_state() == CacheState::Invalid) {
            tracing::debug!(%source, "analysis task: parse");
            let result = if source.is_html() {
                self.parse_html_unit(&source).map(drop)
            } else {
                self.parse_unit_now(&source).map(drop)
            };
            self.task_finished(&source, result)?;
            true
        } else if let Some(source) = self.find(|e| {
            e.as_unit()
                .is_some_and(|u| u.kind() == EntryKind::Library && u.element.state() == CacheState::Invalid)
        }) {
            tracing::debug!(%source, "analysis task: resolve library");
            let result = self.compute_library_element(&source).map(drop);
            if matches!(result, Err(ref err) if !matches!(err, ContextError::Cancelled)) {
                if let Some(entry) = self.unit_entry_mut(&source) {
                    entry.element.set_state(CacheState::Error);
                }
            }
            self.task_finished(&source, result)?;
            true
        } else if let Some(source) = self.find(|e| {
            e.as_html()
                .is_some_and(|h| h.resolved_unit.state() == CacheState::Invalid)
        }) {
            tracing::debug!(%source, "analysis task: resolve html");
            let result = self.resolve_html_unit(&source).map(drop);
            if result.is_err() {
                if let Some(entry) = self.get_or_create(&source).and_then(SourceEntry::as_html_mut) {
                    entry.set_state(HtmlSlot::ResolvedUnit, CacheState::Error);
                }
            }
            self.task_finished(&source, result)?;
            true
        } else {
            false
        };
        let notices = self.take_notices();
        Ok(match (notices.is_empty(), worked) {
            (false, _) => TaskOutcome::Notices(notices),
            (true, true) => TaskOutcome::MoreWork,
            (true, false) => TaskOutcome::Idle,
        })
    }

    fn find(&self, pred: impl Fn(&SourceEntry) -> bool) -> Option<Source> {
        self.state
            .entries
            .iter()
            .find(|&(_, e)| pred(e))
            .map(|(s, _)| s.clone())
    }

    fn task_finished(&self, source: &Source, result: Result<(), ContextError>) -> Result<(), ContextError> {
        match result {
            Ok(()) => Ok(()),
            Err(ContextError::Cancelled) => Err(ContextError::Cancelled),
            Err(err) => {
                tracing::warn!(%source, error = %err, "analysis task failed");
                Ok(())
            }
        }
    }
}
