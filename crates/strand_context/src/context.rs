//! The analysis context: the one object an editor or tool talks to.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use strand_common::{InternalError, Interner};
use strand_config::CompilerOptions;
use strand_diagnostics::Diagnostic;
use strand_resolver::{CancellationToken, LibraryElement, ResolvedUnit};
use strand_source::{LineInfo, Source, SourceFactory, SourceProvider, SystemLibraries};
use strand_syntax::{CompilationUnit, HtmlUnit};

use crate::engine::{ContextState, Engine};
use crate::entry::{EntryKind, PublicNamespace, ResolvedHtml, SourceEntry, UnitEntry};
use crate::errors::ContextError;

/// Sources added, changed and removed since the last call to
/// [`AnalysisContext::apply_changes`].
#[derive(Clone, Debug, Default)]
pub struct ChangeSet {
    /// Sources that appeared.
    pub added: Vec<Source>,
    /// Sources whose contents changed.
    pub changed: Vec<Source>,
    /// Sources that disappeared.
    pub removed: Vec<Source>,
}

impl ChangeSet {
    /// Creates an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an added source.
    pub fn added(mut self, source: Source) -> Self {
        self.added.push(source);
        self
    }

    /// Records a changed source.
    pub fn changed(mut self, source: Source) -> Self {
        self.changed.push(source);
        self
    }

    /// Records a removed source.
    pub fn removed(mut self, source: Source) -> Self {
        self.removed.push(source);
        self
    }

    /// Returns `true` if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}

/// New analysis results for one source.
#[derive(Clone, Debug)]
pub struct ChangeNotice {
    /// The source the results are for.
    pub source: Source,
    /// Every problem currently known in the source.
    pub errors: Vec<Diagnostic>,
    /// Line starts, to place the errors.
    pub line_info: Option<Arc<LineInfo>>,
    /// A freshly parsed tree.
    pub parsed_unit: Option<Arc<CompilationUnit>>,
    /// A freshly resolved tree.
    pub resolved_unit: Option<Arc<ResolvedUnit>>,
    /// A freshly resolved HTML document.
    pub html: Option<Arc<ResolvedHtml>>,
}

impl ChangeNotice {
    pub(crate) fn new(source: Source) -> Self {
        Self {
            source,
            errors: Vec::new(),
            line_info: None,
            parsed_unit: None,
            resolved_unit: None,
            html: None,
        }
    }
}

/// What one call to [`AnalysisContext::perform_analysis_task`] achieved.
#[derive(Clone, Debug)]
pub enum TaskOutcome {
    /// Nothing was left to do and nothing is pending.
    Idle,
    /// Work was done without new results; call again.
    MoreWork,
    /// Results gathered since the last call. More work may remain.
    Notices(Vec<ChangeNotice>),
}

/// The known problems of a source and where its lines start.
#[derive(Clone, Debug, Default)]
pub struct ErrorInfo {
    /// Known problems.
    pub errors: Vec<Diagnostic>,
    /// Line starts, if known.
    pub line_info: Option<Arc<LineInfo>>,
}

/// A copy of every entry of a context, for seeding another context.
#[derive(Clone)]
pub struct ContextSnapshot {
    interner: Arc<Interner>,
    entries: BTreeMap<Source, SourceEntry>,
}

impl ContextSnapshot {
    /// Sources with an entry in the snapshot.
    pub fn sources(&self) -> impl Iterator<Item = &Source> {
        self.entries.keys()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the snapshot holds no entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Caches everything known about a set of sources and computes the rest on
/// demand.
///
/// Every operation takes the context lock, so the context can be shared
/// between an editor thread asking for immediate results and a background
/// thread driving [`perform_analysis_task`](Self::perform_analysis_task).
pub struct AnalysisContext {
    factory: Arc<SourceFactory>,
    interner: Arc<Interner>,
    cancel: Option<CancellationToken>,
    state: Mutex<ContextState>,
}

impl AnalysisContext {
    /// Creates an empty context reading sources through `factory`.
    pub fn new(factory: Arc<SourceFactory>) -> Self {
        Self::with_interner(factory, Arc::new(Interner::new()))
    }

    /// Creates an empty context interning names into `interner`.
    pub fn with_interner(factory: Arc<SourceFactory>, interner: Arc<Interner>) -> Self {
        Self {
            factory,
            interner,
            cancel: None,
            state: Mutex::new(ContextState::default()),
        }
    }

    /// Creates a context for the system libraries and package roots of
    /// `options`.
    pub fn from_options(options: &CompilerOptions, provider: Arc<dyn SourceProvider>) -> Self {
        let system = match &options.sdk {
            Some(sdk) => SystemLibraries::with_sdk(sdk.clone()),
            None => SystemLibraries::embedded(),
        };
        let factory = SourceFactory::new(provider, system).with_package_roots(options.package_roots.clone());
        Self::new(Arc::new(factory))
    }

    /// Makes resolutions stop early once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The source factory of this context.
    pub fn factory(&self) -> &Arc<SourceFactory> {
        &self.factory
    }

    /// The interner shared by every unit this context parses.
    pub fn interner(&self) -> &Arc<Interner> {
        &self.interner
    }

    fn with_engine<R>(&self, f: impl FnOnce(&mut Engine<'_>) -> R) -> R {
        let mut state = self.state.lock();
        let mut engine = Engine {
            factory: &self.factory,
            interner: &self.interner,
            cancel: self.cancel.as_ref(),
            state: &mut *state,
        };
        f(&mut engine)
    }

    fn read<R>(&self, source: &Source, f: impl FnOnce(&UnitEntry) -> Option<R>) -> Option<R> {
        let state = self.state.lock();
        state.entries.get(source).and_then(SourceEntry::as_unit).and_then(f)
    }

    // --- changes ---

    /// Tells the context which sources appeared, changed or disappeared.
    pub fn apply_changes(&self, changes: &ChangeSet) {
        self.with_engine(|engine| engine.apply_changes(changes));
    }

    // --- kinds ---

    /// The kind of `source`, parsing it if needed.
    pub fn compute_kind_of(&self, source: &Source) -> EntryKind {
        self.with_engine(|engine| engine.compute_kind_of(source))
    }

    /// The kind of `source` as far as it is known.
    pub fn get_kind_of(&self, source: &Source) -> EntryKind {
        self.with_engine(|engine| engine.kind_of(source))
    }

    // --- parsing ---

    /// The parsed tree of `source`.
    pub fn parse_compilation_unit(&self, source: &Source) -> Result<Arc<CompilationUnit>, ContextError> {
        self.with_engine(|engine| engine.parse_compilation_unit(source))
    }

    /// Line starts of `source`, reading it if needed.
    pub fn compute_line_info(&self, source: &Source) -> Result<Arc<LineInfo>, ContextError> {
        self.with_engine(|engine| engine.compute_line_info(source))
    }

    /// Line starts of `source`, if known.
    pub fn get_line_info(&self, source: &Source) -> Option<Arc<LineInfo>> {
        self.state.lock().entries.get(source).and_then(SourceEntry::line_info)
    }

    // --- resolution ---

    /// The element of the library defined by `source`.
    pub fn compute_library_element(&self, source: &Source) -> Result<Arc<LibraryElement>, ContextError> {
        self.with_engine(|engine| engine.compute_library_element(source))
    }

    /// The element of the library defined by `source`, if valid.
    pub fn get_library_element(&self, source: &Source) -> Option<Arc<LibraryElement>> {
        self.read(source, |e| e.element.value().cloned())
    }

    /// The resolved tree of `source` within `library`.
    pub fn resolve_compilation_unit(
        &self,
        source: &Source,
        library: &Source,
    ) -> Result<Arc<ResolvedUnit>, ContextError> {
        self.with_engine(|engine| engine.resolve_compilation_unit(source, library))
    }

    /// The resolved tree of `source` within `library`, if valid.
    pub fn get_resolved_compilation_unit(&self, source: &Source, library: &Source) -> Option<Arc<ResolvedUnit>> {
        self.read(source, |e| e.resolved_unit(library))
    }

    /// Names the library defined by `source` makes visible to importers.
    pub fn get_public_namespace(&self, source: &Source) -> Result<Arc<PublicNamespace>, ContextError> {
        self.with_engine(|engine| engine.get_public_namespace(source))
    }

    // --- errors ---

    /// Every problem in `source`, parsing and resolving as needed.
    pub fn compute_errors(&self, source: &Source) -> Result<Vec<Diagnostic>, ContextError> {
        self.with_engine(|engine| engine.compute_errors(source))
    }

    /// The problems of `source` known so far.
    pub fn get_errors(&self, source: &Source) -> ErrorInfo {
        let state = self.state.lock();
        match state.entries.get(source) {
            Some(entry) => ErrorInfo {
                errors: entry.errors(),
                line_info: entry.line_info(),
            },
            None => ErrorInfo::default(),
        }
    }

    // --- HTML ---

    /// The scanned form of an HTML file.
    pub fn parse_html_unit(&self, source: &Source) -> Result<Arc<HtmlUnit>, ContextError> {
        self.with_engine(|engine| engine.parse_html_unit(source))
    }

    /// The resolved form of an HTML file.
    pub fn resolve_html_unit(&self, source: &Source) -> Result<Arc<ResolvedHtml>, ContextError> {
        self.with_engine(|engine| engine.resolve_html_unit(source))
    }

    /// HTML files whose scripts name `source` or a library including it.
    pub fn get_html_files_referencing(&self, source: &Source) -> Vec<Source> {
        self.with_engine(|engine| engine.html_files_referencing(source))
    }

    // --- queries ---

    /// Libraries known to include `source`.
    pub fn get_libraries_containing(&self, source: &Source) -> Vec<Source> {
        self.with_engine(|engine| engine.libraries_containing(source))
    }

    /// Every source known to define a library.
    pub fn get_library_sources(&self) -> Vec<Source> {
        self.sources_where(|_, e| e.kind() == EntryKind::Library)
    }

    /// Every known HTML file.
    pub fn get_html_sources(&self) -> Vec<Source> {
        self.sources_where(|_, e| e.kind() == EntryKind::Html)
    }

    /// Launchable libraries that reach the browser library.
    pub fn get_launchable_client_libraries(&self) -> Vec<Source> {
        self.sources_where(|s, e| !s.is_system() && launch_flags(e) == Some((true, true)))
    }

    /// Launchable libraries that do not reach the browser library.
    pub fn get_launchable_server_libraries(&self) -> Vec<Source> {
        self.sources_where(|s, e| !s.is_system() && launch_flags(e) == Some((true, false)))
    }

    /// Returns `true` if `source` is a launchable library reaching the
    /// browser library. Only resolved libraries are known.
    pub fn is_client_library(&self, source: &Source) -> bool {
        self.state.lock().entries.get(source).and_then(launch_flags) == Some((true, true))
    }

    /// Returns `true` if `source` is a launchable library not reaching the
    /// browser library. Only resolved libraries are known.
    pub fn is_server_library(&self, source: &Source) -> bool {
        self.state.lock().entries.get(source).and_then(launch_flags) == Some((true, false))
    }

    fn sources_where(&self, pred: impl Fn(&Source, &SourceEntry) -> bool) -> Vec<Source> {
        let state = self.state.lock();
        state
            .entries
            .iter()
            .filter(|&(s, e)| pred(s, e))
            .map(|(s, _)| s.clone())
            .collect()
    }

    /// Sources whose trees are kept, least recently used first.
    pub fn recently_used(&self) -> Vec<Source> {
        self.state.lock().recently_used.iter().cloned().collect()
    }

    // --- background work ---

    /// Performs at most one unit of pending work: parsing a source, then
    /// resolving a library, then resolving an HTML file, in that priority.
    ///
    /// Failures other than cancellation are recorded on the entry and
    /// logged; the call itself still succeeds.
    pub fn perform_analysis_task(&self) -> Result<TaskOutcome, ContextError> {
        self.with_engine(|engine| engine.perform_task())
    }

    // --- transfer ---

    /// A copy of the entry of `source`.
    pub fn entry_snapshot(&self, source: &Source) -> Option<SourceEntry> {
        self.state.lock().entries.get(source).cloned()
    }

    /// A copy of every entry.
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            interner: Arc::clone(&self.interner),
            entries: self.state.lock().entries.clone(),
        }
    }

    /// Adds the entries of `snapshot` this context does not have yet.
    /// Returns how many were added.
    pub fn import_snapshot(&self, snapshot: ContextSnapshot) -> Result<usize, ContextError> {
        if !Arc::ptr_eq(&snapshot.interner, &self.interner) {
            return Err(InternalError::new("snapshot was taken with a different interner").into());
        }
        let mut state = self.state.lock();
        let mut imported = 0;
        for (source, entry) in snapshot.entries {
            if !state.entries.contains_key(&source) {
                state.entries.insert(source, entry);
                imported += 1;
            }
        }
        tracing::debug!(imported, "snapshot imported");
        Ok(imported)
    }
}

/// Launchable and client flags of a resolved library.
fn launch_flags(entry: &SourceEntry) -> Option<(bool, bool)> {
    let unit = entry.as_unit()?;
    Some((*unit.is_launchable.value()?, *unit.is_client.value()?))
}
