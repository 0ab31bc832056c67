//! State of one compile.
//!
//! A [`Session`] owns the library graph and the diagnostic counters for a
//! single call of [`Compiler::compile`](crate::Compiler::compile) or
//! [`Compiler::analyze_library`](crate::Compiler::analyze_library). The
//! phases live in their own modules as further `impl Session` blocks.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use strand_cache::ArtifactProvider;
use strand_common::Interner;
use strand_config::CompilerOptions;
use strand_diagnostics::{Diagnostic, DiagnosticSink};
use strand_resolver::{CancellationToken, LibraryResolver, ResolvedUnit};
use strand_source::{FileId, Source, SourceFactory};
use strand_syntax::CompilationUnit;

use crate::graph::{GraphHost, LibraryGraph, LibraryId};
use crate::listener::{CompiledUnit, CompilerListener};
use crate::result::CompileError;
use crate::validate::validate_library_directives;

pub(crate) struct Session<'a> {
    pub(crate) options: &'a CompilerOptions,
    pub(crate) factory: &'a SourceFactory,
    pub(crate) interner: &'a Arc<Interner>,
    pub(crate) artifacts: &'a dyn ArtifactProvider,
    pub(crate) listener: &'a mut dyn CompilerListener,
    pub(crate) cancel: Option<&'a CancellationToken>,
    /// Units supplied by the caller instead of being read and parsed.
    pub(crate) parsed: &'a HashMap<Source, Arc<CompilationUnit>>,
    pub(crate) sink: DiagnosticSink,
    pub(crate) graph: LibraryGraph,
    /// Diet-parse unchanged units and consult the dependency records.
    pub(crate) incremental: bool,
    /// Write timestamps and dependency records.
    pub(crate) persist: bool,
    pub(crate) files_changed: bool,
    /// Full units whose `unit_compiled` notification is still due.
    open: Vec<(LibraryId, Source)>,
    /// Files that received a diagnostic in this compile.
    dirty: HashSet<FileId>,
}

impl<'a> Session<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        options: &'a CompilerOptions,
        factory: &'a SourceFactory,
        interner: &'a Arc<Interner>,
        artifacts: &'a dyn ArtifactProvider,
        listener: &'a mut dyn CompilerListener,
        cancel: Option<&'a CancellationToken>,
        parsed: &'a HashMap<Source, Arc<CompilationUnit>>,
        persist: bool,
    ) -> Self {
        Self {
            options,
            factory,
            interner,
            artifacts,
            listener,
            cancel,
            parsed,
            sink: DiagnosticSink::new(),
            graph: LibraryGraph::new(),
            incremental: options.incremental && persist,
            persist,
            files_changed: false,
            open: Vec::new(),
            dirty: HashSet::new(),
        }
    }

    /// Counts a problem and passes it to the listener.
    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        if !diagnostic.primary_span.is_dummy() {
            self.dirty.insert(diagnostic.primary_span.file);
        }
        self.listener.on_error(&diagnostic);
        self.sink.emit(diagnostic);
    }

    /// Returns `true` if a diagnostic was reported in `file`.
    pub(crate) fn is_dirty(&self, file: FileId) -> bool {
        self.dirty.contains(&file)
    }

    /// Parsing found errors and resolution should not run.
    pub(crate) fn should_stop(&self) -> bool {
        !self.options.resolve_despite_parse_errors && self.sink.error_count() > 0
    }

    pub(crate) fn check_cancelled(&self) -> Result<(), CompileError> {
        match self.cancel {
            Some(token) if token.is_cancelled() => Err(CompileError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Returns `true` if `source` can be loaded in this compile.
    pub(crate) fn exists(&self, source: &Source) -> bool {
        self.parsed.contains_key(source) || self.factory.exists(source)
    }

    /// Opens the bracket of a full unit. It stays open until
    /// [`close_unit`](Self::close_unit) or the end of the compile.
    pub(crate) fn open_unit(&mut self, library: LibraryId, source: &Source) {
        self.listener.unit_about_to_compile(source, false);
        self.open.push((library, source.clone()));
    }

    /// Closes the bracket of a full unit, if it is open.
    pub(crate) fn close_unit(
        &mut self,
        library: LibraryId,
        source: &Source,
        resolved: Option<&ResolvedUnit>,
    ) {
        let Some(index) = self
            .open
            .iter()
            .position(|(l, s)| *l == library && s == source)
        else {
            return;
        };
        self.open.remove(index);
        let node = self.graph.node(library);
        let unit = node.units.iter().find(|u| u.source == *source);
        self.listener.unit_compiled(CompiledUnit {
            library: &node.source,
            source,
            unit: unit.map(|u| u.unit.as_ref()),
            resolved,
            is_diet: false,
        });
    }

    /// Brackets a diet unit, which is never compiled further.
    pub(crate) fn bracket_diet(&mut self, library: LibraryId, source: &Source, unit: &CompilationUnit) {
        self.listener.unit_about_to_compile(source, true);
        self.listener.unit_compiled(CompiledUnit {
            library: &self.graph.node(library).source,
            source,
            unit: Some(unit),
            resolved: None,
            is_diet: true,
        });
    }

    /// Closes every bracket still open, in the order they were opened.
    pub(crate) fn close_all(&mut self) {
        while let Some((library, source)) = self.open.first().cloned() {
            self.close_unit(library, &source, None);
        }
    }

    /// Resolves the library defined by `root` and everything it depends on,
    /// then reports resolution problems of full units and checks the
    /// directives of every library.
    pub(crate) fn resolve(&mut self, root: &Source) -> Result<(), CompileError> {
        let mut resolver = LibraryResolver::new(Arc::clone(self.interner), self.factory.core_source());
        let output = {
            let mut host = GraphHost::new(&self.graph, self.cancel);
            resolver.resolve(root, &mut host)?
        };
        tracing::debug!(
            %root,
            libraries = output.libraries.len(),
            cycle = output.cycle.len(),
            "libraries resolved"
        );
        for library in output.libraries {
            let Some(id) = self.graph.lookup(library.source()) else {
                continue;
            };
            let problems: Vec<Diagnostic> = library
                .units
                .iter()
                .filter(|u| !u.is_diet())
                .flat_map(|u| u.diagnostics.iter().cloned())
                .collect();
            for diagnostic in problems {
                self.report(diagnostic);
            }
            self.graph.node_mut(id).resolution = Some(library);
        }
        for diagnostic in validate_library_directives(&self.graph, self.factory.system_libraries()) {
            self.report(diagnostic);
        }
        Ok(())
    }
}
