//! The compile entry points.

use std::collections::HashMap;
use std::sync::Arc;

use strand_cache::{write_check_log, ArtifactProvider};
use strand_common::Interner;
use strand_config::CompilerOptions;
use strand_resolver::{CancellationToken, LibraryElement, ResolvedLibrary};
use strand_source::{Source, SourceFactory, SourceProvider, Span, SystemLibraries};
use strand_syntax::CompilationUnit;

use crate::errors;
use crate::graph::GraphBuilder;
use crate::listener::CompilerListener;
use crate::result::{CompileError, CompileResult, CompileStatus};
use crate::session::Session;

/// Units and libraries a caller already has, for
/// [`Compiler::analyze_library`].
#[derive(Clone, Debug, Default)]
pub struct SelectiveCache {
    /// Parsed units used instead of reading their sources.
    pub parsed_units: HashMap<Source, Arc<CompilationUnit>>,
    /// Resolved libraries used as they are; their dependencies are not
    /// loaded.
    pub resolved_libraries: HashMap<Source, Arc<LibraryElement>>,
}

/// Compiles applications and libraries.
///
/// A compiler holds the configuration and the collaborators of a session;
/// every call of [`compile`](Self::compile) builds a fresh library graph.
pub struct Compiler {
    options: CompilerOptions,
    factory: Arc<SourceFactory>,
    artifacts: Arc<dyn ArtifactProvider>,
    interner: Arc<Interner>,
    cancel: Option<CancellationToken>,
}

impl Compiler {
    /// Creates a compiler over an existing source factory.
    pub fn new(
        options: CompilerOptions,
        factory: Arc<SourceFactory>,
        artifacts: Arc<dyn ArtifactProvider>,
    ) -> Self {
        Self {
            options,
            factory,
            artifacts,
            interner: Arc::new(Interner::new()),
            cancel: None,
        }
    }

    /// Creates a compiler whose system libraries and package roots come from
    /// `options`.
    pub fn from_options(
        options: CompilerOptions,
        provider: Arc<dyn SourceProvider>,
        artifacts: Arc<dyn ArtifactProvider>,
    ) -> Self {
        let system = match &options.sdk {
            Some(sdk) => SystemLibraries::with_sdk(sdk.clone()),
            None => SystemLibraries::embedded(),
        };
        let factory = SourceFactory::new(provider, system)
            .with_package_roots(options.package_roots.clone());
        Self::new(options, Arc::new(factory), artifacts)
    }

    /// Makes every later compile stop early once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The source factory of this compiler.
    pub fn factory(&self) -> &Arc<SourceFactory> {
        &self.factory
    }

    /// The interner shared by every unit this compiler parses. Units passed
    /// to [`analyze_library`](Self::analyze_library) must use it too.
    pub fn interner(&self) -> &Arc<Interner> {
        &self.interner
    }

    /// The options of this compiler.
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compiles the library defined by `app` and everything it depends on.
    ///
    /// Problems in the sources are passed to `listener` and counted in the
    /// result. `Err` means the compile itself could not run: the core
    /// library is missing or the compile was cancelled.
    #[tracing::instrument(level = "debug", skip_all, fields(app = %app))]
    pub fn compile(
        &self,
        app: &Source,
        listener: &mut dyn CompilerListener,
    ) -> Result<CompileResult, CompileError> {
        let parsed = HashMap::new();
        let mut session = Session::new(
            &self.options,
            &self.factory,
            &self.interner,
            self.artifacts.as_ref(),
            listener,
            self.cancel.as_ref(),
            &parsed,
            true,
        );
        let outcome = self.run(&mut session, app, &HashMap::new());
        session.close_all();
        outcome?;
        let result = self.summarize(&session);
        if session.files_changed && result.status != CompileStatus::Errors {
            let log = check_log(app, result.type_error_count);
            if let Err(err) = write_check_log(self.artifacts.as_ref(), app, &log) {
                tracing::warn!(%app, %err, "check log not written");
            }
        }
        tracing::info!(
            status = %result.status,
            errors = result.error_count,
            type_errors = result.type_error_count,
            warnings = result.warning_count,
            "compile finished"
        );
        Ok(result)
    }

    /// Parses and resolves one library without reading or writing artifacts.
    ///
    /// Units in `cache.parsed_units` are used instead of their sources and
    /// libraries in `cache.resolved_libraries` are not analyzed again.
    /// Returns `None` if the library could not be loaded, was already
    /// resolved, or parse errors stopped the compile.
    #[tracing::instrument(level = "debug", skip_all, fields(library = %library))]
    pub fn analyze_library(
        &self,
        library: &Source,
        cache: &SelectiveCache,
        listener: &mut dyn CompilerListener,
    ) -> Result<Option<ResolvedLibrary>, CompileError> {
        let mut session = Session::new(
            &self.options,
            &self.factory,
            &self.interner,
            self.artifacts.as_ref(),
            listener,
            self.cancel.as_ref(),
            &cache.parsed_units,
            false,
        );
        let outcome = self.run(&mut session, library, &cache.resolved_libraries);
        session.close_all();
        outcome?;
        Ok(session
            .graph
            .lookup(library)
            .and_then(|id| session.graph.node(id).resolution.clone()))
    }

    fn run(
        &self,
        session: &mut Session<'_>,
        root: &Source,
        resolved: &HashMap<Source, Arc<LibraryElement>>,
    ) -> Result<(), CompileError> {
        let builder = GraphBuilder::new(&self.factory, &self.interner, session.parsed);
        builder.add_resolved(&mut session.graph, resolved);
        if builder.update_libraries(&mut session.graph, root).is_none() {
            session.report(errors::error_missing_source(
                root.uri(),
                Span::file_start(root.file()),
            ));
            return Ok(());
        }
        builder.import_embedded(&mut session.graph, &self.embedded_libraries());
        session.check_cancelled()?;

        session.parse_out_of_date_files();
        session.add_out_of_date_deps();
        session.check_cancelled()?;
        if session.should_stop() {
            tracing::debug!(errors = session.sink.error_count(), "stopping after parse errors");
            return Ok(());
        }

        session.resolve(root)?;
        session.compile_libraries();
        Ok(())
    }

    fn embedded_libraries(&self) -> Vec<Source> {
        let core = self.factory.core_source();
        let mut embedded = vec![core.clone()];
        embedded.extend(
            self.options
                .embedded_libraries
                .iter()
                .map(|uri| self.factory.for_uri(uri))
                .filter(|source| *source != core),
        );
        embedded
    }

    fn summarize(&self, session: &Session<'_>) -> CompileResult {
        let tally = session.sink.tally();
        let mut fatal = tally.errors;
        if self.options.type_errors_are_fatal {
            fatal += tally.type_problems;
        }
        if self.options.warnings_are_fatal {
            fatal += tally.warnings;
        }
        let (status, message) = if fatal > 0 {
            (
                CompileStatus::Errors,
                Some(format!(
                    "Compilation failed with {fatal} {}.",
                    if fatal == 1 { "problem" } else { "problems" }
                )),
            )
        } else if tally.warnings > 0 {
            (CompileStatus::Warnings, None)
        } else {
            (CompileStatus::Ok, None)
        };
        CompileResult {
            status,
            message,
            error_count: tally.errors,
            type_error_count: tally.type_problems,
            warning_count: tally.warnings,
            files_changed: session.files_changed,
        }
    }
}

fn check_log(app: &Source, type_errors: usize) -> String {
    format!("Checked {app} and found:\n  no load/resolution errors\n  {type_errors} type errors\n")
}
