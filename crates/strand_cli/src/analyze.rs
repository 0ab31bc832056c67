//! `strand analyze`: load sources into an analysis context and drain it.
//!
//! Every discovered file is added to a fresh context, then background tasks
//! run until the context is idle. The errors gathered per source are
//! rendered, followed by the launchable libraries the context found.

use std::error::Error;
use std::sync::Arc;

use strand_compiler::CompileStatus;
use strand_config::CompilerOptions;
use strand_context::{AnalysisContext, ChangeSet, TaskOutcome};
use strand_diagnostics::Diagnostic;
use strand_source::{FileSourceProvider, Source};

use crate::pipeline::{self, path_uri};
use crate::{AnalyzeArgs, GlobalArgs};

/// What one drained context found.
pub struct Analysis {
    /// Problems in every loaded source, in source order.
    pub diagnostics: Vec<Diagnostic>,
    /// Launchable libraries that reach the browser library.
    pub client_libraries: Vec<Source>,
    /// Launchable libraries that do not.
    pub server_libraries: Vec<Source>,
    /// Background tasks performed.
    pub tasks: usize,
}

/// Runs the `strand analyze` command and returns the process exit code.
pub fn run(args: &AnalyzeArgs, global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let project = pipeline::load_project(global, &args.options)?;
    let roots = if args.paths.is_empty() {
        vec![project.dir.clone()]
    } else {
        args.paths.clone()
    };
    let files = pipeline::discover_sources(&roots)?;
    let uris: Vec<String> = files.iter().map(|p| path_uri(p)).collect();

    if !global.quiet {
        eprintln!("   Analyzing {} file(s)", uris.len());
    }

    let context = AnalysisContext::from_options(&project.options, Arc::new(FileSourceProvider));
    let analysis = analyze(&context, &uris)?;

    pipeline::report(&analysis.diagnostics, context.factory(), args.format, global);
    if !global.quiet {
        for library in &analysis.client_libraries {
            eprintln!("   client: {library}");
        }
        for library in &analysis.server_libraries {
            eprintln!("   server: {library}");
        }
    }

    Ok(status(&analysis.diagnostics, &project.options).exit_code(project.options.exit_mode))
}

/// Adds `uris` to `context` and performs tasks until it reports idle.
pub fn analyze(context: &AnalysisContext, uris: &[String]) -> Result<Analysis, Box<dyn Error>> {
    let sources: Vec<Source> = uris.iter().map(|u| context.factory().for_uri(u)).collect();
    let changes = sources
        .iter()
        .fold(ChangeSet::new(), |changes, source| changes.added(source.clone()));
    context.apply_changes(&changes);

    let mut tasks = 0;
    loop {
        match context.perform_analysis_task()? {
            TaskOutcome::Idle => break,
            TaskOutcome::MoreWork => tasks += 1,
            TaskOutcome::Notices(notices) => {
                tasks += 1;
                for notice in &notices {
                    tracing::trace!(source = %notice.source, errors = notice.errors.len(), "analysis notice");
                }
            }
        }
    }
    tracing::debug!(tasks, "analysis idle");

    let diagnostics = sources
        .iter()
        .flat_map(|source| context.get_errors(source).errors)
        .collect();
    Ok(Analysis {
        diagnostics,
        client_libraries: context.get_launchable_client_libraries(),
        server_libraries: context.get_launchable_server_libraries(),
        tasks,
    })
}

/// The overall status of a set of problems under `options`.
pub fn status(diagnostics: &[Diagnostic], options: &CompilerOptions) -> CompileStatus {
    let mut fatal = false;
    let mut warned = false;
    for diag in diagnostics {
        if diag.is_type_problem() {
            fatal |= options.type_errors_are_fatal;
        } else if diag.severity.is_error() {
            fatal = true;
        } else {
            warned = true;
            fatal |= options.warnings_are_fatal;
        }
    }
    if fatal {
        CompileStatus::Errors
    } else if warned {
        CompileStatus::Warnings
    } else {
        CompileStatus::Ok
    }
}
