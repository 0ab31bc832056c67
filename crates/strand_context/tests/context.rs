//! End-to-end behaviour of the analysis context over in-memory sources.

use std::sync::Arc;

use strand_context::errors::I003;
use strand_context::{
    AnalysisContext, CacheState, ChangeNotice, ChangeSet, ContextError, EntryKind, TaskOutcome,
    MAX_CACHE_SIZE,
};
use strand_diagnostics::{Diagnostic, DiagnosticCode};
use strand_resolver::errors::T004;
use strand_resolver::CancellationToken;
use strand_source::{MemorySourceProvider, Source, SourceFactory, SystemLibraries};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Fixture {
    provider: Arc<MemorySourceProvider>,
    context: AnalysisContext,
}

impl Fixture {
    fn new(files: &[(&str, &str)]) -> Self {
        Self::with_system(files, SystemLibraries::embedded())
    }

    fn with_system(files: &[(&str, &str)], system: SystemLibraries) -> Self {
        let provider = Arc::new(MemorySourceProvider::new());
        for (uri, text) in files {
            provider.set_content(uri, *text);
        }
        let factory = SourceFactory::new(provider.clone(), system);
        let context = AnalysisContext::new(Arc::new(factory));
        let mut changes = ChangeSet::new();
        for (uri, _) in files {
            changes = changes.added(context.factory().for_uri(uri));
        }
        context.apply_changes(&changes);
        Self { provider, context }
    }

    fn source(&self, uri: &str) -> Source {
        self.context.factory().for_uri(uri)
    }

    fn errors(&self, uri: &str) -> Vec<DiagnosticCode> {
        match self.context.compute_errors(&self.source(uri)) {
            Ok(errors) => codes(&errors),
            Err(err) => panic!("computing errors of {uri} failed: {err}"),
        }
    }
}

fn codes(errors: &[Diagnostic]) -> Vec<DiagnosticCode> {
    errors.iter().map(|d| d.code).collect()
}

/// Runs background tasks until the context is idle.
fn drain(context: &AnalysisContext) -> Vec<ChangeNotice> {
    let mut notices = Vec::new();
    for _ in 0..1000 {
        match context.perform_analysis_task() {
            Ok(TaskOutcome::Idle) => return notices,
            Ok(TaskOutcome::MoreWork) => {}
            Ok(TaskOutcome::Notices(batch)) => notices.extend(batch),
            Err(err) => panic!("analysis task failed: {err}"),
        }
    }
    panic!("analysis never became idle");
}

// ---------------------------------------------------------------------------
// Parsing and kinds
// ---------------------------------------------------------------------------

#[test]
fn parsed_units_are_cached_and_kinds_follow_directives() {
    let fx = Fixture::new(&[
        ("/p/lib.st", "library lib; part 'part.st'; var a;"),
        ("/p/part.st", "part of lib; var b;"),
    ]);
    let (lib, part) = (fx.source("/p/lib.st"), fx.source("/p/part.st"));
    assert_eq!(fx.context.get_kind_of(&lib), EntryKind::Unknown);

    assert_eq!(fx.context.compute_kind_of(&lib), EntryKind::Library);
    assert_eq!(fx.context.compute_kind_of(&part), EntryKind::Part);
    assert_eq!(fx.context.compute_kind_of(&fx.source("/p/index.html")), EntryKind::Html);
    assert_eq!(fx.context.compute_kind_of(&fx.source("/p/notes.txt")), EntryKind::Unknown);
    assert_eq!(fx.context.get_kind_of(&part), EntryKind::Part);

    let first = fx.context.parse_compilation_unit(&lib).unwrap();
    let second = fx.context.parse_compilation_unit(&lib).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(fx.context.get_library_sources(), vec![lib.clone()]);
    assert!(fx.context.get_line_info(&lib).is_some());

    let err = fx.context.compute_library_element(&part).unwrap_err();
    assert!(matches!(err, ContextError::NotALibrary(_)), "{err}");
}

#[test]
fn unreadable_sources_are_errors_not_panics() {
    let fx = Fixture::new(&[]);
    let gone = fx.source("/p/gone.st");
    let err = fx.context.parse_compilation_unit(&gone).unwrap_err();
    assert!(matches!(err, ContextError::Unreadable { .. }), "{err}");
    assert_eq!(fx.context.compute_kind_of(&gone), EntryKind::Unknown);
    let entry = fx.context.entry_snapshot(&gone).unwrap();
    assert_eq!(entry.parsed_state(), CacheState::Error);
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

#[test]
fn resolution_reports_unresolved_names_per_unit() {
    let fx = Fixture::new(&[
        ("/p/lib.st", "library lib; part 'part.st'; main() { print(missing); }"),
        ("/p/part.st", "part of lib; f() => hole;"),
    ]);
    let (lib, part) = (fx.source("/p/lib.st"), fx.source("/p/part.st"));
    let element = fx.context.compute_library_element(&lib).unwrap();
    assert!(element.is_launchable());

    assert_eq!(fx.errors("/p/part.st"), vec![T004]);
    assert_eq!(fx.errors("/p/lib.st"), vec![T004]);
    let resolved = fx.context.get_resolved_compilation_unit(&part, &lib).unwrap();
    assert!(resolved.has_unresolved);
    assert_eq!(resolved.library, lib);
    assert_eq!(fx.context.get_libraries_containing(&part), vec![lib.clone()]);

    let err = fx
        .context
        .resolve_compilation_unit(&fx.source("/p/lib.st"), &fx.source("/p/other.st"))
        .unwrap_err();
    assert!(matches!(err, ContextError::Unreadable { .. }), "{err}");
}

#[test]
fn mutually_importing_libraries_see_each_other() {
    let fx = Fixture::new(&[
        ("/p/a.st", "library a; import 'b.st'; class A extends B {}"),
        ("/p/b.st", "library b; import 'a.st'; class B { m() => 1; } f(A a) => a.m();"),
    ]);
    let (a, b) = (fx.source("/p/a.st"), fx.source("/p/b.st"));
    let a_element = fx.context.compute_library_element(&a).unwrap();
    let b_element = fx.context.get_library_element(&b).expect("resolved with its cycle");
    assert!(a_element.referenced_libraries().contains(&b));
    assert!(b_element.referenced_libraries().contains(&a));

    let class_b = fx.context.interner().get("B").unwrap();
    assert!(fx.context.get_public_namespace(&b).unwrap().contains_key(&class_b));
    assert!(fx.errors("/p/a.st").is_empty());
    assert!(fx.errors("/p/b.st").is_empty());
}

// ---------------------------------------------------------------------------
// Invalidation
// ---------------------------------------------------------------------------

#[test]
fn changed_part_invalidates_its_library() {
    let fx = Fixture::new(&[
        ("/p/lib.st", "library lib; part 'a.st'; part 'b.st';"),
        ("/p/a.st", "part of lib;"),
        ("/p/b.st", "part of lib; foo() { return hole; }"),
    ]);
    let (lib, a, b) = (fx.source("/p/lib.st"), fx.source("/p/a.st"), fx.source("/p/b.st"));
    assert_eq!(fx.errors("/p/b.st"), vec![T004]);

    fx.provider.set_content("/p/a.st", "part of lib; int hole;");
    fx.context.apply_changes(&ChangeSet::new().changed(a.clone()));
    assert!(fx.context.get_library_element(&lib).is_none());
    assert!(fx.context.get_resolved_compilation_unit(&b, &lib).is_none());
    assert_eq!(fx.context.get_kind_of(&a), EntryKind::Unknown);

    assert!(fx.errors("/p/b.st").is_empty());
}

#[test]
fn changed_library_invalidates_its_importers() {
    let fx = Fixture::new(&[
        ("/p/util.st", "library util; int helper() => 1;"),
        ("/p/app.st", "library app; import 'util.st'; main() { print(helper()); }"),
        ("/p/top.st", "library top; import 'app.st';"),
    ]);
    let (util, app, top) = (fx.source("/p/util.st"), fx.source("/p/app.st"), fx.source("/p/top.st"));
    fx.context.compute_library_element(&top).unwrap();
    assert!(fx.context.get_library_element(&app).is_some());
    assert!(fx.errors("/p/app.st").is_empty());

    fx.provider.set_content("/p/util.st", "library util;");
    fx.context.apply_changes(&ChangeSet::new().changed(util.clone()));
    for library in [&util, &app, &top] {
        assert!(fx.context.get_library_element(library).is_none(), "{library}");
    }
    assert_eq!(fx.errors("/p/app.st"), vec![T004]);
}

#[test]
fn added_source_invalidates_every_resolution() {
    let fx = Fixture::new(&[("/p/app.st", "library app; import 'later.st'; main() { print(later); }")]);
    let app = fx.source("/p/app.st");
    assert!(fx.errors("/p/app.st").contains(&T004));

    fx.provider.set_content("/p/later.st", "library later; var later = 1;");
    fx.context.apply_changes(&ChangeSet::new().added(fx.source("/p/later.st")));
    assert!(fx.context.get_library_element(&app).is_none());
    assert!(!fx.errors("/p/app.st").contains(&T004));
}

#[test]
fn removed_part_leaves_the_library() {
    let fx = Fixture::new(&[
        ("/p/lib.st", "library lib; part 'gone.st';"),
        ("/p/gone.st", "part of lib; var x;"),
    ]);
    let (lib, gone) = (fx.source("/p/lib.st"), fx.source("/p/gone.st"));
    fx.context.compute_library_element(&lib).unwrap();
    assert_eq!(fx.context.get_libraries_containing(&gone), vec![lib.clone()]);

    fx.provider.remove("/p/gone.st");
    fx.context.apply_changes(&ChangeSet::new().removed(gone.clone()));
    assert!(fx.context.entry_snapshot(&gone).is_none());
    assert_eq!(fx.context.get_kind_of(&gone), EntryKind::Unknown);
    assert!(fx.context.get_library_element(&lib).is_none());

    let element = fx.context.compute_library_element(&lib).unwrap();
    assert!(element.members.is_empty());
    let entry = fx.context.entry_snapshot(&lib).unwrap();
    let parts = entry.as_unit().unwrap().included_parts.value().cloned();
    assert_eq!(parts, Some(vec![lib.clone()]));
}

// ---------------------------------------------------------------------------
// Eviction
// ---------------------------------------------------------------------------

#[test]
fn flushed_entries_recompute_equal_results() {
    let fillers: Vec<(String, String)> = (0..MAX_CACHE_SIZE + 6)
        .map(|i| (format!("/p/f{i}.st"), format!("library f{i};")))
        .collect();
    let mut files: Vec<(&str, &str)> = fillers.iter().map(|(u, t)| (u.as_str(), t.as_str())).collect();
    files.push(("/p/l0.st", "library l0; main() { print(missing); }"));
    let fx = Fixture::new(&files);
    let l0 = fx.source("/p/l0.st");

    let parsed = fx.context.parse_compilation_unit(&l0).unwrap();
    let resolved = fx.context.resolve_compilation_unit(&l0, &l0).unwrap();
    for (uri, _) in &fillers {
        fx.context.parse_compilation_unit(&fx.source(uri)).unwrap();
    }

    let recent = fx.context.recently_used();
    assert_eq!(recent.len(), MAX_CACHE_SIZE);
    assert!(!recent.contains(&l0));
    let entry = fx.context.entry_snapshot(&l0).unwrap();
    let unit = entry.as_unit().unwrap();
    assert_eq!(unit.parsed_unit.state(), CacheState::Flushed);
    assert_eq!(unit.kind(), EntryKind::Library);
    assert_eq!(unit.element.state(), CacheState::Valid);
    assert!(fx.context.get_resolved_compilation_unit(&l0, &l0).is_none());
    assert_eq!(codes(&fx.context.get_errors(&l0).errors), vec![T004]);

    let reparsed = fx.context.parse_compilation_unit(&l0).unwrap();
    assert!(!Arc::ptr_eq(&parsed, &reparsed));
    assert_eq!(*parsed, *reparsed);

    let again = fx.context.resolve_compilation_unit(&l0, &l0).unwrap();
    assert!(!Arc::ptr_eq(&resolved, &again));
    assert_eq!(again.diagnostics, resolved.diagnostics);
    assert_eq!(again.references.len(), resolved.references.len());
    assert_eq!(again.types.len(), resolved.types.len());
}

#[test]
fn eviction_waits_for_a_running_resolution() {
    let count = MAX_CACHE_SIZE + 6;
    let parts: Vec<(String, String)> = (0..count)
        .map(|i| (format!("/p/p{i}.st"), format!("part of big; var x{i};")))
        .collect();
    let directives: String = (0..count).map(|i| format!(" part 'p{i}.st';")).collect();
    let library = format!("library big;{directives}");
    let mut files: Vec<(&str, &str)> = parts.iter().map(|(u, t)| (u.as_str(), t.as_str())).collect();
    files.push(("/p/big.st", library.as_str()));
    let fx = Fixture::new(&files);

    let element = fx.context.compute_library_element(&fx.source("/p/big.st")).unwrap();
    assert_eq!(element.members.len(), count);
    assert_eq!(fx.context.recently_used().len(), MAX_CACHE_SIZE);
    assert!(fx.errors("/p/p0.st").is_empty());
}

// ---------------------------------------------------------------------------
// Background analysis
// ---------------------------------------------------------------------------

#[test]
fn analysis_tasks_run_in_priority_order() {
    let fx = Fixture::new(&[
        ("/p/app.st", "library app; main() {}"),
        ("/p/index.html", r#"<script src="app.st"></script><script src="gone.st"></script>"#),
    ]);
    let (app, page) = (fx.source("/p/app.st"), fx.source("/p/index.html"));

    // Parse the library.
    match fx.context.perform_analysis_task().unwrap() {
        TaskOutcome::Notices(notices) => {
            assert_eq!(notices.len(), 1);
            assert_eq!(notices[0].source, app);
            assert!(notices[0].parsed_unit.is_some());
        }
        other => panic!("expected a parse notice, got {other:?}"),
    }
    // Scan the page.
    assert!(matches!(fx.context.perform_analysis_task().unwrap(), TaskOutcome::MoreWork));
    // Resolve the library.
    match fx.context.perform_analysis_task().unwrap() {
        TaskOutcome::Notices(notices) => {
            let notice = notices.iter().find(|n| n.source == app).unwrap();
            assert!(notice.resolved_unit.is_some());
            assert!(notice.errors.is_empty());
        }
        other => panic!("expected resolution notices, got {other:?}"),
    }
    // Resolve the page.
    match fx.context.perform_analysis_task().unwrap() {
        TaskOutcome::Notices(notices) => {
            assert_eq!(notices.len(), 1);
            assert_eq!(codes(&notices[0].errors), vec![I003]);
            assert_eq!(notices[0].html.as_ref().unwrap().libraries, vec![app.clone()]);
        }
        other => panic!("expected an html notice, got {other:?}"),
    }
    assert!(drain(&fx.context).is_empty());
    assert!(matches!(fx.context.perform_analysis_task().unwrap(), TaskOutcome::Idle));

    assert!(fx.context.is_server_library(&app));
    assert!(!fx.context.is_client_library(&app));
    assert_eq!(fx.context.get_launchable_server_libraries(), vec![app.clone()]);
    assert_eq!(fx.context.get_html_sources(), vec![page.clone()]);
}

#[test]
fn libraries_reaching_the_browser_are_clients() {
    let fx = Fixture::new(&[
        ("/p/ui.st", "library ui; import 'std:html'; show() => document;"),
        ("/p/client.st", "library client; import 'ui.st'; main() {}"),
        ("/p/server.st", "library server; import 'std:io'; main() { stdout.write(1); }"),
    ]);
    let (client, server) = (fx.source("/p/client.st"), fx.source("/p/server.st"));
    drain(&fx.context);

    assert!(fx.context.is_client_library(&client));
    assert!(fx.context.is_server_library(&server));
    assert!(!fx.context.is_client_library(&fx.source("/p/ui.st")));
    assert_eq!(fx.context.get_launchable_client_libraries(), vec![client]);
    assert_eq!(fx.context.get_launchable_server_libraries(), vec![server]);
}

#[test]
fn html_files_are_found_through_parts() {
    let fx = Fixture::new(&[
        ("/web/app.st", "library app; part 'view.st'; main() {}"),
        ("/web/view.st", "part of app;"),
        ("/web/index.html", r#"<script src="app.st"></script>"#),
    ]);
    let (app, view, page) = (
        fx.source("/web/app.st"),
        fx.source("/web/view.st"),
        fx.source("/web/index.html"),
    );
    fx.context.parse_html_unit(&page).unwrap();
    fx.context.parse_compilation_unit(&app).unwrap();
    assert_eq!(fx.context.get_html_files_referencing(&view), vec![page.clone()]);
    assert_eq!(fx.context.get_html_files_referencing(&app), vec![page.clone()]);
    assert!(fx.context.compute_errors(&page).unwrap().is_empty());

    fx.context.apply_changes(&ChangeSet::new().changed(page.clone()));
    assert!(fx.context.get_html_files_referencing(&view).is_empty());
}

#[test]
fn foreground_and_background_calls_interleave() {
    let files: Vec<(String, String)> = (0..8)
        .map(|i| {
            let import = if i > 0 { format!("import 'l{}.st';", i - 1) } else { String::new() };
            (format!("/p/l{i}.st"), format!("library l{i}; {import} var v{i} = 1;"))
        })
        .collect();
    let refs: Vec<(&str, &str)> = files.iter().map(|(u, t)| (u.as_str(), t.as_str())).collect();
    let fx = Fixture::new(&refs);
    let sources: Vec<Source> = files.iter().map(|(u, _)| fx.source(u)).collect();

    std::thread::scope(|scope| {
        scope.spawn(|| drain(&fx.context));
        scope.spawn(|| {
            for source in sources.iter().rev() {
                assert!(fx.context.compute_errors(source).unwrap().is_empty());
            }
        });
    });
    drain(&fx.context);
    for source in &sources {
        assert!(fx.context.get_library_element(source).is_some(), "{source}");
    }
}

// ---------------------------------------------------------------------------
// Cancellation and failures
// ---------------------------------------------------------------------------

#[test]
fn cancelled_resolution_commits_nothing() {
    let provider = Arc::new(MemorySourceProvider::new());
    provider.set_content("/p/app.st", "library app; main() {}");
    let factory = Arc::new(SourceFactory::new(provider, SystemLibraries::embedded()));
    let token = CancellationToken::new();
    let context = AnalysisContext::new(factory).with_cancellation(token.clone());
    let app = context.factory().for_uri("/p/app.st");

    token.cancel();
    let err = context.compute_library_element(&app).unwrap_err();
    assert!(matches!(err, ContextError::Cancelled), "{err}");
    let entry = context.entry_snapshot(&app).unwrap();
    assert_eq!(entry.as_unit().unwrap().element.state(), CacheState::Invalid);
    assert!(matches!(context.perform_analysis_task(), Err(ContextError::Cancelled)));

    token.reset();
    assert!(context.compute_library_element(&app).is_ok());
}

#[test]
fn missing_core_library_is_an_internal_error() {
    let sdk = tempfile::tempdir().unwrap();
    let fx = Fixture::with_system(
        &[("/p/app.st", "library app; main() {}")],
        SystemLibraries::with_sdk(sdk.path()),
    );
    let app = fx.source("/p/app.st");
    match fx.context.compute_library_element(&app) {
        Err(ContextError::Internal(err)) => {
            assert!(err.to_string().contains("Could not resolve std:core"), "{err}");
        }
        other => panic!("expected an internal error, got {other:?}"),
    }

    drain(&fx.context);
    let entry = fx.context.entry_snapshot(&app).unwrap();
    assert_eq!(entry.as_unit().unwrap().element.state(), CacheState::Error);
}

// ---------------------------------------------------------------------------
// Transfer
// ---------------------------------------------------------------------------

#[test]
fn snapshots_seed_a_context_sharing_the_interner() {
    let fx = Fixture::new(&[("/p/app.st", "library app; main() {}")]);
    let app = fx.source("/p/app.st");
    fx.context.compute_library_element(&app).unwrap();

    let seeded = AnalysisContext::with_interner(
        Arc::clone(fx.context.factory()),
        Arc::clone(fx.context.interner()),
    );
    let snapshot = fx.context.snapshot();
    assert!(snapshot.sources().any(|s| *s == app));
    assert_eq!(seeded.import_snapshot(snapshot.clone()).unwrap(), snapshot.len());
    assert!(seeded.get_library_element(&app).is_some());
    assert_eq!(seeded.import_snapshot(snapshot.clone()).unwrap(), 0);

    let stranger = AnalysisContext::new(Arc::clone(fx.context.factory()));
    assert!(matches!(stranger.import_snapshot(snapshot), Err(ContextError::Internal(_))));
}
