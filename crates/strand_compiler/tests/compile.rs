//! End-to-end compiles of in-memory applications.
//!
//! Sources live in a memory provider with a logical clock and artifacts in a
//! memory store with a write log, so each test can edit a file, compile
//! again and observe exactly which units were re-analyzed.

use std::sync::Arc;

use strand_cache::{
    ArtifactProvider, CacheError, MemoryArtifactStore, DEPS_EXT, LOG_EXT, TIMESTAMP_EXT,
};
use strand_compiler::errors::{C001, D001, D002, D003, D007, D008, D009, I001};
use strand_compiler::{
    CompileError, CompileResult, CompileStatus, Compiler, RecordingListener, SelectiveCache,
};
use strand_config::{CompilerOptions, ExitCodeMode};
use strand_diagnostics::{DiagnosticCode, DiagnosticSink};
use strand_resolver::errors::{R001, T004};
use strand_resolver::CancellationToken;
use strand_source::{MemorySourceProvider, Source, SourceFactory, SystemLibraries};
use strand_syntax::{parse_unit, ParseMode};

const MAIN: &str = "/p/main.st";

// ---------------------------------------------------------------------------
// Helper: a compiler over memory collaborators
// ---------------------------------------------------------------------------

struct Fixture {
    provider: Arc<MemorySourceProvider>,
    artifacts: Arc<MemoryArtifactStore>,
    compiler: Compiler,
}

impl Fixture {
    fn new(files: &[(&str, &str)]) -> Self {
        Self::with_options(
            files,
            CompilerOptions {
                incremental: true,
                ..CompilerOptions::default()
            },
        )
    }

    fn with_options(files: &[(&str, &str)], options: CompilerOptions) -> Self {
        let provider = Arc::new(MemorySourceProvider::new());
        for (uri, text) in files {
            provider.set_content(uri, *text);
        }
        let artifacts = Arc::new(MemoryArtifactStore::new());
        let factory = SourceFactory::new(provider.clone(), SystemLibraries::embedded());
        let compiler = Compiler::new(options, Arc::new(factory), artifacts.clone());
        Self {
            provider,
            artifacts,
            compiler,
        }
    }

    fn source(&self, uri: &str) -> Source {
        self.compiler.factory().for_uri(uri)
    }

    fn compile(&self) -> (CompileResult, RecordingListener) {
        self.artifacts.clear_write_log();
        let mut listener = RecordingListener::new();
        let app = self.source(MAIN);
        let result = self
            .compiler
            .compile(&app, &mut listener)
            .expect("compile should run");
        (result, listener)
    }

    fn wrote_timestamp(&self, unit: &str) -> bool {
        self.artifacts.did_write(MAIN, unit, TIMESTAMP_EXT)
    }
}

fn codes(listener: &RecordingListener) -> Vec<DiagnosticCode> {
    listener.diagnostics().iter().map(|d| d.code).collect()
}

fn count(listener: &RecordingListener, code: DiagnosticCode) -> usize {
    codes(listener).iter().filter(|c| **c == code).count()
}

// ---------------------------------------------------------------------------
// Incremental re-analysis
// ---------------------------------------------------------------------------

#[test]
fn unchanged_library_writes_nothing_the_second_time() {
    let fx = Fixture::new(&[
        (MAIN, "library main;\npart 'a.st';\npart 'b.st';\nfoo() => 1;"),
        ("/p/a.st", "part of main;\nint a;"),
        ("/p/b.st", "part of main;\nbar() { return missing; }"),
    ]);
    let (first, rec1) = fx.compile();
    assert_eq!(codes(&rec1), vec![T004]);
    assert!(fx.wrote_timestamp(MAIN));
    assert!(fx.wrote_timestamp("a.st"));
    assert!(!fx.wrote_timestamp("b.st"), "a unit with problems is not stamped");

    let (second, rec2) = fx.compile();
    assert_eq!(codes(&rec2), codes(&rec1));
    assert_eq!(rec2.diagnostics()[0].message, rec1.diagnostics()[0].message);
    assert_eq!(fx.artifacts.write_count(TIMESTAMP_EXT), 0);
    assert_eq!(first.type_error_count, second.type_error_count);
    assert!(second.files_changed, "b.st has problems and is analyzed again");
    assert!(rec2.was_fully_compiled(&fx.source("/p/b.st")));
    assert!(!rec2.was_fully_compiled(&fx.source("/p/a.st")));
}

#[test]
fn core_names_are_not_top_level_changes() {
    let fx = Fixture::new(&[
        (MAIN, "library main;
part 'a.st';
int total;"),
        ("/p/a.st", "part of main;
int a;
report() { return total; }"),
    ]);
    let (_, rec) = fx.compile();
    assert!(rec.diagnostics().is_empty(), "{:?}", rec.diagnostics());
    assert!(fx.wrote_timestamp("a.st"));

    let (result, rec) = fx.compile();
    assert!(rec.diagnostics().is_empty(), "{:?}", rec.diagnostics());
    assert_eq!(fx.artifacts.write_count(TIMESTAMP_EXT), 0);
    assert!(!result.files_changed);
    assert!(!fx.artifacts.did_write(MAIN, "main.st", LOG_EXT));
    assert!(rec
        .compiled()
        .iter()
        .filter(|(s, _)| !s.is_system())
        .all(|(_, diet)| *diet));
}

#[test]
fn new_declaration_fills_hole_in_sibling_part() {
    let fx = Fixture::new(&[
        (MAIN, "library main;\npart 'a.st';\npart 'b.st';"),
        ("/p/a.st", "part of main;"),
        ("/p/b.st", "part of main;\nfoo() { return hole; }"),
    ]);
    let (_, rec) = fx.compile();
    assert_eq!(codes(&rec), vec![T004]);
    assert!(rec.diagnostics()[0].message.contains("hole"));

    fx.provider.set_content("/p/a.st", "part of main;\nint hole;");
    let (result, rec) = fx.compile();
    assert!(rec.diagnostics().is_empty(), "{:?}", rec.diagnostics());
    assert!(fx.wrote_timestamp("a.st"));
    assert!(fx.wrote_timestamp("b.st"));
    assert!(rec.was_fully_compiled(&fx.source("/p/b.st")));
    assert!(result.files_changed);
}

#[test]
fn qualified_access_is_not_affected_by_new_top_level_name() {
    let fx = Fixture::new(&[
        (MAIN, "library main;\npart 'a.st';\npart 'c.st';\nclass Base { var not_hole; }"),
        ("/p/a.st", "part of main;"),
        (
            "/p/c.st",
            "part of main;\nclass C extends Base {\n  foo() { return super.not_hole; }\n}",
        ),
    ]);
    let (_, rec) = fx.compile();
    assert!(rec.diagnostics().is_empty(), "{:?}", rec.diagnostics());
    assert!(fx.wrote_timestamp("c.st"));

    fx.provider.set_content("/p/a.st", "part of main;\nvar not_hole;");
    let (result, rec) = fx.compile();
    assert!(rec.diagnostics().is_empty(), "{:?}", rec.diagnostics());
    let c = fx.source("/p/c.st");
    assert!(!rec.was_fully_compiled(&c));
    assert!(rec.compiled().contains(&(c, true)));
    assert!(fx.wrote_timestamp("a.st"));
    assert!(!fx.wrote_timestamp("c.st"));
    assert!(result.files_changed);
}

#[test]
fn shadowing_an_imported_name_reanalyzes_users() {
    let fx = Fixture::new(&[
        (MAIN, "library main;\nimport 'util.st';\npart 'a.st';\npart 'b.st';"),
        ("/p/util.st", "library util;\nint value;"),
        ("/p/a.st", "part of main;"),
        ("/p/b.st", "part of main;\nfoo() { return value; }"),
    ]);
    let (_, rec) = fx.compile();
    assert!(rec.diagnostics().is_empty(), "{:?}", rec.diagnostics());

    fx.provider.set_content("/p/a.st", "part of main;\nint value;");
    let (_, rec) = fx.compile();
    assert!(rec.diagnostics().is_empty(), "{:?}", rec.diagnostics());
    assert!(rec.was_fully_compiled(&fx.source("/p/b.st")));
    assert!(fx.wrote_timestamp("b.st"));
}

#[test]
fn changed_superclass_unit_reanalyzes_subclass() {
    let fx = Fixture::new(&[
        (MAIN, "library main;\npart 'base.st';\npart 'c.st';"),
        ("/p/base.st", "part of main;\nclass Base { var x; }"),
        ("/p/c.st", "part of main;\nclass C extends Base {}"),
    ]);
    let (_, rec) = fx.compile();
    assert!(rec.diagnostics().is_empty(), "{:?}", rec.diagnostics());

    fx.provider
        .set_content("/p/base.st", "part of main;\nclass Base { var y; }");
    let (result, rec) = fx.compile();
    assert!(result.files_changed);
    assert!(rec.was_fully_compiled(&fx.source("/p/base.st")));
    assert!(rec.was_fully_compiled(&fx.source("/p/c.st")));
    assert!(!rec.was_fully_compiled(&fx.source(MAIN)));
}

#[test]
fn removing_a_part_counts_as_a_change() {
    let fx = Fixture::new(&[
        (MAIN, "library main;\npart 'a.st';\npart 'b.st';"),
        ("/p/a.st", "part of main;\nuse() { return gone; }"),
        ("/p/b.st", "part of main;\nint gone;"),
    ]);
    let (_, rec) = fx.compile();
    assert!(rec.diagnostics().is_empty(), "{:?}", rec.diagnostics());

    fx.provider.set_content(MAIN, "library main;\npart 'a.st';");
    let (result, rec) = fx.compile();
    assert!(result.files_changed);
    assert!(rec.was_fully_compiled(&fx.source("/p/a.st")));
    assert_eq!(codes(&rec), vec![T004]);
}

#[test]
fn diet_units_are_bracketed_once() {
    let fx = Fixture::new(&[
        (MAIN, "library main;\npart 'a.st';"),
        ("/p/a.st", "part of main;\nint a;"),
    ]);
    fx.compile();
    let (_, rec) = fx.compile();
    let user: Vec<_> = rec
        .compiled()
        .into_iter()
        .filter(|(s, _)| !s.is_system())
        .collect();
    assert_eq!(user.len(), 2);
    assert!(user.iter().all(|(_, diet)| *diet));
}

#[test]
fn system_libraries_are_never_persisted() {
    let fx = Fixture::new(&[(MAIN, "library main;\nimport 'std:io';")]);
    fx.compile();
    assert!(fx
        .artifacts
        .writes()
        .iter()
        .all(|key| !key.library.starts_with("std:")));
}

// ---------------------------------------------------------------------------
// Reported problems
// ---------------------------------------------------------------------------

#[test]
fn duplicate_declarations_in_sibling_parts() {
    let fx = Fixture::new(&[
        (MAIN, "library main;\npart 'a.st';\npart 'b.st';"),
        ("/p/a.st", "part of main;\nvar conflict;"),
        ("/p/b.st", "part of main;\nvar conflict;"),
    ]);
    let (result, rec) = fx.compile();
    let files: Vec<_> = rec
        .diagnostics()
        .iter()
        .filter(|d| d.code == R001)
        .map(|d| d.primary_span.file)
        .collect();
    assert_eq!(files.len(), 2);
    assert!(files.contains(&fx.source("/p/a.st").file()));
    assert!(files.contains(&fx.source("/p/b.st").file()));
    assert_eq!(result.status, CompileStatus::Errors);
    assert_eq!(result.exit_code(ExitCodeMode::Extended), 2);
    assert_eq!(result.exit_code(ExitCodeMode::Collapse), 1);
}

#[test]
fn console_and_browser_reported_once_at_second_import() {
    for text in [
        "library main;\nimport 'std:io';\nimport 'std:html';",
        "library main;\nimport 'std:html';\nimport 'std:io';",
    ] {
        let fx = Fixture::new(&[(MAIN, text)]);
        let (_, rec) = fx.compile();
        let found: Vec<_> = rec.diagnostics().into_iter().filter(|d| d.code == D002).collect();
        assert_eq!(found.len(), 1, "{text}");
        let second = text.rfind("import").unwrap();
        assert_eq!(found[0].primary_span.start as usize, second, "{text}");
    }
}

#[test]
fn part_directive_shapes() {
    let fx = Fixture::new(&[
        (
            MAIN,
            "library main;\npart 'none.st';\npart 'wrong.st';\npart 'extra.st';",
        ),
        ("/p/none.st", "int x;"),
        ("/p/wrong.st", "part of other;"),
        ("/p/extra.st", "part of main;\nimport 'std:core';"),
    ]);
    let (_, rec) = fx.compile();
    assert_eq!(count(&rec, D007), 1);
    assert_eq!(count(&rec, D009), 1);
    assert_eq!(count(&rec, D008), 1);
    assert!(!fx.wrote_timestamp("none.st"));
    assert!(!fx.wrote_timestamp("wrong.st"));
}

#[test]
fn duplicate_part_reported_once() {
    let fx = Fixture::new(&[
        (MAIN, "library main;\npart 'a.st';\npart 'a.st';"),
        ("/p/a.st", "part of main;\nint a;"),
    ]);
    let (_, rec) = fx.compile();
    assert_eq!(count(&rec, D001), 1);
    assert_eq!(count(&rec, R001), 0);
    let text = "library main;\npart 'a.st';\npart 'a.st';";
    let d = rec.diagnostics().into_iter().find(|d| d.code == D001).unwrap();
    assert_eq!(d.primary_span.start as usize, text.rfind("part").unwrap());
}

#[test]
fn missing_import_reported_once_and_native_skipped() {
    let fx = Fixture::new(&[(
        MAIN,
        "library main;\nimport 'gone.st';\nimport 'native-ext:gl';",
    )]);
    for _ in 0..2 {
        let (result, rec) = fx.compile();
        assert_eq!(codes(&rec), vec![I001]);
        assert!(rec.diagnostics()[0].message.contains("gone.st"));
        assert_eq!(result.status, CompileStatus::Errors);
    }
}

#[test]
fn missing_root_is_reported() {
    let fx = Fixture::new(&[]);
    let (result, rec) = fx.compile();
    assert_eq!(codes(&rec), vec![I001]);
    assert_eq!(result.status, CompileStatus::Errors);
}

#[test]
fn parse_errors_stop_before_resolution() {
    let fx = Fixture::new(&[
        (MAIN, "library main;\npart 'a.st';"),
        ("/p/a.st", "part of main;\nfoo( {"),
    ]);
    let (result, rec) = fx.compile();
    assert!(result.error_count > 0);
    assert!(rec
        .diagnostics()
        .iter()
        .all(|d| d.code.category == strand_diagnostics::Category::Syntax));
    assert_eq!(fx.artifacts.write_count(TIMESTAMP_EXT), 0);
    let about: usize = rec
        .events
        .iter()
        .filter(|e| matches!(e, strand_compiler::ListenerEvent::AboutToCompile { .. }))
        .count();
    assert_eq!(about, rec.compiled().len());
}

#[test]
fn warnings_status_and_fatal_warnings() {
    let files = [(MAIN, "library main;\nimport 'std:mirrors';")];
    let fx = Fixture::new(&files);
    let (result, rec) = fx.compile();
    assert_eq!(codes(&rec), vec![D003]);
    assert_eq!(result.status, CompileStatus::Warnings);
    assert_eq!(result.exit_code(ExitCodeMode::Extended), 1);
    assert_eq!(result.exit_code(ExitCodeMode::Collapse), 0);

    let fx = Fixture::with_options(
        &files,
        CompilerOptions {
            warnings_are_fatal: true,
            ..CompilerOptions::default()
        },
    );
    let (result, _) = fx.compile();
    assert_eq!(result.status, CompileStatus::Errors);
    assert_eq!(
        result.message.as_deref(),
        Some("Compilation failed with 1 problem.")
    );
}

#[test]
fn type_errors_fatal_only_when_configured() {
    let files = [(MAIN, "library main;\nfoo() { return nothing; }")];
    let (result, _) = Fixture::new(&files).compile();
    assert_eq!(result.type_error_count, 1);
    assert_eq!(result.status, CompileStatus::Ok);

    let fx = Fixture::with_options(
        &files,
        CompilerOptions {
            type_errors_are_fatal: true,
            ..CompilerOptions::default()
        },
    );
    let (result, _) = fx.compile();
    assert_eq!(result.status, CompileStatus::Errors);
}

#[test]
fn check_log_written_when_files_changed() {
    let fx = Fixture::new(&[(MAIN, "library main;\nint total;")]);
    fx.compile();
    assert!(fx.artifacts.did_write(MAIN, "main.st", LOG_EXT));
    fx.compile();
    assert!(!fx.artifacts.did_write(MAIN, "main.st", LOG_EXT));

    fx.provider.set_content(MAIN, "library main;\nint total;\nsum() => total;");
    let (result, _) = fx.compile();
    assert!(result.files_changed);
    assert!(fx.artifacts.did_write(MAIN, "main.st", LOG_EXT));
}

#[test]
fn unit_with_problems_rewrites_check_log() {
    let fx = Fixture::new(&[(MAIN, "library main;\nfoo() { return nothing; }")]);
    fx.compile();
    let (result, _) = fx.compile();
    assert!(result.files_changed);
    assert!(fx.artifacts.did_write(MAIN, "main.st", LOG_EXT));
}

/// Stores everything except dependency records.
struct NoDepsStore(MemoryArtifactStore);

impl ArtifactProvider for NoDepsStore {
    fn read(&self, source: &Source, part: &str, ext: &str) -> Option<Vec<u8>> {
        self.0.read(source, part, ext)
    }

    fn write(&self, source: &Source, part: &str, ext: &str, data: &[u8]) -> Result<(), CacheError> {
        if ext == DEPS_EXT {
            return Err(CacheError::Write {
                path: part.into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        self.0.write(source, part, ext, data)
    }
}

#[test]
fn no_timestamps_without_dependency_record() {
    let provider = Arc::new(MemorySourceProvider::new());
    provider.set_content(MAIN, "library main;\npart 'a.st';");
    provider.set_content("/p/a.st", "part of main;\nint a;");
    let store = Arc::new(NoDepsStore(MemoryArtifactStore::new()));
    let factory = SourceFactory::new(provider, SystemLibraries::embedded());
    let compiler = Compiler::new(
        CompilerOptions {
            incremental: true,
            ..CompilerOptions::default()
        },
        Arc::new(factory),
        store.clone(),
    );
    let app = compiler.factory().for_uri(MAIN);
    let mut rec = RecordingListener::new();
    let result = compiler.compile(&app, &mut rec).unwrap();
    assert_eq!(codes(&rec), vec![C001]);
    assert_eq!(result.status, CompileStatus::Errors);
    assert_eq!(store.0.write_count(TIMESTAMP_EXT), 0);

    let mut rec = RecordingListener::new();
    compiler.compile(&app, &mut rec).unwrap();
    assert!(rec.was_fully_compiled(&compiler.factory().for_uri("/p/a.st")));
}

// ---------------------------------------------------------------------------
// Selective analysis and failure modes
// ---------------------------------------------------------------------------

#[test]
fn analyze_library_uses_supplied_units() {
    let fx = Fixture::new(&[(MAIN, "library main;\nint saved;")]);
    let main = fx.source(MAIN);
    let sink = DiagnosticSink::new();
    let edited = Arc::new(parse_unit(
        "library main;\nint edited;\nint other;",
        main.file(),
        ParseMode::Full,
        fx.compiler.interner(),
        &sink,
    ));
    let mut cache = SelectiveCache::default();
    cache.parsed_units.insert(main.clone(), Arc::clone(&edited));
    let mut rec = RecordingListener::new();
    let library = fx
        .compiler
        .analyze_library(&main, &cache, &mut rec)
        .expect("analysis should run")
        .expect("library should resolve");
    assert!(Arc::ptr_eq(&library.units[0].unit, &edited));
    assert_eq!(library.element.members.len(), 2);
    assert!(fx.artifacts.writes().is_empty());
}

#[test]
fn analyze_library_skips_resolved_libraries() {
    let fx = Fixture::new(&[
        (MAIN, "library main;\nimport 'util.st';\nint x;"),
        ("/p/util.st", "library util;\nint y;"),
    ]);
    let main = fx.source(MAIN);
    let util = fx.source("/p/util.st");
    let mut rec = RecordingListener::new();
    let first = fx
        .compiler
        .analyze_library(&util, &SelectiveCache::default(), &mut rec)
        .unwrap()
        .unwrap();
    let mut cache = SelectiveCache::default();
    cache
        .resolved_libraries
        .insert(util.clone(), Arc::clone(&first.element));
    rec.clear();
    let library = fx
        .compiler
        .analyze_library(&main, &cache, &mut rec)
        .unwrap()
        .unwrap();
    assert_eq!(library.source(), &main);
    assert!(!rec.compiled().iter().any(|(s, _)| *s == util));
}

#[test]
fn cancelled_compile_returns_error() {
    let provider = Arc::new(MemorySourceProvider::new());
    provider.set_content(MAIN, "library main;");
    let factory = SourceFactory::new(provider, SystemLibraries::embedded());
    let token = CancellationToken::new();
    let compiler = Compiler::new(
        CompilerOptions::default(),
        Arc::new(factory),
        Arc::new(MemoryArtifactStore::new()),
    )
    .with_cancellation(token.clone());
    token.cancel();
    let app = compiler.factory().for_uri(MAIN);
    let err = compiler.compile(&app, &mut RecordingListener::new()).unwrap_err();
    assert!(matches!(err, CompileError::Cancelled));

    token.reset();
    assert!(compiler.compile(&app, &mut RecordingListener::new()).is_ok());
}

#[test]
fn missing_core_is_an_internal_error() {
    let sdk = tempfile::tempdir().unwrap();
    let provider = Arc::new(MemorySourceProvider::new());
    provider.set_content(MAIN, "library main;");
    let factory = SourceFactory::new(provider, SystemLibraries::with_sdk(sdk.path()));
    let compiler = Compiler::new(
        CompilerOptions::default(),
        Arc::new(factory),
        Arc::new(MemoryArtifactStore::new()),
    );
    let app = compiler.factory().for_uri(MAIN);
    let err = compiler.compile(&app, &mut RecordingListener::new()).unwrap_err();
    assert!(matches!(err, CompileError::Internal(_)));
    assert!(err.to_string().contains("std:core"));
}
