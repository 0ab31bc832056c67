//! End-to-end resolution of in-memory libraries.
//!
//! A small host parses libraries from a memory provider, maps directives to
//! sources and hands the models to the resolver.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use strand_common::Interner;
use strand_diagnostics::{DiagnosticCode, DiagnosticSink};
use strand_resolver::errors;
use strand_resolver::{
    ConstValue, ExportModel, ImportModel, LibraryElement, LibraryModel, LibraryResolver,
    ResolutionStage, ResolveError, ResolveOutput, ResolverHost, UnitDependency, UnitModel,
};
use strand_source::{MemorySourceProvider, Source, SourceFactory, SystemLibraries, UriResolution};
use strand_syntax::ast::Directive;
use strand_syntax::{parse_unit, ParseMode};

// ---------------------------------------------------------------------------
// Helper: an in-memory host
// ---------------------------------------------------------------------------

struct TestHost {
    factory: SourceFactory,
    interner: Arc<Interner>,
    resolved: HashMap<Source, Arc<LibraryElement>>,
    hide_core: bool,
    cancel_after: Option<usize>,
    polls: AtomicUsize,
}

impl TestHost {
    fn new(files: &[(&str, &str)]) -> Self {
        let provider = Arc::new(MemorySourceProvider::new());
        for (uri, text) in files {
            provider.set_content(uri, *text);
        }
        Self {
            factory: SourceFactory::new(provider, SystemLibraries::embedded()),
            interner: Arc::new(Interner::new()),
            resolved: HashMap::new(),
            hide_core: false,
            cancel_after: None,
            polls: AtomicUsize::new(0),
        }
    }

    fn source(&self, uri: &str) -> Source {
        self.factory.for_uri(uri)
    }

    fn target(&self, base: &Source, uri: &str) -> Option<Source> {
        match self.factory.resolve_uri(Some(base), uri) {
            UriResolution::Source(source) => Some(source),
            _ => None,
        }
    }

    fn parse(&self, source: &Source) -> Option<Arc<strand_syntax::CompilationUnit>> {
        let text = self.factory.contents(source).ok()?;
        let sink = DiagnosticSink::new();
        let unit = parse_unit(&text, source.file(), ParseMode::Full, &self.interner, &sink);
        assert!(!sink.has_errors(), "{source}: {:?}", sink.diagnostics());
        Some(Arc::new(unit))
    }

    fn resolve(&mut self, uri: &str) -> Result<ResolveOutput, ResolveError> {
        let target = self.source(uri);
        let mut resolver = LibraryResolver::new(Arc::clone(&self.interner), self.factory.core_source());
        resolver.resolve(&target, self)
    }

    fn resolve_ok(&mut self, uri: &str) -> ResolveOutput {
        match self.resolve(uri) {
            Ok(output) => output,
            Err(err) => panic!("resolution failed: {err}"),
        }
    }
}

impl ResolverHost for TestHost {
    fn library_model(&mut self, library: &Source) -> Option<Arc<LibraryModel>> {
        if self.hide_core && library.is_system() {
            return None;
        }
        let unit = self.parse(library)?;
        let mut units = vec![UnitModel {
            name: library.uri().to_string(),
            source: library.clone(),
            unit: Arc::clone(&unit),
        }];
        let mut imports = Vec::new();
        let mut exports = Vec::new();
        for directive in &unit.directives {
            match directive {
                Directive::Import(d) => imports.push(ImportModel {
                    target: self.target(library, &d.uri.value),
                    prefix: d.prefix,
                    combinators: d.combinators.clone(),
                    span: d.span,
                    implicit: false,
                }),
                Directive::Export(d) => exports.push(ExportModel {
                    target: self.target(library, &d.uri.value),
                    combinators: d.combinators.clone(),
                    span: d.span,
                }),
                Directive::Part(d) => {
                    let Some(source) = self.target(library, &d.uri.value) else {
                        continue;
                    };
                    if let Some(part) = self.parse(&source) {
                        units.push(UnitModel {
                            name: d.uri.value.clone(),
                            source,
                            unit: part,
                        });
                    }
                }
                Directive::Library(_) | Directive::PartOf(_) => {}
            }
        }
        Some(Arc::new(LibraryModel {
            source: library.clone(),
            name: unit.library_directive().map(|l| l.name.text.clone()),
            units,
            imports,
            exports,
        }))
    }

    fn resolved_library(&mut self, library: &Source) -> Option<Arc<LibraryElement>> {
        self.resolved.get(library).cloned()
    }

    fn is_cancelled(&self) -> bool {
        let polls = self.polls.fetch_add(1, Ordering::SeqCst);
        self.cancel_after.is_some_and(|limit| polls >= limit)
    }
}

fn codes(output: &ResolveOutput, library: &Source) -> Vec<DiagnosticCode> {
    output
        .library(library)
        .map(|l| {
            l.units
                .iter()
                .flat_map(|u| u.diagnostics.iter().map(|d| d.code))
                .collect()
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Cycles and namespaces
// ---------------------------------------------------------------------------

#[test]
fn mutual_imports_resolve_as_one_cycle() {
    let mut host = TestHost::new(&[
        ("a.st", "import 'b.st'; class A extends B {}"),
        ("b.st", "import 'a.st'; class B { m() => 1; } f(A a) => a.m();"),
    ]);
    let output = host.resolve_ok("a.st");
    let (a, b) = (host.source("a.st"), host.source("b.st"));
    assert_eq!(output.cycle, vec![a.clone(), b.clone()]);
    assert!(codes(&output, &a).is_empty(), "{:?}", codes(&output, &a));
    assert!(codes(&output, &b).is_empty(), "{:?}", codes(&output, &b));
    assert!(output.library(&host.factory.core_source()).is_some());
    let b_unit = &output.library(&b).unwrap().units[0];
    assert!(b_unit.dependencies.iter().any(|d| d.unit == a));
}

#[test]
fn ambiguous_name_reported_only_when_used() {
    let files = [("x.st", "var shared = 1;"), ("y.st", "var shared = 2;")];
    let mut host = TestHost::new(&[
        files[0],
        files[1],
        ("app.st", "import 'x.st'; import 'y.st'; main() {}"),
    ]);
    let output = host.resolve_ok("app.st");
    assert!(codes(&output, &host.source("app.st")).is_empty());

    let mut host = TestHost::new(&[
        files[0],
        files[1],
        ("app.st", "import 'x.st'; import 'y.st'; main() { print(shared); }"),
    ]);
    let output = host.resolve_ok("app.st");
    assert_eq!(codes(&output, &host.source("app.st")), vec![errors::R007]);
}

#[test]
fn hide_resolves_ambiguity() {
    let mut host = TestHost::new(&[
        ("x.st", "var shared = 1;"),
        ("y.st", "var shared = 2;"),
        ("app.st", "import 'x.st'; import 'y.st' hide shared; main() { print(shared); }"),
    ]);
    let output = host.resolve_ok("app.st");
    assert!(codes(&output, &host.source("app.st")).is_empty());
}

#[test]
fn private_names_are_not_imported() {
    let mut host = TestHost::new(&[
        ("lib.st", "var _secret = 1;"),
        ("app.st", "import 'lib.st'; main() { print(_secret); }"),
    ]);
    let output = host.resolve_ok("app.st");
    assert_eq!(codes(&output, &host.source("app.st")), vec![errors::R002]);
}

#[test]
fn prefixed_and_exported_names() {
    let mut host = TestHost::new(&[
        ("base.st", "class Widget {}"),
        ("ui.st", "export 'base.st';"),
        ("app.st", "import 'ui.st' as ui; ui.Widget w; main() { print(ui.missing); }"),
    ]);
    let output = host.resolve_ok("app.st");
    let app = output.library(&host.source("app.st")).unwrap();
    assert_eq!(app.units[0].diagnostics.len(), 1);
    assert_eq!(app.units[0].diagnostics[0].code, errors::T004);
    // A missing prefixed name does not invalidate on every top-level change.
    assert!(!app.units[0].has_unresolved);
}

#[test]
fn unresolved_identifier_is_recorded() {
    let mut host = TestHost::new(&[("app.st", "main() { print(nowhere); }")]);
    let output = host.resolve_ok("app.st");
    let unit = &output.library(&host.source("app.st")).unwrap().units[0];
    assert_eq!(unit.diagnostics[0].code, errors::T004);
    assert!(unit.has_unresolved);
}

// ---------------------------------------------------------------------------
// Types and narrowing
// ---------------------------------------------------------------------------

const HIERARCHY: &str = "class A {} class B extends A { foo() {} }";

fn member_codes(body: &str) -> Vec<DiagnosticCode> {
    let text = format!("{HIERARCHY} {body}");
    let mut host = TestHost::new(&[("app.st", text.as_str())]);
    let output = host.resolve_ok("app.st");
    codes(&output, &host.source("app.st"))
}

#[test]
fn is_check_narrows_in_then_branch() {
    assert!(member_codes("t(A a) { if (a is B) { a.foo(); } }").is_empty());
    assert_eq!(member_codes("t(A a) { a.foo(); }"), vec![errors::T003]);
}

#[test]
fn negated_check_with_early_exit_narrows_after() {
    assert!(member_codes("t(A a) { if (a is! B) return; a.foo(); }").is_empty());
    assert!(member_codes("t(A a) { if (a is! B) { print(a); } else { a.foo(); } }").is_empty());
}

#[test]
fn conjunction_narrows_right_operand() {
    assert!(member_codes("t(A a) { print(a is B && a.foo() == null); }").is_empty());
}

#[test]
fn assigned_variable_is_not_narrowed() {
    assert_eq!(
        member_codes("t(A a) { if (a is B) { a.foo(); } a = new A(); }"),
        vec![errors::T003]
    );
}

#[test]
fn type_mismatches_are_warnings() {
    let codes = member_codes("t() { int i = 'text'; if (1) {} }");
    assert_eq!(codes, vec![errors::T001, errors::T002]);
}

#[test]
fn cyclic_class_hierarchy() {
    let mut host = TestHost::new(&[("app.st", "class P extends Q {} class Q extends P {}")]);
    let output = host.resolve_ok("app.st");
    assert_eq!(
        codes(&output, &host.source("app.st")),
        vec![errors::R008, errors::R008]
    );
}

// ---------------------------------------------------------------------------
// Constants and verification
// ---------------------------------------------------------------------------

#[test]
fn constants_are_evaluated_across_libraries() {
    let mut host = TestHost::new(&[
        ("lib.st", "const base = 10; class K { static const s = 'x' + 'y'; }"),
        (
            "app.st",
            "import 'lib.st'; const a = base + 2; const b = a * 3; const c = K.s; main() { const d = b - 1; print(d); }",
        ),
    ]);
    let output = host.resolve_ok("app.st");
    let app = output.library(&host.source("app.st")).unwrap();
    assert!(app.units[0].diagnostics.is_empty(), "{:?}", app.units[0].diagnostics);
    let value = |name: &str| {
        let ident = host.interner.get(name).unwrap();
        app.element.constants.get(&ident).cloned()
    };
    assert_eq!(value("a"), Some(ConstValue::Int(12)));
    assert_eq!(value("b"), Some(ConstValue::Int(36)));
    assert_eq!(value("c"), Some(ConstValue::String("xy".into())));
}

#[test]
fn non_constant_initializer_is_an_error() {
    let mut host = TestHost::new(&[("app.st", "var v = 1; const c = v; const d = c + 1;")]);
    let output = host.resolve_ok("app.st");
    // Only the initializer that reads a variable is reported.
    assert_eq!(codes(&output, &host.source("app.st")), vec![errors::R010]);
}

#[test]
fn assignments_to_finals_and_void_returns() {
    let text = "final f = 1; g() {} void h() { return 1; } main() { f = 2; g = null; final l = 3; l = 4; }";
    let mut host = TestHost::new(&[("app.st", text)]);
    let output = host.resolve_ok("app.st");
    let mut found = codes(&output, &host.source("app.st"));
    found.sort_by_key(|c| c.to_string());
    assert_eq!(found, vec![errors::R011, errors::R011, errors::R011, errors::T005]);
}

#[test]
fn verification_can_be_disabled() {
    let mut host = TestHost::new(&[("app.st", "final f = 1; main() { f = 2; }")]);
    let target = host.source("app.st");
    let mut resolver =
        LibraryResolver::new(Arc::clone(&host.interner), host.factory.core_source()).with_verification(false);
    let output = match resolver.resolve(&target, &mut host) {
        Ok(output) => output,
        Err(err) => panic!("{err}"),
    };
    assert!(codes(&output, &target).is_empty());
    assert_eq!(resolver.stage(), ResolutionStage::ResultsRecorded);
}

// ---------------------------------------------------------------------------
// Dependencies, reuse and failure
// ---------------------------------------------------------------------------

#[test]
fn dependency_recorded_on_declaring_part() {
    let mut host = TestHost::new(&[
        ("app.st", "library app; part 'p.st'; main() { new P(); }"),
        ("p.st", "part of app; class P {}"),
    ]);
    let output = host.resolve_ok("app.st");
    let app = output.library(&host.source("app.st")).unwrap();
    assert!(app.units.iter().all(|u| u.diagnostics.is_empty()));
    let expected = UnitDependency {
        library: host.source("app.st"),
        unit: host.source("p.st"),
        unit_name: "p.st".into(),
    };
    assert!(app.units[0].dependencies.contains(&expected));
    assert!(app.units[1].dependencies.iter().all(|d| d.unit != host.source("app.st")));
}

#[test]
fn previously_resolved_libraries_are_reused() {
    let mut host = TestHost::new(&[
        ("lib.st", "const k = 5;"),
        ("app.st", "import 'lib.st'; const j = k;"),
    ]);
    let first = host.resolve_ok("lib.st");
    for library in &first.libraries {
        host.resolved
            .insert(library.source().clone(), Arc::clone(&library.element));
    }
    let output = host.resolve_ok("app.st");
    assert_eq!(output.libraries.len(), 1);
    assert!(codes(&output, &host.source("app.st")).is_empty());
}

#[test]
fn cancellation_discards_results() {
    let mut host = TestHost::new(&[("app.st", "main() {}")]);
    host.cancel_after = Some(0);
    assert!(matches!(host.resolve("app.st"), Err(ResolveError::Cancelled)));
}

#[test]
fn missing_target_and_missing_core() {
    let mut host = TestHost::new(&[("app.st", "main() {}")]);
    let output = host.resolve_ok("absent.st");
    assert!(output.libraries.is_empty());

    host.hide_core = true;
    match host.resolve("app.st") {
        Err(ResolveError::Internal(err)) => assert!(err.message().contains("std:core")),
        other => panic!("expected internal error, got {other:?}"),
    }
}
