//! Structural checks of library, part, import and export directives.

use std::collections::{HashMap, HashSet};

use strand_diagnostics::Diagnostic;
use strand_source::{Capability, Source, Span, SystemLibraries};
use strand_syntax::ast::Directive;

use crate::errors;
use crate::graph::{LibraryEdge, LibraryGraph, LibraryId, LibraryNode};

/// Checks the directives of every loaded non-system library.
///
/// Checks that depend on the contents of a unit only run for units that
/// were fully parsed in this compile.
pub fn validate_library_directives(
    graph: &LibraryGraph,
    system: &SystemLibraries,
) -> Vec<Diagnostic> {
    let mut problems = Vec::new();
    for node in graph.nodes() {
        if node.source.is_system() || node.preresolved.is_some() {
            continue;
        }
        check_duplicate_units(node, &mut problems);
        check_system_imports(node, system, &mut problems);
        check_exports(graph, node, &mut problems);
        check_imports(graph, node, &mut problems);
        check_parts(node, &mut problems);
    }
    problems
}

fn check_duplicate_units(node: &LibraryNode, problems: &mut Vec<Diagnostic>) {
    let mut seen: HashSet<&Source> = HashSet::new();
    for path in &node.paths {
        if let Some(source) = path.target.source() {
            if !seen.insert(source) {
                problems.push(errors::error_unit_already_included(&path.name, path.span));
            }
        }
    }
}

/// Reports one combination error at the import that completes a console and
/// browser pair, and a warning at every experimental import.
fn check_system_imports(node: &LibraryNode, system: &SystemLibraries, problems: &mut Vec<Diagnostic>) {
    let mut console = false;
    let mut browser = false;
    let mut reported = false;
    for edge in written(&node.imports) {
        let Some(library) = edge
            .target
            .source()
            .filter(|s| s.is_system())
            .and_then(|s| system.library_for_uri(s.uri()))
        else {
            continue;
        };
        match library.capability {
            Capability::Console => console = true,
            Capability::Browser => browser = true,
            Capability::Shared => {}
        }
        if console && browser && !reported {
            problems.push(errors::error_console_browser_mix(edge.span));
            reported = true;
        }
        if library.experimental {
            problems.push(errors::warning_not_fully_implemented(&edge.text, edge.span));
        }
    }
}

fn check_exports(graph: &LibraryGraph, node: &LibraryNode, problems: &mut Vec<Diagnostic>) {
    for edge in written(&node.exports) {
        let Some(target) = edge.library.map(|id| graph.node(id)) else {
            continue;
        };
        if target.preresolved.is_none() && target.is_part() {
            problems.push(errors::error_not_a_library(&edge.text, edge.span));
        } else if library_name(target).is_none() {
            problems.push(errors::error_export_without_name(&edge.text, edge.span));
        }
    }
}

/// Every distinct imported user library needs a name, and no two of them
/// may share one. Only targets whose defining unit was fully parsed are
/// checked.
fn check_imports(graph: &LibraryGraph, node: &LibraryNode, problems: &mut Vec<Diagnostic>) {
    let mut seen: HashSet<LibraryId> = HashSet::new();
    let mut names: HashMap<&str, &str> = HashMap::new();
    for edge in written(&node.imports) {
        let Some(id) = edge.library else {
            continue;
        };
        let target = graph.node(id);
        if target.source.is_system() || !seen.insert(id) {
            continue;
        }
        if target.self_unit().map_or(true, |u| u.is_diet()) {
            continue;
        }
        if target.is_part() {
            problems.push(errors::error_not_a_library(&edge.text, edge.span));
            continue;
        }
        match target.name() {
            None => problems.push(errors::error_import_without_name(&edge.text, edge.span)),
            Some(name) => match names.get(name) {
                Some(first) => problems.push(errors::error_duplicate_imported_name(
                    name, first, edge.span,
                )),
                None => {
                    names.insert(name, &edge.text);
                }
            },
        }
    }
}

/// A part must hold exactly one directive, a `part of` naming its library.
fn check_parts(node: &LibraryNode, problems: &mut Vec<Diagnostic>) {
    let mut seen: HashSet<&Source> = HashSet::from([&node.source]);
    for path in node.paths.iter().filter(|p| !p.is_self) {
        let Some(source) = path.target.source() else {
            continue;
        };
        if !seen.insert(source) {
            continue;
        }
        let Some(part) = node.units.iter().find(|u| u.source == *source && !u.is_diet()) else {
            continue;
        };
        let directives = &part.unit.directives;
        match directives.as_slice() {
            [] => problems.push(errors::error_missing_part_of(
                node.name().unwrap_or("<name>"),
                Span::file_start(source.file()),
            )),
            [Directive::PartOf(part_of)] => {
                if node.name() != Some(part_of.name.text.as_str()) {
                    problems.push(errors::error_wrong_part_of_name(
                        node.name().unwrap_or(""),
                        &part_of.name.text,
                        part_of.name.span,
                    ));
                }
            }
            [first, ..] => {
                problems.push(errors::error_illegal_part_directives(&path.name, first.span()))
            }
        }
    }
}

fn written(edges: &[LibraryEdge]) -> impl Iterator<Item = &LibraryEdge> {
    edges.iter().filter(|e| !e.implicit)
}

fn library_name(node: &LibraryNode) -> Option<&str> {
    match &node.preresolved {
        Some(element) => element.name.as_deref(),
        None => node.name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{D001, D002, D003, D004, D005, D006, D007, D008, D009, D010};
    use crate::graph::{GraphBuilder, ParsedUnit};
    use std::sync::Arc;
    use strand_common::Interner;
    use strand_diagnostics::{DiagnosticCode, DiagnosticSink, Severity};
    use strand_source::{MemorySourceProvider, SourceFactory};
    use strand_syntax::{parse_unit, ParseMode};

    /// Loads `/p/main.st`, parses every unit fully and validates.
    fn validate(files: &[(&str, &str)]) -> Vec<Diagnostic> {
        let provider = Arc::new(MemorySourceProvider::new());
        for (uri, text) in files {
            provider.set_content(uri, *text);
        }
        let factory = SourceFactory::new(provider, SystemLibraries::embedded());
        let interner = Interner::new();
        let parsed = HashMap::new();
        let builder = GraphBuilder::new(&factory, &interner, &parsed);
        let mut graph = LibraryGraph::new();
        builder.update_libraries(&mut graph, &factory.for_uri("/p/main.st"));
        for id in graph.ids().collect::<Vec<_>>() {
            for path in graph.node(id).paths.clone() {
                let Some(source) = path.target.source() else {
                    continue;
                };
                let Ok(text) = factory.contents(source) else {
                    continue;
                };
                let sink = DiagnosticSink::new();
                let unit = parse_unit(&text, source.file(), ParseMode::Full, &interner, &sink);
                graph.node_mut(id).put_unit(ParsedUnit {
                    name: path.name.clone(),
                    source: source.clone(),
                    unit: Arc::new(unit),
                });
            }
        }
        validate_library_directives(&graph, factory.system_libraries())
    }

    fn codes(problems: &[Diagnostic]) -> Vec<DiagnosticCode> {
        problems.iter().map(|d| d.code).collect()
    }

    #[test]
    fn clean_library_has_no_problems() {
        let problems = validate(&[
            ("/p/main.st", "library main; import 'util.st'; part 'a.st';"),
            ("/p/util.st", "library util;"),
            ("/p/a.st", "part of main;"),
        ]);
        assert!(problems.is_empty(), "{problems:?}");
    }

    #[test]
    fn duplicate_part_reported_once_at_second() {
        let problems = validate(&[
            ("/p/main.st", "library main;\npart 'a.st';\npart 'a.st';"),
            ("/p/a.st", "part of main;"),
        ]);
        assert_eq!(codes(&problems), vec![D001]);
        assert_eq!(problems[0].primary_span.start, 27);
    }

    #[test]
    fn console_and_browser_conflict_once() {
        for text in [
            "library main; import 'std:io'; import 'std:html'; import 'std:io' as again;",
            "library main; import 'std:html'; import 'std:core'; import 'std:io';",
        ] {
            let problems = validate(&[("/p/main.st", text)]);
            assert_eq!(codes(&problems), vec![D002], "{text}");
            let second = text.find("import 'std:i").max(text.find("import 'std:h"));
            assert_eq!(problems[0].primary_span.start as usize, second.unwrap());
        }
    }

    #[test]
    fn experimental_import_warns() {
        let problems = validate(&[("/p/main.st", "library main; import 'std:mirrors';")]);
        assert_eq!(codes(&problems), vec![D003]);
        assert_eq!(problems[0].severity, Severity::Warning);
    }

    #[test]
    fn unnamed_export_and_import() {
        let problems = validate(&[
            ("/p/main.st", "library main; import 'a.st'; export 'b.st';"),
            ("/p/a.st", "int a;"),
            ("/p/b.st", "int b;"),
        ]);
        let mut found = codes(&problems);
        found.sort_by_key(|c| c.number);
        assert_eq!(found, vec![D004, D005]);
    }

    #[test]
    fn duplicate_imported_name_names_first_import() {
        let problems = validate(&[
            ("/p/main.st", "library main; import 'a.st'; import 'b.st';"),
            ("/p/a.st", "library util;"),
            ("/p/b.st", "library util;"),
        ]);
        assert_eq!(codes(&problems), vec![D006]);
        assert!(problems[0].message.contains("'a.st'"));
    }

    #[test]
    fn part_directive_shapes() {
        let problems = validate(&[
            (
                "/p/main.st",
                "library main; part 'none.st'; part 'wrong.st'; part 'extra.st';",
            ),
            ("/p/none.st", "int x;"),
            ("/p/wrong.st", "part of other;"),
            ("/p/extra.st", "part of main; import 'std:core';"),
        ]);
        assert_eq!(codes(&problems), vec![D007, D009, D008]);
        assert_eq!(
            problems[1].message,
            "expected 'part of main', found 'part of other'"
        );
    }

    #[test]
    fn importing_a_part_is_not_a_library() {
        let problems = validate(&[
            ("/p/main.st", "library main; import 'a.st'; export 'a.st';"),
            ("/p/a.st", "part of main;"),
        ]);
        assert_eq!(codes(&problems), vec![D010, D010]);
    }
}
