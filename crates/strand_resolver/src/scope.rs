//! Directive binding and export namespaces.

use std::collections::HashMap;
use std::sync::Arc;

use strand_common::{Ident, Interner};
use strand_source::{Source, Span};
use strand_syntax::ast::Combinator;

use crate::element::{
    filters_allow, is_private, ElementRef, ExportElement, ImportElement, LibraryElement,
    NameFilter, PrefixElement,
};
use crate::model::LibraryModel;

/// Converts syntactic combinators to name filters.
pub fn name_filters(combinators: &[Combinator]) -> Vec<NameFilter> {
    combinators
        .iter()
        .map(|c| match c {
            Combinator::Show(names) => NameFilter::Show(names.iter().map(|n| n.ident).collect()),
            Combinator::Hide(names) => NameFilter::Hide(names.iter().map(|n| n.ident).collect()),
        })
        .collect()
}

/// Binds the import and export directives of `model` into `element`.
///
/// Imports sharing a prefix share one [`PrefixElement`]. Every library but
/// the core library itself imports the core library, implicitly if no
/// directive does.
pub(crate) fn bind_directives(model: &LibraryModel, element: &mut LibraryElement, core: &Source) {
    for import in &model.imports {
        let Some(target) = &import.target else {
            continue;
        };
        if *target == element.source {
            continue;
        }
        if *target == *core && !import.implicit {
            element.explicitly_imports_core = true;
        }
        let index = element.imports.len();
        let prefix = import.prefix.map(|p| p.ident);
        element.imports.push(ImportElement {
            target: target.clone(),
            prefix,
            filters: name_filters(&import.combinators),
            span: import.span,
            synthetic: import.implicit,
        });
        if let Some(prefix) = prefix {
            element
                .prefixes
                .entry(prefix)
                .or_insert_with(|| PrefixElement {
                    name: prefix,
                    imports: Vec::new(),
                })
                .imports
                .push(index);
        }
    }
    if element.source != *core && !model.imports_library(core) {
        element.imports.push(ImportElement {
            target: core.clone(),
            prefix: None,
            filters: Vec::new(),
            span: Span::DUMMY,
            synthetic: true,
        });
    }
    for export in &model.exports {
        let Some(target) = &export.target else {
            continue;
        };
        element.exports.push(ExportElement {
            target: target.clone(),
            filters: name_filters(&export.combinators),
            span: export.span,
        });
    }
}

/// Computes the export namespace of every library in `cycle`.
///
/// Exports may be circular within a cycle, so namespaces grow until no
/// library gains a name. The first element bound to a name wins.
pub(crate) fn compute_namespaces(
    libraries: &mut HashMap<Source, Arc<LibraryElement>>,
    cycle: &[Source],
    interner: &Interner,
) {
    for source in cycle {
        let Some(element) = libraries.get_mut(source) else {
            continue;
        };
        let element = Arc::make_mut(element);
        let own: Vec<Ident> = element
            .members
            .keys()
            .copied()
            .filter(|name| !is_private(interner.resolve(*name)))
            .collect();
        element.namespace = own
            .into_iter()
            .map(|name| {
                (
                    name,
                    ElementRef::TopLevel {
                        library: source.clone(),
                        name,
                    },
                )
            })
            .collect();
    }

    loop {
        let mut additions: Vec<(Source, Ident, ElementRef)> = Vec::new();
        for source in cycle {
            let Some(element) = libraries.get(source) else {
                continue;
            };
            for export in &element.exports {
                let Some(target) = libraries.get(&export.target) else {
                    continue;
                };
                for (name, reference) in &target.namespace {
                    if filters_allow(&export.filters, *name)
                        && !element.namespace.contains_key(name)
                        && !additions.iter().any(|(s, n, _)| s == source && n == name)
                    {
                        additions.push((source.clone(), *name, reference.clone()));
                    }
                }
            }
        }
        if additions.is_empty() {
            break;
        }
        for (source, name, reference) in additions {
            if let Some(element) = libraries.get_mut(&source) {
                Arc::make_mut(element).namespace.insert(name, reference);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{TopLevelElement, TopLevelKind};
    use crate::model::{ExportModel, ImportModel};
    use crate::types::Type;
    use strand_source::{MemorySourceProvider, SourceFactory, SystemLibraries};
    use strand_syntax::ast::Name;

    fn factory() -> SourceFactory {
        SourceFactory::new(
            Arc::new(MemorySourceProvider::new()),
            SystemLibraries::embedded(),
        )
    }

    fn model(source: &Source, imports: Vec<ImportModel>, exports: Vec<ExportModel>) -> LibraryModel {
        LibraryModel {
            source: source.clone(),
            name: None,
            units: Vec::new(),
            imports,
            exports,
        }
    }

    fn import(target: &Source, prefix: Option<Ident>) -> ImportModel {
        ImportModel {
            target: Some(target.clone()),
            prefix: prefix.map(|ident| Name { ident, span: Span::DUMMY }),
            combinators: Vec::new(),
            span: Span::DUMMY,
            implicit: false,
        }
    }

    fn element_with(source: &Source, names: &[Ident]) -> LibraryElement {
        let mut element = LibraryElement::new(source.clone(), None);
        for &name in names {
            element.members.insert(
                name,
                TopLevelElement {
                    name,
                    library: source.clone(),
                    unit: source.clone(),
                    unit_name: source.uri().into(),
                    kind: TopLevelKind::Variable,
                    span: Span::DUMMY,
                    is_final: false,
                    is_const: false,
                    ty: Type::Dynamic,
                    has_setter: false,
                },
            );
        }
        element
    }

    #[test]
    fn shared_prefix_and_implicit_core() {
        let f = factory();
        let interner = Interner::new();
        let (app, a, b, core) = (f.for_uri("app.st"), f.for_uri("a.st"), f.for_uri("b.st"), f.core_source());
        let p = interner.get_or_intern("p");
        let m = model(&app, vec![import(&a, Some(p)), import(&b, Some(p))], Vec::new());
        let mut element = LibraryElement::new(app, None);
        bind_directives(&m, &mut element, &core);
        assert_eq!(element.imports.len(), 3);
        assert_eq!(element.prefixes[&p].imports, vec![0, 1]);
        assert!(element.imports[2].synthetic);
        assert!(!element.explicitly_imports_core);
    }

    #[test]
    fn explicit_core_import() {
        let f = factory();
        let (app, core) = (f.for_uri("app.st"), f.core_source());
        let m = model(&app, vec![import(&core, None)], Vec::new());
        let mut element = LibraryElement::new(app, None);
        bind_directives(&m, &mut element, &core);
        assert_eq!(element.imports.len(), 1);
        assert!(element.explicitly_imports_core);
    }

    #[test]
    fn circular_exports_reach_fixpoint() {
        let f = factory();
        let interner = Interner::new();
        let (a, b, core) = (f.for_uri("a.st"), f.for_uri("b.st"), f.core_source());
        let x = interner.get_or_intern("x");
        let y = interner.get_or_intern("y");
        let private = interner.get_or_intern("_z");
        let export = |target: &Source| ExportModel {
            target: Some(target.clone()),
            combinators: Vec::new(),
            span: Span::DUMMY,
        };
        let mut libraries = HashMap::new();
        for (source, names, target) in [(&a, vec![x, private], &b), (&b, vec![y], &a)] {
            let mut element = element_with(source, &names);
            bind_directives(&model(source, Vec::new(), vec![export(target)]), &mut element, &core);
            libraries.insert(source.clone(), Arc::new(element));
        }
        compute_namespaces(&mut libraries, &[a.clone(), b.clone()], &interner);
        for source in [&a, &b] {
            let ns = &libraries[source].namespace;
            assert!(ns.contains_key(&x) && ns.contains_key(&y));
            assert!(!ns.contains_key(&private));
        }
        assert_eq!(libraries[&b].namespace[&x], ElementRef::TopLevel { library: a, name: x });
    }
}
