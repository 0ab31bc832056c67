//! Feeds the resolver from the context's cache.

use std::sync::Arc;

use strand_resolver::{
    CancellationToken, ExportModel, ImportModel, LibraryElement, LibraryModel, ResolverHost, UnitModel,
};
use strand_source::Source;
use strand_syntax::ast::Directive;

use crate::engine::{existing_target, Engine};

/// Supplies parsed units and still-valid library elements while one library
/// is being resolved.
pub(crate) struct ContextHost<'e, 'a> {
    engine: &'e mut Engine<'a>,
}

impl<'e, 'a> ContextHost<'e, 'a> {
    pub(crate) fn new(engine: &'e mut Engine<'a>) -> Self {
        Self { engine }
    }
}

impl ResolverHost for ContextHost<'_, '_> {
    fn library_model(&mut self, library: &Source) -> Option<Arc<LibraryModel>> {
        let factory = self.engine.factory;
        if !factory.exists(library) {
            return None;
        }
        let unit = self.engine.parse_compilation_unit(library).ok()?;
        if unit.is_part() && unit.library_directive().is_none() {
            return None;
        }
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
                    target: existing_target(factory, library, &d.uri.value),
                    prefix: d.prefix,
                    combinators: d.combinators.clone(),
                    span: d.span,
                    implicit: false,
                }),
                Directive::Export(d) => exports.push(ExportModel {
                    target: existing_target(factory, library, &d.uri.value),
                    combinators: d.combinators.clone(),
                    span: d.span,
                }),
                Directive::Part(d) => {
                    let Some(source) = existing_target(factory, library, &d.uri.value) else {
                        continue;
                    };
                    if units.iter().any(|u| u.source == source) {
                        continue;
                    }
                    if let Ok(part) = self.engine.parse_compilation_unit(&source) {
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
        self.engine
            .unit_entry(library)
            .and_then(|e| e.element.value().cloned())
    }

    fn is_cancelled(&self) -> bool {
        self.engine.cancel.is_some_and(CancellationToken::is_cancelled)
    }
}
