//! The library graph of one compile.
//!
//! Libraries live in an arena indexed by [`LibraryId`]. Import and export
//! edges point at arena slots, so cyclic imports are plain back edges and
//! traversal needs no identity-keyed visited sets. A library is registered
//! before any of its dependencies are loaded, which is what makes loading a
//! cycle terminate.

use std::collections::HashMap;
use std::sync::Arc;

use strand_cache::LibraryDeps;
use strand_common::Interner;
use strand_diagnostics::DiagnosticSink;
use strand_resolver::{
    CancellationToken, ExportModel, ImportModel, LibraryElement, LibraryModel, ResolvedLibrary,
    ResolverHost, UnitModel,
};
use strand_source::{Source, SourceFactory, Span, UriResolution};
use strand_syntax::ast::{Combinator, Directive, Name};
use strand_syntax::{parse_unit, CompilationUnit, ParseMode};

/// Index of a library in a [`LibraryGraph`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct LibraryId(u32);

impl LibraryId {
    /// Returns the raw arena index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// What a directive URI resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirectiveTarget {
    /// A source, which may not exist.
    Source(Source),
    /// A native extension, never loaded and never reported.
    Native,
    /// Not a valid URI for any source.
    Unresolved,
}

impl DirectiveTarget {
    fn from_resolution(resolution: UriResolution) -> Self {
        match resolution {
            UriResolution::Source(source) => Self::Source(source),
            UriResolution::NativeExtension => Self::Native,
            UriResolution::Unresolved => Self::Unresolved,
        }
    }

    /// The target source, if the URI named one.
    pub fn source(&self) -> Option<&Source> {
        match self {
            Self::Source(source) => Some(source),
            _ => None,
        }
    }
}

/// An import or export directive of a library.
#[derive(Clone, Debug)]
pub struct LibraryEdge {
    /// The URI as written.
    pub text: String,
    /// What the URI resolved to.
    pub target: DirectiveTarget,
    /// The loaded target library; `None` if it could not be loaded.
    pub library: Option<LibraryId>,
    /// Import prefix.
    pub prefix: Option<Name>,
    /// Name filters.
    pub combinators: Vec<Combinator>,
    /// Location of the directive; dummy for implicit edges.
    pub span: Span,
    /// Added for an embedded library rather than written.
    pub implicit: bool,
}

/// A unit a library consists of: its self unit or one of its parts.
#[derive(Clone, Debug)]
pub struct UnitPath {
    /// Name of the unit within the library.
    pub name: String,
    /// What the path resolved to.
    pub target: DirectiveTarget,
    /// Location of the `part` directive; dummy for the self unit.
    pub span: Span,
    /// `true` for the defining unit.
    pub is_self: bool,
}

/// A parsed unit held by a library.
#[derive(Clone, Debug)]
pub struct ParsedUnit {
    /// Name of the unit within the library.
    pub name: String,
    /// The unit's source.
    pub source: Source,
    /// The parsed tree.
    pub unit: Arc<CompilationUnit>,
}

impl ParsedUnit {
    /// Returns `true` if only declaration signatures were parsed.
    pub fn is_diet(&self) -> bool {
        self.unit.diet
    }
}

/// One library of the graph.
#[derive(Debug)]
pub struct LibraryNode {
    /// The defining source.
    pub source: Source,
    /// Directive scan of the defining unit.
    pub scan: Arc<CompilationUnit>,
    /// The self unit followed by the parts, in directive order.
    pub paths: Vec<UnitPath>,
    /// Imports in directive order, then implicit imports.
    pub imports: Vec<LibraryEdge>,
    /// Exports in directive order.
    pub exports: Vec<LibraryEdge>,
    /// Units parsed in this compile, by name.
    pub units: Vec<ParsedUnit>,
    /// The dependency record loaded for this compile.
    pub deps: LibraryDeps,
    /// Supplied by the caller as already resolved; never parsed.
    pub preresolved: Option<Arc<LibraryElement>>,
    /// The resolution result of this compile.
    pub resolution: Option<ResolvedLibrary>,
}

impl LibraryNode {
    fn new(source: Source, scan: Arc<CompilationUnit>, factory: &SourceFactory) -> Self {
        let mut paths = vec![UnitPath {
            name: self_unit_name(&source),
            target: DirectiveTarget::Source(source.clone()),
            span: Span::DUMMY,
            is_self: true,
        }];
        let mut imports = Vec::new();
        let mut exports = Vec::new();
        for directive in &scan.directives {
            match directive {
                Directive::Part(d) => paths.push(UnitPath {
                    name: d.uri.value.clone(),
                    target: DirectiveTarget::from_resolution(
                        factory.resolve_uri(Some(&source), &d.uri.value),
                    ),
                    span: d.span,
                    is_self: false,
                }),
                Directive::Import(d) => imports.push(LibraryEdge {
                    text: d.uri.value.clone(),
                    target: DirectiveTarget::from_resolution(
                        factory.resolve_uri(Some(&source), &d.uri.value),
                    ),
                    library: None,
                    prefix: d.prefix,
                    combinators: d.combinators.clone(),
                    span: d.span,
                    implicit: false,
                }),
                Directive::Export(d) => exports.push(LibraryEdge {
                    text: d.uri.value.clone(),
                    target: DirectiveTarget::from_resolution(
                        factory.resolve_uri(Some(&source), &d.uri.value),
                    ),
                    library: None,
                    prefix: None,
                    combinators: d.combinators.clone(),
                    span: d.span,
                    implicit: false,
                }),
                Directive::Library(_) | Directive::PartOf(_) => {}
            }
        }
        Self {
            source,
            scan,
            paths,
            imports,
            exports,
            units: Vec::new(),
            deps: LibraryDeps::new(),
            preresolved: None,
            resolution: None,
        }
    }

    fn resolved(source: Source, element: Arc<LibraryElement>) -> Self {
        let scan = Arc::new(CompilationUnit {
            file: source.file(),
            directives: Vec::new(),
            declarations: Vec::new(),
            diet: true,
            span: Span::file_start(source.file()),
        });
        Self {
            source,
            scan,
            paths: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            units: Vec::new(),
            deps: LibraryDeps::new(),
            preresolved: Some(element),
            resolution: None,
        }
    }

    /// The declared library name, from the current self unit.
    pub fn name(&self) -> Option<&str> {
        self.self_unit()
            .map_or(&self.scan, |u| &u.unit)
            .library_directive()
            .map(|d| d.name.text.as_str())
    }

    /// Returns `true` if the defining unit declares itself a part.
    pub fn is_part(&self) -> bool {
        self.self_unit().map_or(&self.scan, |u| &u.unit).is_part()
    }

    /// The self unit, once parsed.
    pub fn self_unit(&self) -> Option<&ParsedUnit> {
        self.units.iter().find(|u| u.source == self.source)
    }

    /// The unit with the given name.
    pub fn unit(&self, name: &str) -> Option<&ParsedUnit> {
        self.units.iter().find(|u| u.name == name)
    }

    /// Adds a unit or replaces the one with the same name.
    pub fn put_unit(&mut self, unit: ParsedUnit) {
        match self.units.iter_mut().find(|u| u.name == unit.name) {
            Some(slot) => *slot = unit,
            None => self.units.push(unit),
        }
    }

    /// Removes the unit with the given name.
    pub fn remove_unit(&mut self, name: &str) {
        self.units.retain(|u| u.name != name);
    }

    /// Builds the resolver's view of this library.
    pub fn model(&self, graph: &LibraryGraph) -> Option<LibraryModel> {
        let self_unit = self.self_unit()?;
        let mut units = vec![UnitModel {
            name: self_unit.name.clone(),
            source: self_unit.source.clone(),
            unit: Arc::clone(&self_unit.unit),
        }];
        units.extend(
            self.units
                .iter()
                .filter(|u| u.source != self.source)
                .map(|u| UnitModel {
                    name: u.name.clone(),
                    source: u.source.clone(),
                    unit: Arc::clone(&u.unit),
                }),
        );
        let target = |edge: &LibraryEdge| edge.library.map(|id| graph.node(id).source.clone());
        Some(LibraryModel {
            source: self.source.clone(),
            name: self.name().map(str::to_string),
            units,
            imports: self
                .imports
                .iter()
                .map(|edge| ImportModel {
                    target: target(edge),
                    prefix: edge.prefix,
                    combinators: edge.combinators.clone(),
                    span: edge.span,
                    implicit: edge.implicit,
                })
                .collect(),
            exports: self
                .exports
                .iter()
                .map(|edge| ExportModel {
                    target: target(edge),
                    combinators: edge.combinators.clone(),
                    span: edge.span,
                })
                .collect(),
        })
    }
}

/// Name of a library's defining unit within the library: its URI.
pub fn self_unit_name(library: &Source) -> String {
    library.uri().to_string()
}

/// Every library reachable from the compiled application.
#[derive(Debug, Default)]
pub struct LibraryGraph {
    nodes: Vec<LibraryNode>,
    by_uri: HashMap<String, LibraryId>,
}

impl LibraryGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// The library with the given ID.
    pub fn node(&self, id: LibraryId) -> &LibraryNode {
        &self.nodes[id.0 as usize]
    }

    /// The library with the given ID, mutably.
    pub fn node_mut(&mut self, id: LibraryId) -> &mut LibraryNode {
        &mut self.nodes[id.0 as usize]
    }

    /// The ID of a registered library.
    pub fn lookup(&self, source: &Source) -> Option<LibraryId> {
        self.lookup_uri(source.uri())
    }

    /// The ID of a registered library, by URI.
    pub fn lookup_uri(&self, uri: &str) -> Option<LibraryId> {
        self.by_uri.get(uri).copied()
    }

    /// Every library ID in registration order.
    pub fn ids(&self) -> impl Iterator<Item = LibraryId> {
        (0..self.nodes.len() as u32).map(LibraryId)
    }

    /// Every library in registration order.
    pub fn nodes(&self) -> impl Iterator<Item = &LibraryNode> {
        self.nodes.iter()
    }

    /// Number of libraries.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no library was loaded.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn register(&mut self, node: LibraryNode) -> LibraryId {
        let id = LibraryId(self.nodes.len() as u32);
        self.by_uri.insert(node.source.uri().to_string(), id);
        self.nodes.push(node);
        id
    }
}

/// Loads libraries into a [`LibraryGraph`].
pub struct GraphBuilder<'a> {
    factory: &'a SourceFactory,
    interner: &'a Interner,
    parsed: &'a HashMap<Source, Arc<CompilationUnit>>,
}

impl<'a> GraphBuilder<'a> {
    /// Creates a builder. Units in `parsed` are used instead of reading
    /// their sources.
    pub fn new(
        factory: &'a SourceFactory,
        interner: &'a Interner,
        parsed: &'a HashMap<Source, Arc<CompilationUnit>>,
    ) -> Self {
        Self {
            factory,
            interner,
            parsed,
        }
    }

    /// Registers libraries the caller resolved earlier. Their dependencies
    /// are not followed.
    pub fn add_resolved(
        &self,
        graph: &mut LibraryGraph,
        libraries: &HashMap<Source, Arc<LibraryElement>>,
    ) {
        for (source, element) in libraries {
            if graph.lookup(source).is_none() {
                graph.register(LibraryNode::resolved(source.clone(), Arc::clone(element)));
            }
        }
    }

    /// Loads `source` and everything it imports or exports, transitively.
    ///
    /// Returns the existing library if `source` is already in the graph and
    /// `None` if it cannot be loaded. Missing targets are left unlinked; they
    /// are reported when the importing unit is parsed.
    pub fn update_libraries(&self, graph: &mut LibraryGraph, source: &Source) -> Option<LibraryId> {
        if let Some(id) = graph.lookup(source) {
            return Some(id);
        }
        let root = self.load(graph, source)?;
        let mut pending = vec![root];
        while let Some(id) = pending.pop() {
            let node = graph.node(id);
            let targets: Vec<(bool, usize, Source)> = node
                .imports
                .iter()
                .enumerate()
                .filter_map(|(i, e)| e.target.source().map(|s| (true, i, s.clone())))
                .chain(
                    node.exports
                        .iter()
                        .enumerate()
                        .filter_map(|(i, e)| e.target.source().map(|s| (false, i, s.clone()))),
                )
                .collect();
            for (is_import, index, target) in targets {
                let linked = match graph.lookup(&target) {
                    Some(existing) => Some(existing),
                    None => {
                        let loaded = self.load(graph, &target);
                        pending.extend(loaded);
                        loaded
                    }
                };
                let node = graph.node_mut(id);
                let edge = if is_import {
                    &mut node.imports[index]
                } else {
                    &mut node.exports[index]
                };
                edge.library = linked;
            }
        }
        tracing::debug!(root = %source, libraries = graph.len(), "library graph loaded");
        Some(root)
    }

    /// Adds an implicit, unprefixed import of every embedded library to
    /// every library that does not already import it.
    pub fn import_embedded(&self, graph: &mut LibraryGraph, embedded: &[Source]) {
        let embedded: Vec<LibraryId> = embedded
            .iter()
            .filter_map(|source| self.update_libraries(graph, source))
            .collect();
        let ids: Vec<LibraryId> = graph.ids().collect();
        for id in ids {
            if graph.node(id).preresolved.is_some() {
                continue;
            }
            for &target in &embedded {
                let node = graph.node(id);
                if id == target || node.imports.iter().any(|e| e.library == Some(target)) {
                    continue;
                }
                let source = graph.node(target).source.clone();
                graph.node_mut(id).imports.push(LibraryEdge {
                    text: source.uri().to_string(),
                    target: DirectiveTarget::Source(source),
                    library: Some(target),
                    prefix: None,
                    combinators: Vec::new(),
                    span: Span::DUMMY,
                    implicit: true,
                });
            }
        }
    }

    fn load(&self, graph: &mut LibraryGraph, source: &Source) -> Option<LibraryId> {
        let scan = self.scan(source)?;
        Some(graph.register(LibraryNode::new(source.clone(), scan, self.factory)))
    }

    /// Reads the directives of a defining unit. Problems are ignored here;
    /// they are reported when the unit itself is parsed.
    fn scan(&self, source: &Source) -> Option<Arc<CompilationUnit>> {
        if let Some(unit) = self.parsed.get(source) {
            return Some(Arc::clone(unit));
        }
        if !self.factory.exists(source) {
            return None;
        }
        let text = self.factory.contents(source).ok()?;
        let scratch = DiagnosticSink::new();
        Some(Arc::new(parse_unit(
            &text,
            source.file(),
            ParseMode::Diet,
            self.interner,
            &scratch,
        )))
    }
}

/// Serves the graph's libraries to the resolver.
pub(crate) struct GraphHost<'g> {
    graph: &'g LibraryGraph,
    cancel: Option<&'g CancellationToken>,
}

impl<'g> GraphHost<'g> {
    pub(crate) fn new(graph: &'g LibraryGraph, cancel: Option<&'g CancellationToken>) -> Self {
        Self { graph, cancel }
    }
}

impl ResolverHost for GraphHost<'_> {
    fn library_model(&mut self, library: &Source) -> Option<Arc<LibraryModel>> {
        let node = self.graph.node(self.graph.lookup(library)?);
        if node.preresolved.is_some() {
            return None;
        }
        node.model(self.graph).map(Arc::new)
    }

    fn resolved_library(&mut self, library: &Source) -> Option<Arc<LibraryElement>> {
        let node = self.graph.node(self.graph.lookup(library)?);
        node.preresolved.clone()
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(CancellationToken::is_cancelled)
    }
}
