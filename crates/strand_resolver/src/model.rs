//! Inputs to library resolution.
//!
//! The resolver never loads or parses anything itself. A [`ResolverHost`]
//! supplies a [`LibraryModel`] per library: its parsed units and its import
//! and export directives already mapped to target sources. Libraries
//! resolved in an earlier round are supplied as finished elements instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use strand_source::{Source, Span};
use strand_syntax::ast::{Combinator, CompilationUnit, Name};

use crate::element::LibraryElement;

/// One unit of a library.
#[derive(Clone, Debug)]
pub struct UnitModel {
    /// Name of the unit within its library: the library URI for the self
    /// unit, the part path otherwise.
    pub name: String,
    /// The unit's source.
    pub source: Source,
    /// The parsed unit, full or diet.
    pub unit: Arc<CompilationUnit>,
}

/// An import directive with its resolved target.
#[derive(Clone, Debug)]
pub struct ImportModel {
    /// The imported library; `None` if the target is missing.
    pub target: Option<Source>,
    /// The import prefix.
    pub prefix: Option<Name>,
    /// Name filters.
    pub combinators: Vec<Combinator>,
    /// Location of the directive; dummy for implicit imports.
    pub span: Span,
    /// Added by the host for an embedded library rather than written.
    pub implicit: bool,
}

/// An export directive with its resolved target.
#[derive(Clone, Debug)]
pub struct ExportModel {
    /// The exported library; `None` if the target is missing.
    pub target: Option<Source>,
    /// Name filters.
    pub combinators: Vec<Combinator>,
    /// Location of the directive.
    pub span: Span,
}

/// A library ready for resolution.
#[derive(Clone, Debug)]
pub struct LibraryModel {
    /// The defining source.
    pub source: Source,
    /// The declared library name.
    pub name: Option<String>,
    /// Units, the self unit first.
    pub units: Vec<UnitModel>,
    /// Imports in directive order, then implicit imports.
    pub imports: Vec<ImportModel>,
    /// Exports in directive order.
    pub exports: Vec<ExportModel>,
}

impl LibraryModel {
    /// Every library this one imports or exports.
    pub fn dependencies(&self) -> impl Iterator<Item = &Source> {
        self.imports
            .iter()
            .filter_map(|i| i.target.as_ref())
            .chain(self.exports.iter().filter_map(|e| e.target.as_ref()))
    }

    /// Returns `true` if some import targets `library`.
    pub fn imports_library(&self, library: &Source) -> bool {
        self.imports.iter().any(|i| i.target.as_ref() == Some(library))
    }
}

/// Supplies libraries to the resolver.
pub trait ResolverHost {
    /// The model of a library, or `None` if it cannot be loaded.
    fn library_model(&mut self, library: &Source) -> Option<Arc<LibraryModel>>;

    /// The element of a library resolved earlier, if still valid.
    fn resolved_library(&mut self, library: &Source) -> Option<Arc<LibraryElement>>;

    /// Polled between compilation units; `true` abandons the resolution.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// A shared flag a caller sets to stop a long resolution.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clears a previous cancellation request.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
