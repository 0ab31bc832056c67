//! Per-source cache entries.
//!
//! A source holding Strand code gets a [`UnitEntry`]; an HTML companion gets
//! an [`HtmlEntry`]. Every cached artifact lives in its own [`CacheCell`].
//! Results of resolving a unit are kept per owning library, so a unit shared
//! by two libraries holds two independent resolutions.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use strand_common::Ident;
use strand_diagnostics::Diagnostic;
use strand_resolver::{ElementRef, LibraryElement, ResolvedUnit};
use strand_source::{LineInfo, Source};
use strand_syntax::{CompilationUnit, HtmlUnit};

use crate::state::{CacheCell, CacheState};

/// Names a library makes visible to its importers.
pub type PublicNamespace = HashMap<Ident, ElementRef>;

/// What a source is, as far as the context knows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Defines a library.
    Library,
    /// Declares itself `part of` a library.
    Part,
    /// An HTML companion file.
    Html,
    /// Not analyzable, or not parsed yet.
    Unknown,
}

/// Returns `true` for sources holding Strand code.
pub fn is_unit_source(source: &Source) -> bool {
    source.is_system() || source.uri().ends_with(".st")
}

/// Slots of a [`UnitEntry`] that do not depend on an owning library.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnitSlot {
    /// Library or part.
    Kind,
    /// Line starts.
    LineInfo,
    /// The parsed tree.
    ParsedUnit,
    /// Syntax problems.
    ParseErrors,
    /// Units of the library defined here, itself included.
    IncludedParts,
    /// The library element defined here.
    Element,
    /// The public namespace of the library defined here.
    PublicNamespace,
    /// The library has an entry point.
    IsLaunchable,
    /// The library reaches the browser library.
    IsClient,
}

/// Slots of a [`UnitEntry`] kept once per owning library.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LibrarySlot {
    /// The resolved tree.
    ResolvedUnit,
    /// Problems found while resolving.
    ResolutionErrors,
}

/// Slots of an [`HtmlEntry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HtmlSlot {
    /// Line starts.
    LineInfo,
    /// The scanned document.
    ParsedUnit,
    /// Existing libraries its scripts name.
    ReferencedLibraries,
    /// The resolved document.
    ResolvedUnit,
}

/// Resolution of one unit within one library.
#[derive(Clone, Debug, Default)]
pub struct Resolution {
    /// The resolved tree and its side tables.
    pub resolved_unit: CacheCell<Arc<ResolvedUnit>>,
    /// Problems found while resolving.
    pub errors: CacheCell<Vec<Diagnostic>>,
}

/// Everything cached about one Strand source.
#[derive(Clone, Debug, Default)]
pub struct UnitEntry {
    /// Library or part.
    pub kind: CacheCell<EntryKind>,
    /// Line starts of the current contents.
    pub line_info: CacheCell<Arc<LineInfo>>,
    /// The parsed tree.
    pub parsed_unit: CacheCell<Arc<CompilationUnit>>,
    /// Syntax problems.
    pub parse_errors: CacheCell<Vec<Diagnostic>>,
    /// Units of the library defined here, the defining unit first.
    pub included_parts: CacheCell<Vec<Source>>,
    /// The library element defined here.
    pub element: CacheCell<Arc<LibraryElement>>,
    /// Public names of the library defined here.
    pub public_namespace: CacheCell<Arc<PublicNamespace>>,
    /// The library declares a usable `main`.
    pub is_launchable: CacheCell<bool>,
    /// The library reaches the browser library through its directives.
    pub is_client: CacheCell<bool>,
    resolutions: BTreeMap<Source, Resolution>,
}

impl UnitEntry {
    /// The kind, or [`EntryKind::Unknown`] while not computed.
    pub fn kind(&self) -> EntryKind {
        self.kind.value().copied().unwrap_or(EntryKind::Unknown)
    }

    /// The state of a slot.
    pub fn state(&self, slot: UnitSlot) -> CacheState {
        match slot {
            UnitSlot::Kind => self.kind.state(),
            UnitSlot::LineInfo => self.line_info.state(),
            UnitSlot::ParsedUnit => self.parsed_unit.state(),
            UnitSlot::ParseErrors => self.parse_errors.state(),
            UnitSlot::IncludedParts => self.included_parts.state(),
            UnitSlot::Element => self.element.state(),
            UnitSlot::PublicNamespace => self.public_namespace.state(),
            UnitSlot::IsLaunchable => self.is_launchable.state(),
            UnitSlot::IsClient => self.is_client.state(),
        }
    }

    /// Moves a slot to `state`.
    pub fn set_state(&mut self, slot: UnitSlot, state: CacheState) {
        match slot {
            UnitSlot::Kind => self.kind.set_state(state),
            UnitSlot::LineInfo => self.line_info.set_state(state),
            UnitSlot::ParsedUnit => self.parsed_unit.set_state(state),
            UnitSlot::ParseErrors => self.parse_errors.set_state(state),
            UnitSlot::IncludedParts => self.included_parts.set_state(state),
            UnitSlot::Element => self.element.set_state(state),
            UnitSlot::PublicNamespace => self.public_namespace.set_state(state),
            UnitSlot::IsLaunchable => self.is_launchable.set_state(state),
            UnitSlot::IsClient => self.is_client.set_state(state),
        }
    }

    /// The state of a per-library slot. Libraries never resolved against
    /// are `Invalid`.
    pub fn library_state(&self, slot: LibrarySlot, library: &Source) -> CacheState {
        self.resolutions.get(library).map_or(CacheState::Invalid, |r| match slot {
            LibrarySlot::ResolvedUnit => r.resolved_unit.state(),
            LibrarySlot::ResolutionErrors => r.errors.state(),
        })
    }

    /// Moves a per-library slot to `state`.
    pub fn set_library_state(&mut self, slot: LibrarySlot, library: &Source, state: CacheState) {
        let resolution = self.resolutions.entry(library.clone()).or_default();
        match slot {
            LibrarySlot::ResolvedUnit => resolution.resolved_unit.set_state(state),
            LibrarySlot::ResolutionErrors => resolution.errors.set_state(state),
        }
    }

    /// The resolution of this unit within `library`.
    pub fn resolution(&self, library: &Source) -> Option<&Resolution> {
        self.resolutions.get(library)
    }

    /// The resolved tree within `library`, if valid.
    pub fn resolved_unit(&self, library: &Source) -> Option<Arc<ResolvedUnit>> {
        self.resolutions
            .get(library)
            .and_then(|r| r.resolved_unit.value().cloned())
    }

    /// Stores the result of resolving this unit within `library`.
    pub fn set_resolution(&mut self, library: &Source, unit: Arc<ResolvedUnit>) {
        let resolution = self.resolutions.entry(library.clone()).or_default();
        resolution.errors.set_value(unit.diagnostics.clone());
        resolution.resolved_unit.set_value(unit);
    }

    /// Stores the result of parsing the current contents.
    pub fn set_parse_results(
        &mut self,
        unit: Arc<CompilationUnit>,
        line_info: LineInfo,
        errors: Vec<Diagnostic>,
    ) {
        if self.kind.state() != CacheState::Valid {
            let kind = if unit.is_part() && unit.library_directive().is_none() {
                EntryKind::Part
            } else {
                EntryKind::Library
            };
            self.kind.set_value(kind);
        }
        self.line_info.set_value(Arc::new(line_info));
        self.parsed_unit.set_value(unit);
        self.parse_errors.set_value(errors);
    }

    /// Records that the current contents cannot be read.
    pub fn set_parse_failed(&mut self) {
        for slot in [
            UnitSlot::Kind,
            UnitSlot::LineInfo,
            UnitSlot::ParsedUnit,
            UnitSlot::ParseErrors,
        ] {
            self.set_state(slot, CacheState::Error);
        }
    }

    /// The parsed tree, taken from any valid resolution if the parsed slot
    /// itself was flushed.
    pub fn any_parsed_unit(&self) -> Option<Arc<CompilationUnit>> {
        self.parsed_unit.value().cloned().or_else(|| {
            self.resolutions
                .values()
                .find_map(|r| r.resolved_unit.value().map(|u| Arc::clone(&u.unit)))
        })
    }

    /// Syntax problems followed by the resolution problems of every
    /// library, in library order.
    pub fn all_errors(&self) -> Vec<Diagnostic> {
        let mut errors: Vec<Diagnostic> = self.parse_errors.value().cloned().unwrap_or_default();
        for resolution in self.resolutions.values() {
            if let Some(found) = resolution.errors.value() {
                errors.extend(found.iter().cloned());
            }
        }
        errors
    }

    /// Forgets everything derived from resolving a library.
    pub fn invalidate_resolution(&mut self) {
        self.resolutions.clear();
        self.element.invalidate();
        self.public_namespace.invalidate();
        self.is_launchable.invalidate();
        self.is_client.invalidate();
    }

    /// Forgets everything derived from the contents.
    pub fn invalidate_contents(&mut self) {
        self.invalidate_resolution();
        self.kind.invalidate();
        self.line_info.invalidate();
        self.parsed_unit.invalidate();
        self.parse_errors.invalidate();
        self.included_parts.invalidate();
    }

    /// Drops the trees, keeping kind, errors and library facts.
    pub fn flush(&mut self) {
        self.parsed_unit.flush();
        for resolution in self.resolutions.values_mut() {
            resolution.resolved_unit.flush();
        }
    }
}

/// The resolved form of an HTML companion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedHtml {
    /// The HTML source.
    pub source: Source,
    /// Libraries the scripts name, in document order, without duplicates.
    pub libraries: Vec<Source>,
    /// Scripts naming missing libraries.
    pub diagnostics: Vec<Diagnostic>,
}

/// Everything cached about one HTML source.
#[derive(Clone, Debug, Default)]
pub struct HtmlEntry {
    /// Line starts of the current contents.
    pub line_info: CacheCell<Arc<LineInfo>>,
    /// The scanned document.
    pub parsed_unit: CacheCell<Arc<HtmlUnit>>,
    /// Existing libraries its scripts name.
    pub referenced_libraries: CacheCell<Vec<Source>>,
    /// The resolved document.
    pub resolved_unit: CacheCell<Arc<ResolvedHtml>>,
}

impl HtmlEntry {
    /// The state of a slot.
    pub fn state(&self, slot: HtmlSlot) -> CacheState {
        match slot {
            HtmlSlot::LineInfo => self.line_info.state(),
            HtmlSlot::ParsedUnit => self.parsed_unit.state(),
            HtmlSlot::ReferencedLibraries => self.referenced_libraries.state(),
            HtmlSlot::ResolvedUnit => self.resolved_unit.state(),
        }
    }

    /// Moves a slot to `state`.
    pub fn set_state(&mut self, slot: HtmlSlot, state: CacheState) {
        match slot {
            HtmlSlot::LineInfo => self.line_info.set_state(state),
            HtmlSlot::ParsedUnit => self.parsed_unit.set_state(state),
            HtmlSlot::ReferencedLibraries => self.referenced_libraries.set_state(state),
            HtmlSlot::ResolvedUnit => self.resolved_unit.set_state(state),
        }
    }

    /// Forgets everything derived from the contents.
    pub fn invalidate_all(&mut self) {
        self.line_info.invalidate();
        self.parsed_unit.invalidate();
        self.referenced_libraries.invalidate();
        self.resolved_unit.invalidate();
    }

    /// Drops the documents, keeping the referenced libraries.
    pub fn flush(&mut self) {
        self.parsed_unit.flush();
        self.resolved_unit.flush();
    }
}

/// The cache entry of one source.
#[derive(Clone, Debug)]
pub enum SourceEntry {
    /// A Strand source.
    Unit(UnitEntry),
    /// An HTML companion.
    Html(HtmlEntry),
}

impl SourceEntry {
    /// Creates an empty entry of the right shape, or `None` for sources the
    /// context does not analyze.
    pub fn for_source(source: &Source) -> Option<Self> {
        if source.is_html() {
            Some(SourceEntry::Html(HtmlEntry::default()))
        } else if is_unit_source(source) {
            Some(SourceEntry::Unit(UnitEntry::default()))
        } else {
            None
        }
    }

    /// The kind of the source.
    pub fn kind(&self) -> EntryKind {
        match self {
            SourceEntry::Unit(unit) => unit.kind(),
            SourceEntry::Html(_) => EntryKind::Html,
        }
    }

    /// The Strand entry, if this is one.
    pub fn as_unit(&self) -> Option<&UnitEntry> {
        match self {
            SourceEntry::Unit(unit) => Some(unit),
            SourceEntry::Html(_) => None,
        }
    }

    /// The Strand entry, if this is one.
    pub fn as_unit_mut(&mut self) -> Option<&mut UnitEntry> {
        match self {
            SourceEntry::Unit(unit) => Some(unit),
            SourceEntry::Html(_) => None,
        }
    }

    /// The HTML entry, if this is one.
    pub fn as_html(&self) -> Option<&HtmlEntry> {
        match self {
            SourceEntry::Html(html) => Some(html),
            SourceEntry::Unit(_) => None,
        }
    }

    /// The HTML entry, if this is one.
    pub fn as_html_mut(&mut self) -> Option<&mut HtmlEntry> {
        match self {
            SourceEntry::Html(html) => Some(html),
            SourceEntry::Unit(_) => None,
        }
    }

    /// Line starts, if valid.
    pub fn line_info(&self) -> Option<Arc<LineInfo>> {
        match self {
            SourceEntry::Unit(unit) => unit.line_info.value().cloned(),
            SourceEntry::Html(html) => html.line_info.value().cloned(),
        }
    }

    /// State of the parsed tree or document.
    pub fn parsed_state(&self) -> CacheState {
        match self {
            SourceEntry::Unit(unit) => unit.parsed_unit.state(),
            SourceEntry::Html(html) => html.parsed_unit.state(),
        }
    }

    /// Every known problem in the source.
    pub fn errors(&self) -> Vec<Diagnostic> {
        match self {
            SourceEntry::Unit(unit) => unit.all_errors(),
            SourceEntry::Html(html) => html
                .resolved_unit
                .value()
                .map(|h| h.diagnostics.clone())
                .unwrap_or_default(),
        }
    }

    /// Drops heavy artifacts.
    pub fn flush(&mut self) {
        match self {
            SourceEntry::Unit(unit) => unit.flush(),
            SourceEntry::Html(html) => html.flush(),
        }
    }
}
