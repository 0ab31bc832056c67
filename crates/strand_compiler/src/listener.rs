//! Compile progress notifications.
//!
//! Every unit the compiler touches is bracketed by
//! [`unit_about_to_compile`](CompilerListener::unit_about_to_compile) and
//! [`unit_compiled`](CompilerListener::unit_compiled). A diagnostic reported
//! while a unit's bracket is open belongs to this compile of that unit; one
//! reported while no bracket covers its file comes from a library-wide phase.

use strand_diagnostics::Diagnostic;
use strand_resolver::ResolvedUnit;
use strand_source::Source;
use strand_syntax::CompilationUnit;

/// A unit whose processing finished, successfully or not.
#[derive(Clone, Copy, Debug)]
pub struct CompiledUnit<'a> {
    /// The owning library.
    pub library: &'a Source,
    /// The unit's source.
    pub source: &'a Source,
    /// The parsed unit; `None` if it was dropped for parse errors.
    pub unit: Option<&'a CompilationUnit>,
    /// The resolution result, for units that reached resolution.
    pub resolved: Option<&'a ResolvedUnit>,
    /// `true` if only declaration signatures were parsed.
    pub is_diet: bool,
}

/// Receives compile progress.
pub trait CompilerListener {
    /// A unit is about to be parsed.
    fn unit_about_to_compile(&mut self, _source: &Source, _is_diet: bool) {}

    /// A problem was found.
    fn on_error(&mut self, diagnostic: &Diagnostic);

    /// Processing of a unit finished. Called once per
    /// [`unit_about_to_compile`](Self::unit_about_to_compile).
    fn unit_compiled(&mut self, _unit: CompiledUnit<'_>) {}
}

/// One recorded notification.
#[derive(Clone, Debug, PartialEq)]
pub enum ListenerEvent {
    /// [`CompilerListener::unit_about_to_compile`].
    AboutToCompile {
        /// The unit.
        source: Source,
        /// Diet parse.
        is_diet: bool,
    },
    /// [`CompilerListener::on_error`].
    Error(Diagnostic),
    /// [`CompilerListener::unit_compiled`].
    Compiled {
        /// The unit.
        source: Source,
        /// Diet parse.
        is_diet: bool,
        /// The unit was dropped for parse errors.
        dropped: bool,
    },
}

/// Records every notification in order.
#[derive(Debug, Default)]
pub struct RecordingListener {
    /// The notifications received so far.
    pub events: Vec<ListenerEvent>,
}

impl RecordingListener {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every diagnostic received, in order.
    pub fn diagnostics(&self) -> Vec<&Diagnostic> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ListenerEvent::Error(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    /// Units for which [`CompilerListener::unit_compiled`] was called, with
    /// their diet flag.
    pub fn compiled(&self) -> Vec<(Source, bool)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ListenerEvent::Compiled {
                    source, is_diet, ..
                } => Some((source.clone(), *is_diet)),
                _ => None,
            })
            .collect()
    }

    /// Returns `true` if `source` was fully parsed in the recorded compile.
    pub fn was_fully_compiled(&self, source: &Source) -> bool {
        self.events.iter().any(|e| {
            matches!(e, ListenerEvent::AboutToCompile { source: s, is_diet: false } if s == source)
        })
    }

    /// Forgets every recorded notification.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl CompilerListener for RecordingListener {
    fn unit_about_to_compile(&mut self, source: &Source, is_diet: bool) {
        self.events.push(ListenerEvent::AboutToCompile {
            source: source.clone(),
            is_diet,
        });
    }

    fn on_error(&mut self, diagnostic: &Diagnostic) {
        self.events.push(ListenerEvent::Error(diagnostic.clone()));
    }

    fn unit_compiled(&mut self, unit: CompiledUnit<'_>) {
        self.events.push(ListenerEvent::Compiled {
            source: unit.source.clone(),
            is_diet: unit.is_diet,
            dropped: unit.unit.is_none(),
        });
    }
}
