//! Collecting diagnostics from several threads.

use crate::diagnostic::Diagnostic;
use crate::severity::Severity;
use parking_lot::Mutex;

/// How many diagnostics of each kind a sink has seen.
///
/// Type problems are counted on their own whatever their severity, so the
/// compile driver can decide separately whether they are fatal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    /// Errors other than type problems.
    pub errors: usize,
    /// Warnings other than type problems.
    pub warnings: usize,
    /// Type problems.
    pub type_problems: usize,
}

impl Tally {
    fn record(&mut self, diag: &Diagnostic) {
        match (diag.is_type_problem(), diag.severity) {
            (true, _) => self.type_problems += 1,
            (false, Severity::Error) => self.errors += 1,
            (false, Severity::Warning) => self.warnings += 1,
        }
    }
}

#[derive(Default)]
struct Collected {
    pending: Vec<Diagnostic>,
    tally: Tally,
}

/// Where parsing, resolution and checking put the problems they find.
///
/// The tally covers everything ever emitted; [`take_all`](Self::take_all)
/// hands out the pending diagnostics without resetting it.
#[derive(Default)]
pub struct DiagnosticSink {
    inner: Mutex<Collected>,
}

impl DiagnosticSink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `diag`.
    pub fn emit(&self, diag: Diagnostic) {
        let mut inner = self.inner.lock();
        inner.tally.record(&diag);
        inner.pending.push(diag);
    }

    /// Counts so far.
    pub fn tally(&self) -> Tally {
        self.inner.lock().tally
    }

    /// Whether an error other than a type problem was emitted.
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// See [`Tally::errors`].
    pub fn error_count(&self) -> usize {
        self.tally().errors
    }

    /// See [`Tally::type_problems`].
    pub fn type_error_count(&self) -> usize {
        self.tally().type_problems
    }

    /// See [`Tally::warnings`].
    pub fn warning_count(&self) -> usize {
        self.tally().warnings
    }

    /// Removes and returns the pending diagnostics in emission order.
    pub fn take_all(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.inner.lock().pending)
    }

    /// A copy of the pending diagnostics.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.inner.lock().pending.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{Category, DiagnosticCode};
    use strand_source::Span;

    fn diag(category: Category, number: u16, severity: Severity) -> Diagnostic {
        let code = DiagnosticCode::new(category, number);
        match severity {
            Severity::Error => Diagnostic::error(code, "e", Span::DUMMY),
            Severity::Warning => Diagnostic::warning(code, "w", Span::DUMMY),
        }
    }

    #[test]
    fn type_problems_have_their_own_bucket() {
        let sink = DiagnosticSink::new();
        sink.emit(diag(Category::Directive, 1, Severity::Error));
        sink.emit(diag(Category::Directive, 3, Severity::Warning));
        sink.emit(diag(Category::Type, 4, Severity::Warning));
        sink.emit(diag(Category::Type, 1, Severity::Error));
        assert_eq!(
            sink.tally(),
            Tally {
                errors: 1,
                warnings: 1,
                type_problems: 2,
            }
        );
        assert!(sink.has_errors());
    }

    #[test]
    fn a_type_error_alone_is_not_an_error() {
        let sink = DiagnosticSink::new();
        sink.emit(diag(Category::Type, 1, Severity::Error));
        assert!(!sink.has_errors());
        assert_eq!(sink.type_error_count(), 1);
    }

    #[test]
    fn draining_keeps_the_tally() {
        let sink = DiagnosticSink::new();
        assert!(sink.take_all().is_empty());
        sink.emit(diag(Category::Syntax, 1, Severity::Error));
        sink.emit(diag(Category::Io, 1, Severity::Warning));
        assert_eq!(sink.diagnostics().len(), 2);
        assert_eq!(sink.take_all().len(), 2);
        assert!(sink.diagnostics().is_empty());
        assert_eq!((sink.error_count(), sink.warning_count()), (1, 1));
    }

    #[test]
    fn emitting_from_many_threads() {
        let sink = DiagnosticSink::new();
        std::thread::scope(|scope| {
            for _ in 0..8 {
                let sink = &sink;
                scope.spawn(move || {
                    for _ in 0..50 {
                        sink.emit(diag(Category::Syntax, 2, Severity::Error));
                    }
                });
            }
        });
        assert_eq!(sink.error_count(), 400);
        assert_eq!(sink.take_all().len(), 400);
    }
}
