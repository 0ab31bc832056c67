//! The diagnostic record passed from every phase to listeners and renderers.

use crate::code::{Category, DiagnosticCode};
use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use strand_source::Span;

/// Another place in the sources that explains a diagnostic, such as the
/// first of two clashing declarations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Related {
    /// Where.
    pub span: Span,
    /// What is there.
    pub message: String,
}

/// One problem found in the sources.
///
/// Diagnostics never abort analysis; they are collected per unit and
/// reported once the phase that found them is done. Equality covers every
/// field, so a recomputed diagnostic compares equal to the cached one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Warning or error.
    pub severity: Severity,
    /// Stable identifier, e.g. `T004`.
    pub code: DiagnosticCode,
    /// One-line description.
    pub message: String,
    /// Where the problem is. [`Span::DUMMY`] for problems without a place.
    pub primary_span: Span,
    /// Text printed next to the primary span's underline.
    pub caption: Option<String>,
    /// Related places.
    pub related: Vec<Related>,
    /// Background shown as `note:` lines.
    pub notes: Vec<String>,
    /// Suggestions shown as `help:` lines.
    pub help: Vec<String>,
}

impl Diagnostic {
    fn new(severity: Severity, code: DiagnosticCode, message: String, span: Span) -> Self {
        Self {
            severity,
            code,
            message,
            primary_span: span,
            caption: None,
            related: Vec::new(),
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    /// An error at `span`.
    pub fn error(code: DiagnosticCode, message: impl Into<String>, span: Span) -> Self {
        Self::new(Severity::Error, code, message.into(), span)
    }

    /// A warning at `span`.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>, span: Span) -> Self {
        Self::new(Severity::Warning, code, message.into(), span)
    }

    /// Sets the text shown under the primary span.
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Points at another place that explains this problem.
    pub fn with_related(mut self, span: Span, message: impl Into<String>) -> Self {
        self.related.push(Related {
            span,
            message: message.into(),
        });
        self
    }

    /// Adds a `note:` line.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Adds a `help:` line.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }

    /// Returns `true` for static type diagnostics, which are counted apart
    /// from other errors and warnings.
    pub fn is_type_problem(&self) -> bool {
        self.code.category == Category::Type
    }
}
