//! Text output for diagnostics.

use std::fmt::Write as _;

use crate::diagnostic::Diagnostic;
use crate::severity::Severity;
use strand_source::{Location, SourceDb};

/// Turns a diagnostic into text.
pub trait DiagnosticRenderer {
    /// Formats `diag`, reading source lines from `source_db`.
    fn render(&self, diag: &Diagnostic, source_db: &SourceDb) -> String;
}

/// Compiler-style terminal output:
///
/// ```text
/// warning[T004]: cannot resolve hole
///   --> web/b.st:3:10
///   |
/// 3 |   return hole;
///   |          ^^^^ not declared in this library
///   = std:core:1:1: declared here
///   = note: ...
/// ```
///
/// A diagnostic whose span cannot be located prints only its header, related
/// places and trailing lines.
#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalRenderer {
    color: bool,
}

impl TerminalRenderer {
    /// A renderer that emits ANSI colors when `color` is set.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn excerpt(&self, out: &mut String, diag: &Diagnostic, at: &Location, line: &str) {
        let number = at.line.to_string();
        let gutter = " ".repeat(number.len());
        let indent = (at.column as usize).saturating_sub(1);
        let room = line.len().saturating_sub(indent).max(1);
        let width = (diag.primary_span.len() as usize).clamp(1, room);

        let mut underline = format!("{}{}", " ".repeat(indent), "^".repeat(width));
        if let Some(caption) = &diag.caption {
            underline.push(' ');
            underline.push_str(caption);
        }
        let _ = writeln!(out, "{gutter}--> {at}");
        let _ = writeln!(out, "{gutter} |");
        let _ = writeln!(out, "{number} | {line}");
        let _ = writeln!(out, "{gutter} | {}", self.paint(severity_color(diag.severity), &underline));
    }
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "1;31",
        Severity::Warning => "1;33",
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic, source_db: &SourceDb) -> String {
        let mut out = String::new();
        let header = format!("{}[{}]", diag.severity, diag.code);
        let _ = writeln!(
            out,
            "{}: {}",
            self.paint(severity_color(diag.severity), &header),
            diag.message
        );

        if let Some(at) = source_db.locate(diag.primary_span) {
            match source_db.line_text(diag.primary_span.file, at.line) {
                Some(line) => self.excerpt(&mut out, diag, &at, line),
                None => {
                    let _ = writeln!(out, "  --> {at}");
                }
            }
        }

        for related in &diag.related {
            match source_db.locate(related.span) {
                Some(at) => {
                    let _ = writeln!(out, "   = {at}: {}", related.message);
                }
                None => {
                    let _ = writeln!(out, "   = {}", related.message);
                }
            }
        }
        for note in &diag.notes {
            let _ = writeln!(out, "   = note: {note}");
        }
        for help in &diag.help {
            let _ = writeln!(out, "   = help: {help}");
        }
        out
    }
}
