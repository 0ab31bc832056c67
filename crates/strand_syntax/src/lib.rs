//! Hand-rolled recursive descent parser for Strand source files.
//!
//! The analysis engine treats this crate as a black box: given source text it
//! produces a [`CompilationUnit`] and reports syntax errors to a
//! [`DiagnosticSink`]. The main entry point is [`parse_unit`].
//!
//! # Architecture
//!
//! - **Lexer** ([`lexer`]): Converts source text to tokens, handling nested
//!   block comments, numeric and string literals.
//! - **Parser** ([`parser`]): Recursive descent parser with Pratt expression
//!   parsing and recovery at `;` and `}`.
//! - **AST** ([`ast`]): Tagged-variant tree with spans and serde support.
//! - **HTML** ([`html`]): Script reference scanner for HTML companion files.
//!
//! A [`ParseMode::Diet`] parse keeps directives and declaration signatures
//! and skips function bodies by brace matching.

#![warn(missing_docs)]

/// Syntax tree node types.
pub mod ast;
mod decl;
/// Syntax diagnostic codes.
pub mod errors;
mod expr;
pub mod html;
/// Lexical analyzer for Strand source text.
pub mod lexer;
/// Recursive descent parser with error recovery.
pub mod parser;
mod stmt;
/// Token types for the lexer.
pub mod token;

pub use ast::CompilationUnit;
pub use html::{scan_html, HtmlUnit, ScriptRef};
pub use parser::{ParseMode, Parser};
pub use token::{Token, TokenKind};

use strand_common::Interner;
use strand_diagnostics::DiagnosticSink;
use strand_source::FileId;

/// Parses one source file into a compilation unit.
///
/// Lexes `text` and parses it in the requested mode. Errors are reported to
/// the sink; the returned unit is always usable.
pub fn parse_unit(
    text: &str,
    file: FileId,
    mode: ParseMode,
    interner: &Interner,
    sink: &DiagnosticSink,
) -> CompilationUnit {
    let tokens = lexer::lex(text, file, sink);
    let mut parser = Parser::new(tokens, text, file, mode, interner, sink);
    parser.parse_unit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast::*;

    fn parse_ok(text: &str, mode: ParseMode) -> (CompilationUnit, Interner) {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let unit = parse_unit(text, FileId::from_raw(0), mode, &interner, &sink);
        let errors = sink.take_all();
        assert!(
            errors.is_empty(),
            "unexpected errors: {:?}",
            errors.iter().map(|e| &e.message).collect::<Vec<_>>()
        );
        (unit, interner)
    }

    const APP: &str = r#"
library app;

import 'std:io' as io;
import 'util.st' show helper;
part 'model.st';

class Counter extends Base implements Countable {
  static final int start = 0;
  int value;

  int get current => value;

  void increment(int by) {
    if (by is int && by > 0) {
      value = value + by;
    } else {
      throw 'bad step';
    }
  }
}

main() {
  var c = new Counter();
  outer: while (c.current < 10) {
    c.increment(1);
    if (c.current == 5) break outer;
  }
  io.stdout.write(c.current);
}
"#;

    #[test]
    fn integration_full_library() {
        let (unit, interner) = parse_ok(APP, ParseMode::Full);
        assert!(!unit.diet);
        assert_eq!(unit.directives.len(), 4);
        let names: Vec<_> = unit
            .top_level_names()
            .iter()
            .map(|n| interner.resolve(n.ident).to_string())
            .collect();
        assert_eq!(names, vec!["Counter", "main"]);
    }

    #[test]
    fn integration_diet_matches_signatures() {
        let (full, interner) = parse_ok(APP, ParseMode::Full);
        let sink = DiagnosticSink::new();
        let diet = parse_unit(APP, FileId::from_raw(0), ParseMode::Diet, &interner, &sink);
        assert!(!sink.has_errors());
        assert!(diet.diet);
        assert_eq!(full.top_level_names(), diet.top_level_names());
        assert_eq!(full.directives, diet.directives);
    }

    #[test]
    fn unit_serde_roundtrip() {
        let (unit, _) = parse_ok("library a;\nvar x = 1 + 2;", ParseMode::Full);
        let json = serde_json::to_string(&unit).unwrap();
        let back: CompilationUnit = serde_json::from_str(&json).unwrap();
        assert_eq!(unit, back);
    }

    #[test]
    fn lexical_error_reported() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        parse_unit("var x = #;", FileId::from_raw(0), ParseMode::Full, &interner, &sink);
        assert!(sink.has_errors());
    }
}
