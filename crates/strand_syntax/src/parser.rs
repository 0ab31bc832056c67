//! Core parser infrastructure and directive parsing.
//!
//! The [`Parser`] struct provides primitive operations (advance, expect, eat)
//! and error recovery. Declarations, statements and expressions are parsed
//! by the methods in `decl.rs`, `stmt.rs` and `expr.rs`.

use crate::ast::*;
use crate::errors;
use crate::lexer::unescape_string;
use crate::token::{Token, TokenKind};
use serde::{Deserialize, Serialize};
use strand_common::Interner;
use strand_diagnostics::DiagnosticSink;
use strand_source::{FileId, Span};

/// How much of a unit to parse.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ParseMode {
    /// Everything, including function bodies.
    Full,
    /// Directives and declaration signatures only; bodies are skipped.
    Diet,
}

/// A recursive descent parser for Strand source text.
///
/// Errors are reported to the diagnostic sink; the parser recovers at `;`
/// and `}` and keeps going, so the returned tree is always usable.
pub struct Parser<'src> {
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
    pub(crate) source: &'src str,
    file: FileId,
    pub(crate) interner: &'src Interner,
    pub(crate) sink: &'src DiagnosticSink,
    pub(crate) mode: ParseMode,
    next_node: u32,
}

impl<'src> Parser<'src> {
    /// Creates a new parser from a token stream produced by the lexer.
    pub fn new(
        tokens: Vec<Token>,
        source: &'src str,
        file: FileId,
        mode: ParseMode,
        interner: &'src Interner,
        sink: &'src DiagnosticSink,
    ) -> Self {
        Self {
            tokens,
            pos: 0,
            source,
            file,
            interner,
            sink,
            mode,
            next_node: 0,
        }
    }

    // ========================================================================
    // Primitive operations
    // ========================================================================

    /// Returns the kind of the current token.
    pub(crate) fn current(&self) -> TokenKind {
        self.peek_kind(0)
    }

    /// Returns the span of the current token.
    pub(crate) fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(Span::new(self.file, 0, 0), |t| t.span)
    }

    /// Returns the source text of the current token.
    pub(crate) fn current_text(&self) -> &'src str {
        self.text_at(0)
    }

    /// Returns the source text of the token at pos+offset.
    pub(crate) fn text_at(&self, offset: usize) -> &'src str {
        match self.tokens.get(self.pos + offset) {
            Some(t) => self
                .source
                .get(t.span.start as usize..t.span.end as usize)
                .unwrap_or(""),
            None => "",
        }
    }

    /// Returns `true` if the current token matches the given kind.
    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.current() == kind
    }

    /// Returns `true` if the current token is the identifier `word`.
    pub(crate) fn at_contextual(&self, word: &str) -> bool {
        self.at(TokenKind::Identifier) && self.current_text() == word
    }

    /// Returns `true` if the parser is at end of file.
    pub(crate) fn at_eof(&self) -> bool {
        self.current() == TokenKind::Eof
    }

    /// Returns the span of the previous token.
    pub(crate) fn prev_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            self.current_span()
        }
    }

    /// Returns a span from the start of `start` to the end of the previous token.
    pub(crate) fn span_from(&self, start: Span) -> Span {
        let end = self.prev_span().end.max(start.start);
        Span::new(self.file, start.start, end)
    }

    /// Advances past the current token.
    pub(crate) fn advance(&mut self) {
        if !self.at_eof() {
            self.pos += 1;
        }
    }

    /// Consumes the current token if it matches the given kind. Returns `true` if consumed.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Expects the current token to match the given kind. Emits an error if not.
    pub(crate) fn expect(&mut self, kind: TokenKind) -> bool {
        if self.eat(kind) {
            true
        } else {
            self.expected(kind.describe());
            false
        }
    }

    /// Expects and returns an identifier. Emits an error and returns a placeholder if not.
    pub(crate) fn expect_ident(&mut self) -> Name {
        let span = self.current_span();
        if self.at(TokenKind::Identifier) {
            let ident = self.interner.get_or_intern(self.current_text());
            self.advance();
            Name { ident, span }
        } else {
            self.expected("identifier");
            Name {
                ident: self.interner.get_or_intern("<missing>"),
                span,
            }
        }
    }

    /// Returns the kind of the token at pos+offset.
    pub(crate) fn peek_kind(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    /// Allocates the next expression ID.
    pub(crate) fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        id
    }

    // ========================================================================
    // Error handling and recovery
    // ========================================================================

    /// Emits an "expected X" error at the current position.
    pub(crate) fn expected(&self, what: &str) {
        let found = match self.current() {
            TokenKind::Eof | TokenKind::Error => self.current().describe().to_string(),
            _ => format!("'{}'", self.current_text()),
        };
        self.sink
            .emit(errors::error_expected(what, &found, self.current_span()));
    }

    /// Recovers to a semicolon, consuming everything before it (including the semicolon).
    ///
    /// Stops without consuming at a `}` that closes an enclosing block.
    pub(crate) fn recover_to_semicolon(&mut self) {
        let mut depth = 0usize;
        while !self.at_eof() {
            match self.current() {
                TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Skips a brace-delimited region starting at the current `{`.
    pub(crate) fn skip_braces(&mut self) -> Span {
        let start = self.current_span();
        let mut depth = 0usize;
        while !self.at_eof() {
            match self.current() {
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.advance();
                        break;
                    }
                }
                _ => {}
            }
            self.advance();
        }
        if depth > 0 {
            self.expected("'}'");
        }
        self.span_from(start)
    }

    /// Skips to the `;` ending an expression body, consuming it.
    pub(crate) fn skip_expression_body(&mut self) -> Span {
        let start = self.current_span();
        let mut depth = 0usize;
        while !self.at_eof() {
            match self.current() {
                TokenKind::LeftParen | TokenKind::LeftBrace => depth += 1,
                TokenKind::RightParen | TokenKind::RightBrace => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                TokenKind::Semicolon if depth == 0 => break,
                _ => {}
            }
            self.advance();
        }
        let span = self.span_from(start);
        self.expect(TokenKind::Semicolon);
        span
    }

    // ========================================================================
    // Top-level parsing
    // ========================================================================

    /// Parses a complete compilation unit.
    pub fn parse_unit(&mut self) -> CompilationUnit {
        let mut directives = Vec::new();
        let mut declarations: Vec<Declaration> = Vec::new();

        while !self.at_eof() {
            let before = self.pos;
            match self.current() {
                TokenKind::Library | TokenKind::Import | TokenKind::Export | TokenKind::Part => {
                    let directive = self.parse_directive();
                    if !declarations.is_empty() {
                        self.sink
                            .emit(errors::error_directive_after_declaration(directive.span()));
                    }
                    directives.push(directive);
                }
                _ => {
                    if let Some(decl) = self.parse_declaration() {
                        declarations.push(decl);
                    }
                }
            }
            if self.pos == before {
                self.advance();
            }
        }

        CompilationUnit {
            file: self.file,
            directives,
            declarations,
            diet: self.mode == ParseMode::Diet,
            span: Span::new(self.file, 0, self.source.len() as u32),
        }
    }

    fn parse_directive(&mut self) -> Directive {
        let start = self.current_span();
        match self.current() {
            TokenKind::Library => {
                self.advance();
                let name = self.parse_library_name();
                self.expect_semicolon();
                Directive::Library(LibraryDirective {
                    name,
                    span: self.span_from(start),
                })
            }
            TokenKind::Part if self.text_at(1) == "of" => {
                self.advance();
                self.advance();
                let name = self.parse_library_name();
                self.expect_semicolon();
                Directive::PartOf(PartOfDirective {
                    name,
                    span: self.span_from(start),
                })
            }
            TokenKind::Part => {
                self.advance();
                let uri = self.parse_uri();
                self.expect_semicolon();
                Directive::Part(PartDirective {
                    uri,
                    span: self.span_from(start),
                })
            }
            TokenKind::Import => {
                self.advance();
                let uri = self.parse_uri();
                let prefix = if self.at_contextual("as") {
                    self.advance();
                    Some(self.expect_ident())
                } else {
                    None
                };
                let combinators = self.parse_combinators();
                self.expect_semicolon();
                Directive::Import(ImportDirective {
                    uri,
                    prefix,
                    combinators,
                    span: self.span_from(start),
                })
            }
            _ => {
                self.advance();
                let uri = self.parse_uri();
                let combinators = self.parse_combinators();
                self.expect_semicolon();
                Directive::Export(ExportDirective {
                    uri,
                    combinators,
                    span: self.span_from(start),
                })
            }
        }
    }

    fn expect_semicolon(&mut self) {
        if !self.expect(TokenKind::Semicolon) {
            self.recover_to_semicolon();
        }
    }

    fn parse_library_name(&mut self) -> LibraryName {
        let start = self.current_span();
        let mut text = String::new();
        let first = self.expect_ident();
        text.push_str(self.interner.resolve(first.ident));
        while self.at(TokenKind::Dot) {
            self.advance();
            let segment = self.expect_ident();
            text.push('.');
            text.push_str(self.interner.resolve(segment.ident));
        }
        LibraryName {
            text,
            span: self.span_from(start),
        }
    }

    fn parse_uri(&mut self) -> UriLiteral {
        let span = self.current_span();
        if self.at(TokenKind::StringLiteral) {
            let value = unescape_string(self.current_text());
            self.advance();
            UriLiteral { value, span }
        } else {
            self.expected("string");
            UriLiteral {
                value: String::new(),
                span,
            }
        }
    }

    fn parse_combinators(&mut self) -> Vec<Combinator> {
        let mut combinators = Vec::new();
        loop {
            let show = if self.at_contextual("show") {
                true
            } else if self.at_contextual("hide") {
                false
            } else {
                break;
            };
            self.advance();
            let mut names = vec![self.expect_ident()];
            while self.eat(TokenKind::Comma) {
                names.push(self.expect_ident());
            }
            combinators.push(if show {
                Combinator::Show(names)
            } else {
                Combinator::Hide(names)
            });
        }
        combinators
    }
}
