//! Lexical analyzer for Strand source text.
//!
//! Converts source text into a sequence of [`Token`]s. Whitespace, `//` line
//! comments and nesting `/* */` block comments are skipped. Errors are
//! reported to the [`DiagnosticSink`] and produce [`TokenKind::Error`] tokens.

use crate::errors;
use crate::token::{lookup_keyword, Token, TokenKind};
use strand_diagnostics::DiagnosticSink;
use strand_source::{FileId, Span};

/// Lexes the given source text into a vector of tokens.
///
/// The returned vector always ends with a [`TokenKind::Eof`] token.
pub fn lex(source: &str, file: FileId, sink: &DiagnosticSink) -> Vec<Token> {
    let mut lexer = Lexer {
        source: source.as_bytes(),
        pos: 0,
        file,
        sink,
    };
    lexer.lex_all()
}

struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    file: FileId,
    sink: &'a DiagnosticSink,
}

impl Lexer<'_> {
    fn lex_all(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            if self.pos >= self.source.len() {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    span: Span::new(self.file, self.pos as u32, self.pos as u32),
                });
                break;
            }
            tokens.push(self.next_token());
        }
        tokens
    }

    fn peek(&self) -> u8 {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> u8 {
        self.source.get(self.pos + offset).copied().unwrap_or(0)
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(self.file, start as u32, self.pos as u32)
    }

    fn error(&self, msg: &str, span: Span) {
        self.sink.emit(errors::error_lexical(msg, span));
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }
            if self.peek() == b'/' && self.peek_at(1) == b'/' {
                while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
                    self.pos += 1;
                }
                continue;
            }
            if self.peek() == b'/' && self.peek_at(1) == b'*' {
                let start = self.pos;
                self.pos += 2;
                let mut depth = 1;
                while depth > 0 {
                    if self.pos >= self.source.len() {
                        self.error("unterminated block comment", self.span_from(start));
                        break;
                    }
                    if self.peek() == b'/' && self.peek_at(1) == b'*' {
                        depth += 1;
                        self.pos += 2;
                    } else if self.peek() == b'*' && self.peek_at(1) == b'/' {
                        depth -= 1;
                        self.pos += 2;
                    } else {
                        self.pos += 1;
                    }
                }
                continue;
            }
            break;
        }
    }

    fn next_token(&mut self) -> Token {
        let start = self.pos;
        let b = self.peek();

        if is_ident_start(b) {
            while is_ident_continue(self.peek()) {
                self.pos += 1;
            }
            let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap_or("");
            let kind = lookup_keyword(text).unwrap_or(TokenKind::Identifier);
            return self.token(kind, start);
        }

        if b.is_ascii_digit() {
            return self.lex_number(start);
        }

        if b == b'\'' || b == b'"' {
            return self.lex_string(start, b);
        }

        let (kind, len) = match (b, self.peek_at(1)) {
            (b'=', b'>') => (TokenKind::Arrow, 2),
            (b'=', b'=') => (TokenKind::EqEq, 2),
            (b'!', b'=') => (TokenKind::BangEq, 2),
            (b'<', b'=') => (TokenKind::Le, 2),
            (b'>', b'=') => (TokenKind::Ge, 2),
            (b'&', b'&') => (TokenKind::AmpAmp, 2),
            (b'|', b'|') => (TokenKind::PipePipe, 2),
            (b'(', _) => (TokenKind::LeftParen, 1),
            (b')', _) => (TokenKind::RightParen, 1),
            (b'{', _) => (TokenKind::LeftBrace, 1),
            (b'}', _) => (TokenKind::RightBrace, 1),
            (b';', _) => (TokenKind::Semicolon, 1),
            (b',', _) => (TokenKind::Comma, 1),
            (b'.', _) => (TokenKind::Dot, 1),
            (b':', _) => (TokenKind::Colon, 1),
            (b'?', _) => (TokenKind::Question, 1),
            (b'=', _) => (TokenKind::Assign, 1),
            (b'<', _) => (TokenKind::Lt, 1),
            (b'>', _) => (TokenKind::Gt, 1),
            (b'+', _) => (TokenKind::Plus, 1),
            (b'-', _) => (TokenKind::Minus, 1),
            (b'*', _) => (TokenKind::Star, 1),
            (b'/', _) => (TokenKind::Slash, 1),
            (b'%', _) => (TokenKind::Percent, 1),
            (b'!', _) => (TokenKind::Bang, 1),
            _ => {
                // Skip a whole UTF-8 sequence so spans stay on char boundaries.
                self.pos += 1;
                while self.pos < self.source.len() && (self.source[self.pos] & 0xC0) == 0x80 {
                    self.pos += 1;
                }
                let span = self.span_from(start);
                self.error("unexpected character", span);
                return Token {
                    kind: TokenKind::Error,
                    span,
                };
            }
        };
        self.pos += len;
        self.token(kind, start)
    }

    fn lex_number(&mut self, start: usize) -> Token {
        while self.peek().is_ascii_digit() {
            self.pos += 1;
        }
        if self.peek() == b'.' && self.peek_at(1).is_ascii_digit() {
            self.pos += 1;
            while self.peek().is_ascii_digit() {
                self.pos += 1;
            }
            return self.token(TokenKind::DoubleLiteral, start);
        }
        self.token(TokenKind::IntLiteral, start)
    }

    fn lex_string(&mut self, start: usize, quote: u8) -> Token {
        self.pos += 1;
        loop {
            match self.peek() {
                0 if self.pos >= self.source.len() => {
                    self.error("unterminated string literal", self.span_from(start));
                    return self.token(TokenKind::StringLiteral, start);
                }
                b'\n' => {
                    self.error("unterminated string literal", self.span_from(start));
                    return self.token(TokenKind::StringLiteral, start);
                }
                b'\\' => self.pos += 2.min(self.source.len() - self.pos),
                c if c == quote => {
                    self.pos += 1;
                    return self.token(TokenKind::StringLiteral, start);
                }
                _ => self.pos += 1,
            }
        }
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token {
            kind,
            span: self.span_from(start),
        }
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Decodes the text of a string literal token, quotes included.
pub fn unescape_string(raw: &str) -> String {
    let inner = if raw.len() >= 2 {
        &raw[1..raw.len() - 1]
    } else {
        ""
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let sink = DiagnosticSink::new();
        lex(src, FileId::from_raw(0), &sink)
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn directive_tokens() {
        assert_eq!(
            kinds("import 'std:io' as io;"),
            vec![
                TokenKind::Import,
                TokenKind::StringLiteral,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Semicolon,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn operators() {
        assert_eq!(
            kinds("a => b == c != d <= e && f || !g"),
            vec![
                TokenKind::Identifier,
                TokenKind::Arrow,
                TokenKind::Identifier,
                TokenKind::EqEq,
                TokenKind::Identifier,
                TokenKind::BangEq,
                TokenKind::Identifier,
                TokenKind::Le,
                TokenKind::Identifier,
                TokenKind::AmpAmp,
                TokenKind::Identifier,
                TokenKind::PipePipe,
                TokenKind::Bang,
                TokenKind::Identifier,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn numbers() {
        assert_eq!(
            kinds("1 2.5 3."),
            vec![
                TokenKind::IntLiteral,
                TokenKind::DoubleLiteral,
                TokenKind::IntLiteral,
                TokenKind::Dot,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn comments_skipped() {
        assert_eq!(
            kinds("// line\n/* outer /* inner */ still */ x"),
            vec![TokenKind::Identifier, TokenKind::Eof]
        );
    }

    #[test]
    fn unterminated_string_reported() {
        let sink = DiagnosticSink::new();
        lex("'abc\n", FileId::from_raw(0), &sink);
        assert!(sink.has_errors());
    }

    #[test]
    fn bad_character_reported() {
        let sink = DiagnosticSink::new();
        let toks = lex("a # b", FileId::from_raw(0), &sink);
        assert_eq!(toks[1].kind, TokenKind::Error);
        assert_eq!(sink.error_count(), 1);
    }

    #[test]
    fn unescape() {
        assert_eq!(unescape_string(r#"'a\'b'"#), "a'b");
        assert_eq!(unescape_string(r#""x\ny""#), "x\ny");
    }
}
