//! Token types for the Strand lexer.
//!
//! Literal values are not stored in the token; the parser reads them from the
//! source text using the token's span. Words such as `as`, `of`, `show`,
//! `hide`, `get` and `set` are contextual: they lex as identifiers and the
//! parser recognizes them by text.

use serde::{Deserialize, Serialize};
use strand_source::Span;

/// A Strand token kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum TokenKind {
    // === Keywords ===
    /// `library`
    Library,
    /// `part`
    Part,
    /// `import`
    Import,
    /// `export`
    Export,
    /// `class`
    Class,
    /// `extends`
    Extends,
    /// `implements`
    Implements,
    /// `static`
    Static,
    /// `var`
    Var,
    /// `final`
    Final,
    /// `const`
    Const,
    /// `void`
    Void,
    /// `return`
    Return,
    /// `if`
    If,
    /// `else`
    Else,
    /// `while`
    While,
    /// `throw`
    Throw,
    /// `break`
    Break,
    /// `continue`
    Continue,
    /// `new`
    New,
    /// `this`
    This,
    /// `super`
    Super,
    /// `null`
    Null,
    /// `true`
    True,
    /// `false`
    False,
    /// `is`
    Is,

    // === Literals and names ===
    /// An identifier or contextual keyword.
    Identifier,
    /// An integer literal such as `42`.
    IntLiteral,
    /// A floating point literal such as `1.5`.
    DoubleLiteral,
    /// A single- or double-quoted string literal.
    StringLiteral,

    // === Punctuation ===
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,
    /// `;`
    Semicolon,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `:`
    Colon,
    /// `?`
    Question,
    /// `=>`
    Arrow,

    // === Operators ===
    /// `=`
    Assign,
    /// `==`
    EqEq,
    /// `!=`
    BangEq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `!`
    Bang,
    /// `&&`
    AmpAmp,
    /// `||`
    PipePipe,

    // === Special ===
    /// A character sequence the lexer could not recognize.
    Error,
    /// End of input.
    Eof,
}

impl TokenKind {
    /// Returns a short human-readable description for error messages.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Identifier => "identifier",
            TokenKind::IntLiteral | TokenKind::DoubleLiteral => "number",
            TokenKind::StringLiteral => "string",
            TokenKind::LeftParen => "'('",
            TokenKind::RightParen => "')'",
            TokenKind::LeftBrace => "'{'",
            TokenKind::RightBrace => "'}'",
            TokenKind::Semicolon => "';'",
            TokenKind::Comma => "','",
            TokenKind::Dot => "'.'",
            TokenKind::Colon => "':'",
            TokenKind::Arrow => "'=>'",
            TokenKind::Assign => "'='",
            TokenKind::Eof => "end of file",
            TokenKind::Error => "invalid token",
            _ => "keyword or operator",
        }
    }
}

/// A token with its kind and source span.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Token {
    /// The kind of this token.
    pub kind: TokenKind,
    /// The source span of this token.
    pub span: Span,
}

/// Looks up a reserved word.
pub fn lookup_keyword(text: &str) -> Option<TokenKind> {
    let kind = match text {
        "library" => TokenKind::Library,
        "part" => TokenKind::Part,
        "import" => TokenKind::Import,
        "export" => TokenKind::Export,
        "class" => TokenKind::Class,
        "extends" => TokenKind::Extends,
        "implements" => TokenKind::Implements,
        "static" => TokenKind::Static,
        "var" => TokenKind::Var,
        "final" => TokenKind::Final,
        "const" => TokenKind::Const,
        "void" => TokenKind::Void,
        "return" => TokenKind::Return,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "throw" => TokenKind::Throw,
        "break" => TokenKind::Break,
        "continue" => TokenKind::Continue,
        "new" => TokenKind::New,
        "this" => TokenKind::This,
        "super" => TokenKind::Super,
        "null" => TokenKind::Null,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "is" => TokenKind::Is,
        _ => return None,
    };
    Some(kind)
}
