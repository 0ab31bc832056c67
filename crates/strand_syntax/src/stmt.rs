//! Statement parsing.

use crate::ast::*;
use crate::parser::Parser;
use crate::token::TokenKind;

impl Parser<'_> {
    /// Parses `{ statements }`.
    pub(crate) fn parse_block(&mut self) -> Block {
        let start = self.current_span();
        let mut statements = Vec::new();
        if !self.expect(TokenKind::LeftBrace) {
            return Block {
                statements,
                span: self.span_from(start),
            };
        }
        while !self.at_eof() && !self.at(TokenKind::RightBrace) {
            let before = self.pos;
            statements.push(self.parse_statement());
            if self.pos == before {
                self.advance();
            }
        }
        self.expect(TokenKind::RightBrace);
        Block {
            statements,
            span: self.span_from(start),
        }
    }

    /// Parses one statement.
    pub(crate) fn parse_statement(&mut self) -> Stmt {
        let start = self.current_span();
        match self.current() {
            TokenKind::LeftBrace => Stmt::Block(self.parse_block()),
            TokenKind::Var | TokenKind::Final | TokenKind::Const => {
                Stmt::VarDecl(self.parse_keyword_variables(false))
            }
            TokenKind::Semicolon => {
                self.advance();
                Stmt::Empty(start)
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.at(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr())
                };
                self.end_statement();
                Stmt::Return {
                    value,
                    span: self.span_from(start),
                }
            }
            TokenKind::If => {
                self.advance();
                let condition = self.parse_condition();
                let then_branch = Box::new(self.parse_statement());
                let else_branch = if self.eat(TokenKind::Else) {
                    Some(Box::new(self.parse_statement()))
                } else {
                    None
                };
                Stmt::If {
                    condition,
                    then_branch,
                    else_branch,
                    span: self.span_from(start),
                }
            }
            TokenKind::While => {
                self.advance();
                let condition = self.parse_condition();
                let body = Box::new(self.parse_statement());
                Stmt::While {
                    condition,
                    body,
                    span: self.span_from(start),
                }
            }
            TokenKind::Throw => {
                self.advance();
                let value = self.parse_expr();
                self.end_statement();
                Stmt::Throw {
                    value,
                    span: self.span_from(start),
                }
            }
            TokenKind::Break | TokenKind::Continue => {
                let is_break = self.at(TokenKind::Break);
                self.advance();
                let label = if self.at(TokenKind::Identifier) {
                    Some(self.expect_ident())
                } else {
                    None
                };
                self.end_statement();
                let span = self.span_from(start);
                if is_break {
                    Stmt::Break { label, span }
                } else {
                    Stmt::Continue { label, span }
                }
            }
            TokenKind::Identifier if self.peek_kind(1) == TokenKind::Colon => {
                let label = self.expect_ident();
                self.advance();
                let body = Box::new(self.parse_statement());
                Stmt::Labeled {
                    label,
                    body,
                    span: self.span_from(start),
                }
            }
            TokenKind::Identifier if self.at_local_declaration() => {
                let ty = self.parse_type_ref();
                Stmt::VarDecl(self.parse_variable_list(start, VarKeyword::Typed, Some(ty), false))
            }
            _ => {
                let expr = self.parse_expr();
                self.end_statement();
                Stmt::Expr {
                    expr,
                    span: self.span_from(start),
                }
            }
        }
    }

    fn parse_condition(&mut self) -> Expr {
        self.expect(TokenKind::LeftParen);
        let condition = self.parse_expr();
        self.expect(TokenKind::RightParen);
        condition
    }

    fn end_statement(&mut self) {
        if !self.expect(TokenKind::Semicolon) {
            self.recover_to_semicolon();
        }
    }

    /// `T x = ...;`, `T x;`, `T x, y;` and the prefixed `p.T x ...` forms.
    fn at_local_declaration(&self) -> bool {
        let after_name = match (self.peek_kind(1), self.peek_kind(2), self.peek_kind(3)) {
            (TokenKind::Identifier, _, _) => self.peek_kind(2),
            (TokenKind::Dot, TokenKind::Identifier, TokenKind::Identifier) => self.peek_kind(4),
            _ => return false,
        };
        matches!(
            after_name,
            TokenKind::Assign | TokenKind::Semicolon | TokenKind::Comma
        )
    }
}
